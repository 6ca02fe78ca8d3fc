//! Error types for botclean-client
//!
//! One enum per pipeline stage. `ParseError` and `MappingError` are resolved
//! before any network call. `AuthError`, `SubmissionError` and
//! `BundleFetchError` end a run in the `Error` state. `ExtractError` either
//! degrades to a fallback (summary) or fails a single download.

use crate::models::{InvalidTransition, MappingRole};
use thiserror::Error;

/// Tabular input could not be turned into a dataset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("File is empty")]
    Empty,

    #[error("File is not readable text (binary or unknown encoding)")]
    Undecodable,

    #[error("Malformed CSV: {0}")]
    Malformed(String),

    #[error("File is too large ({size} bytes, limit is {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("Unsupported file type '{0}': a .csv file is required")]
    UnsupportedFileType(String),
}

impl ParseError {
    /// Discriminated failure reason for presentation and logs
    pub fn reason(&self) -> &'static str {
        match self {
            ParseError::Empty => "empty",
            ParseError::Undecodable => "undecodable",
            ParseError::Malformed(_) => "malformed",
            ParseError::TooLarge { .. } => "too_large",
            ParseError::UnsupportedFileType(_) => "unsupported_file_type",
        }
    }
}

/// Column mapping violates a hard constraint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Email column mapping is required")]
    MissingEmail,

    #[error("{role} column '{column}' does not exist in the file")]
    UnknownColumn { role: MappingRole, column: String },
}

/// No usable credential at submission time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Session gateway error: {0}")]
    Gateway(String),
}

/// Classification request failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Classification service did not respond within {0} seconds")]
    Timeout(u64),

    /// Non-2xx response. `message` is taken from the body when possible.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Processing failed: {0}")]
    Rejected(String),

    #[error("Malformed response from classification service: {0}")]
    MalformedResponse(String),

    #[error("Insufficient credits: {needed} needed, {available} available")]
    InsufficientCredits { needed: u64, available: u64 },
}

/// Result bundle could not be downloaded or is not a valid archive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleFetchError {
    #[error("Result download failed: {0}")]
    Transport(String),

    #[error("Result download did not finish within {0} seconds")]
    Timeout(u64),

    #[error("Result download failed with HTTP {0}")]
    Status(u16),

    #[error("Result bundle is corrupt: {0}")]
    Corrupt(String),
}

/// A result bundle member could not be read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Invalid result archive: {0}")]
    InvalidArchive(String),

    #[error("File {member} not found in result bundle")]
    NotFound { member: String },

    #[error("File {member} in result bundle is malformed: {reason}")]
    Malformed { member: String, reason: String },
}

/// Why a processing run did not reach `Success`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    BundleFetch(#[from] BundleFetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    /// `submit` called on a session that is not idle
    #[error("A processing run is already {state}; restart the session first")]
    RunActive { state: String },

    #[error("Processing cancelled")]
    Cancelled,
}

impl WorkflowError {
    /// Stable error code for logs and telemetry
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Parse(_) => "PARSE_ERROR",
            WorkflowError::Mapping(_) => "MAPPING_ERROR",
            WorkflowError::Auth(_) => "AUTH_ERROR",
            WorkflowError::Submission(SubmissionError::Timeout(_)) => "SUBMISSION_TIMEOUT",
            WorkflowError::Submission(_) => "SUBMISSION_ERROR",
            WorkflowError::BundleFetch(_) => "BUNDLE_FETCH_ERROR",
            WorkflowError::Extract(_) => "EXTRACT_ERROR",
            WorkflowError::Transition(_) => "INVALID_TRANSITION",
            WorkflowError::RunActive { .. } => "RUN_ACTIVE",
            WorkflowError::Cancelled => "CANCELLED",
        }
    }
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
