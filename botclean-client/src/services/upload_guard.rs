//! Pre-parse checks on an uploaded file
//!
//! The parser itself has no size limit; these checks run before it.

use crate::error::ParseError;
use std::path::Path;

/// Accepted upload extension (compared case-insensitively)
pub const ACCEPTED_EXTENSION: &str = "csv";

/// Upload acceptance rules
#[derive(Debug, Clone, Copy)]
pub struct UploadGuard {
    max_bytes: u64,
}

impl UploadGuard {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn from_config(config: &botclean_common::config::ClientConfig) -> Self {
        Self::new(config.max_upload_bytes)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check file name and size
    pub fn check(&self, file_name: &str, size: u64) -> Result<(), ParseError> {
        let is_csv = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION));
        if !is_csv {
            return Err(ParseError::UnsupportedFileType(file_name.to_string()));
        }
        if size > self.max_bytes {
            return Err(ParseError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Name under which the result bundle for `original` is saved
///
/// `contacts.csv` → `contacts_processed.zip`
pub fn bundle_file_name(original: &str) -> String {
    let stem = match original.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => original,
    };
    format!("{}_processed.zip", stem)
}
