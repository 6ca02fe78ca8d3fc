//! Processing workflow state machine
//!
//! IDLE → UPLOADING → PROCESSING → SUCCESS, with ERROR reachable from either
//! active state. SUCCESS and ERROR are final until `reset`.

use crate::models::ProcessingSummary;
use crate::services::ResultArchive;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Processing workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingState {
    /// No run in progress
    Idle,
    /// Building and sending the classification request
    Uploading,
    /// Request accepted, waiting for results
    Processing,
    /// Summary and result bundle available
    Success,
    /// Run failed, see the session's error message
    Error,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Idle => "IDLE",
            ProcessingState::Uploading => "UPLOADING",
            ProcessingState::Processing => "PROCESSING",
            ProcessingState::Success => "SUCCESS",
            ProcessingState::Error => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Success | ProcessingState::Error)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ProcessingState::Uploading | ProcessingState::Processing)
    }

    /// Whether the state machine allows `self → next`
    pub fn can_transition_to(&self, next: ProcessingState) -> bool {
        use ProcessingState::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Uploading, Processing)
                | (Uploading, Error)
                | (Processing, Success)
                | (Processing, Error)
                | (Success, Idle)
                | (Error, Idle)
        )
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State transition record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: ProcessingState,
    pub new_state: ProcessingState,
    pub transitioned_at: DateTime<Utc>,
}

/// Rejected state change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid state transition {from} → {to}")]
pub struct InvalidTransition {
    pub from: ProcessingState,
    pub to: ProcessingState,
}

/// One user's processing session
///
/// Owned by the caller and lent to the orchestrator for the duration of a
/// run, so two runs cannot share a session.
#[derive(Debug, Clone)]
pub struct ProcessingSession {
    session_id: Uuid,
    state: ProcessingState,
    /// 0-100, non-decreasing within a run
    progress: u8,
    current_operation: String,
    error: Option<String>,
    summary: Option<ProcessingSummary>,
    bundle: Option<ResultArchive>,
    run_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl ProcessingSession {
    /// Create new idle session
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: ProcessingState::Idle,
            progress: 0,
            current_operation: String::new(),
            error: None,
            summary: None,
            bundle: None,
            run_id: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn current_operation(&self) -> &str {
        &self.current_operation
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn summary(&self) -> Option<&ProcessingSummary> {
        self.summary.as_ref()
    }

    pub fn bundle(&self) -> Option<&ResultArchive> {
        self.bundle.as_ref()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Transition to new state
    pub fn transition_to(
        &mut self,
        new_state: ProcessingState,
    ) -> Result<StateTransition, InvalidTransition> {
        if !self.state.can_transition_to(new_state) {
            return Err(InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        match new_state {
            ProcessingState::Uploading => {
                self.started_at = Some(transition.transitioned_at);
                self.ended_at = None;
            }
            ProcessingState::Success | ProcessingState::Error => {
                self.ended_at = Some(transition.transitioned_at);
            }
            _ => {}
        }

        Ok(transition)
    }

    /// Raise progress to `percentage` (clamped to 100)
    ///
    /// Returns `false` and leaves progress unchanged if that would lower it.
    pub fn advance_progress(&mut self, percentage: u8, operation: impl Into<String>) -> bool {
        let percentage = percentage.min(100);
        if percentage < self.progress {
            return false;
        }
        self.progress = percentage;
        self.current_operation = operation.into();
        true
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub(crate) fn record_results(
        &mut self,
        summary: ProcessingSummary,
        bundle: ResultArchive,
        run_id: Option<String>,
    ) {
        self.summary = Some(summary);
        self.bundle = Some(bundle);
        self.run_id = run_id;
    }

    /// Return to IDLE, dropping results and error
    ///
    /// Keeps the session id so subscribers can follow the next run.
    pub fn reset(&mut self) -> Result<Option<StateTransition>, InvalidTransition> {
        let transition = match self.state {
            ProcessingState::Idle => None,
            _ => Some(self.transition_to(ProcessingState::Idle)?),
        };
        self.progress = 0;
        self.current_operation.clear();
        self.error = None;
        self.summary = None;
        self.bundle = None;
        self.run_id = None;
        self.started_at = None;
        self.ended_at = None;
        Ok(transition)
    }
}

impl Default for ProcessingSession {
    fn default() -> Self {
        Self::new()
    }
}
