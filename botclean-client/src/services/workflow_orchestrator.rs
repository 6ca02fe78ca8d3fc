//! Processing workflow orchestrator
//!
//! # State Progression
//! IDLE → UPLOADING → PROCESSING → SUCCESS, or ERROR from either active state
//!
//! The caller owns the [`ProcessingSession`] and lends it to `submit`, so a
//! session cannot run twice concurrently. `submit` only starts from IDLE; a
//! finished session needs `restart` first.
//!
//! Progress checkpoints: 10% request built, 30% request dispatched, 80%
//! response received, 100% bundle fetched. A failed run keeps the progress it
//! had reached.
//!
//! Suspension points (token lookup, dispatch, response body, bundle fetch) are
//! raced against the cancellation token. Submission and bundle fetch each run
//! under their own deadline from the config.

use crate::error::{BundleFetchError, SubmissionError, WorkflowError, WorkflowResult};
use crate::models::{
    AdvancedOptions, ColumnMapping, Dataset, ProcessingParameters, ProcessingSession,
    ProcessingState, ProcessingSummary, StateTransition,
};
use crate::services::classifier_client::ClassifierClient;
use crate::services::mapping_validator;
use crate::services::session_gateway::{self, SessionGateway};
use botclean_common::config::ClientConfig;
use botclean_common::events::{EventBus, WorkflowEvent};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One submission: the uploaded file, its parsed form, mapping and options
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub file_name: String,
    /// Raw upload, sent to the service unchanged
    pub file_bytes: Vec<u8>,
    pub dataset: Dataset,
    pub mapping: ColumnMapping,
    pub options: AdvancedOptions,
}

impl SubmissionRequest {
    pub fn new(
        file_name: impl Into<String>,
        file_bytes: Vec<u8>,
        dataset: Dataset,
        mapping: ColumnMapping,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_bytes,
            dataset,
            mapping,
            options: AdvancedOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AdvancedOptions) -> Self {
        self.options = options;
        self
    }
}

/// Race `fut` against cancellation
async fn cancellable<F, T, E>(cancel: &CancellationToken, fut: F) -> WorkflowResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<WorkflowError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WorkflowError::Cancelled),
        result = fut => result.map_err(Into::into),
    }
}

/// Run `fut` until `deadline`, then fail with `on_timeout`
async fn with_deadline<F, T, E>(deadline: Instant, on_timeout: E, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout),
    }
}

/// Drives one session through a processing run
pub struct ProcessingOrchestrator {
    client: ClassifierClient,
    gateway: Arc<dyn SessionGateway>,
    event_bus: EventBus,
    config: ClientConfig,
}

impl ProcessingOrchestrator {
    /// Create orchestrator with a client for `config.server_url`
    pub fn new(
        config: ClientConfig,
        gateway: Arc<dyn SessionGateway>,
        event_bus: EventBus,
    ) -> WorkflowResult<Self> {
        let client = ClassifierClient::from_config(&config)?;
        Ok(Self::with_client(client, config, gateway, event_bus))
    }

    pub fn with_client(
        client: ClassifierClient,
        config: ClientConfig,
        gateway: Arc<dyn SessionGateway>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            client,
            gateway,
            event_bus,
            config,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one submission to completion
    ///
    /// Mapping problems are returned without touching the session. Every
    /// failure after the run starts leaves the session in ERROR with the
    /// error's message, and is also returned.
    pub async fn submit(
        &self,
        session: &mut ProcessingSession,
        request: SubmissionRequest,
        cancel: CancellationToken,
    ) -> WorkflowResult<ProcessingSummary> {
        if session.state() != ProcessingState::Idle {
            tracing::warn!(
                session_id = %session.session_id(),
                state = %session.state(),
                "Submission rejected: session is not idle"
            );
            return Err(WorkflowError::RunActive {
                state: session.state().to_string(),
            });
        }

        // Checked again here; callers may skip the mapping step
        mapping_validator::validate(&request.mapping, request.dataset.headers()).into_result()?;

        let started = std::time::Instant::now();
        tracing::info!(
            session_id = %session.session_id(),
            file_name = %request.file_name,
            rows = request.dataset.row_count(),
            enable_mx_check = request.options.enable_mx_check,
            treat_invalid_as_bots = request.options.treat_invalid_as_bots,
            "Starting processing run"
        );

        self.transition(session, ProcessingState::Uploading)?;

        match self.run(session, request, &cancel).await {
            Ok(summary) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    session_id = %session.session_id(),
                    run_id = session.run_id().unwrap_or("-"),
                    total_rows = summary.total_rows,
                    bots = summary.bots_count,
                    clean = summary.clean_count,
                    duration_ms,
                    "Processing run completed"
                );
                self.event_bus.emit_lossy(WorkflowEvent::RunCompleted {
                    session_id: session.session_id(),
                    run_id: session.run_id().map(str::to_string),
                    total_rows: summary.total_rows,
                    bots_count: summary.bots_count,
                    clean_count: summary.clean_count,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                Ok(summary)
            }
            Err(err) => Err(self.fail(session, err)),
        }
    }

    /// Steps after entering UPLOADING
    async fn run(
        &self,
        session: &mut ProcessingSession,
        request: SubmissionRequest,
        cancel: &CancellationToken,
    ) -> WorkflowResult<ProcessingSummary> {
        let SubmissionRequest {
            file_name,
            file_bytes,
            dataset,
            mapping,
            options,
        } = request;
        let total_rows = dataset.row_count() as u64;

        let token =
            cancellable(cancel, session_gateway::require_token(self.gateway.as_ref())).await?;

        if self.config.credit_preflight {
            self.check_credits(total_rows, cancel).await?;
        }

        let params = ProcessingParameters::from_options(options);
        let prepared = self
            .client
            .prepare(&file_name, file_bytes, &mapping, &params, &token)?;
        self.checkpoint(session, 10, "Preparing upload");

        let submission_secs = self.config.submission_timeout_secs;
        let deadline = Instant::now() + self.config.submission_timeout();

        self.checkpoint(session, 30, "Uploading file");
        let response = cancellable(
            cancel,
            with_deadline(
                deadline,
                SubmissionError::Timeout(submission_secs),
                self.client.dispatch(prepared),
            ),
        )
        .await?;

        self.transition(session, ProcessingState::Processing)?;
        self.checkpoint(session, 80, "Processing results");

        let processed = cancellable(
            cancel,
            with_deadline(
                deadline,
                SubmissionError::Timeout(submission_secs),
                self.client.read_response(response),
            ),
        )
        .await?;

        let bundle_deadline = Instant::now() + self.config.bundle_timeout();
        let bundle = cancellable(
            cancel,
            with_deadline(
                bundle_deadline,
                BundleFetchError::Timeout(self.config.bundle_timeout_secs),
                self.client.fetch_bundle(&processed.zip_url),
            ),
        )
        .await?;

        let summary = match processed.summary {
            Some(summary) => summary,
            None => {
                tracing::debug!("Response carried no summary, reading it from the bundle");
                bundle.extract_summary(total_rows, self.config.summary_fallback)?
            }
        };

        let violations = summary.invariant_violations();
        if !violations.is_empty() {
            tracing::warn!(?violations, "Summary counts are inconsistent");
        }

        session.record_results(summary.clone(), bundle, processed.run_id);
        self.checkpoint(session, 100, "Complete");
        self.transition(session, ProcessingState::Success)?;

        Ok(summary)
    }

    async fn check_credits(&self, rows: u64, cancel: &CancellationToken) -> WorkflowResult<()> {
        let credits = cancellable(cancel, async {
            Ok::<_, WorkflowError>(self.gateway.credit_info().await)
        })
        .await?;

        match credits {
            Some(credits) if !credits.covers(rows) => {
                Err(SubmissionError::InsufficientCredits {
                    needed: rows,
                    available: credits.credits_balance,
                }
                .into())
            }
            Some(credits) => {
                tracing::debug!(
                    balance = credits.credits_balance,
                    needed = rows,
                    "Credit preflight passed"
                );
                Ok(())
            }
            None => {
                tracing::debug!("Credit balance unknown, skipping preflight");
                Ok(())
            }
        }
    }

    /// Return a finished session to IDLE
    pub fn restart(&self, session: &mut ProcessingSession) -> WorkflowResult<()> {
        if let Some(transition) = session.reset()? {
            tracing::debug!(session_id = %session.session_id(), "Session restarted");
            self.emit_transition(&transition);
        }
        Ok(())
    }

    /// Move the session to ERROR and report `err`
    fn fail(&self, session: &mut ProcessingSession, err: WorkflowError) -> WorkflowError {
        let message = err.to_string();
        tracing::error!(
            session_id = %session.session_id(),
            code = err.code(),
            progress = session.progress(),
            error = %message,
            "Processing run failed"
        );

        match session.transition_to(ProcessingState::Error) {
            Ok(transition) => self.emit_transition(&transition),
            Err(e) => tracing::error!(error = %e, "Could not record failure state"),
        }
        session.record_error(message.clone());

        self.event_bus.emit_lossy(WorkflowEvent::RunFailed {
            session_id: session.session_id(),
            error_message: message,
            timestamp: Utc::now(),
        });
        err
    }

    fn transition(
        &self,
        session: &mut ProcessingSession,
        state: ProcessingState,
    ) -> WorkflowResult<()> {
        let transition = session.transition_to(state)?;
        self.emit_transition(&transition);
        Ok(())
    }

    fn emit_transition(&self, transition: &StateTransition) {
        tracing::debug!(
            session_id = %transition.session_id,
            old_state = %transition.old_state,
            new_state = %transition.new_state,
            "Session state changed"
        );
        self.event_bus.emit_lossy(WorkflowEvent::StateChanged {
            session_id: transition.session_id,
            old_state: transition.old_state.to_string(),
            new_state: transition.new_state.to_string(),
            timestamp: transition.transitioned_at,
        });
    }

    fn checkpoint(&self, session: &mut ProcessingSession, percentage: u8, operation: &str) {
        if session.advance_progress(percentage, operation) {
            self.event_bus.emit_lossy(WorkflowEvent::Progress {
                session_id: session.session_id(),
                percentage: session.progress(),
                operation: operation.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}
