//! Remote classification service client
//!
//! `POST {server}/process` with a multipart body (`file`, `mapping`) and the
//! processing parameters as query string. The response names a URL from which
//! the result bundle is fetched without credentials.
//!
//! Submission is split into `prepare`, `dispatch` and `read_response` so the
//! caller can report progress between stages.

use crate::error::{BundleFetchError, SubmissionError};
use crate::models::{ColumnMapping, ProcessingParameters, ProcessingSummary};
use crate::services::archive_reader::ResultArchive;
use botclean_common::config::ClientConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("botclean-client/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 10;
const PROCESS_PATH: &str = "process";

/// Body of a successful `/process` response
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(default)]
    pub run_id: Option<String>,
    pub zip_url: String,
    #[serde(default)]
    pub summary: Option<ProcessingSummary>,
}

/// Request built and ready to send
pub struct PreparedSubmission {
    request: RequestBuilder,
    upload_bytes: usize,
}

impl PreparedSubmission {
    pub fn upload_bytes(&self) -> usize {
        self.upload_bytes
    }
}

/// Human-readable message from an error body: `detail`, then `error`
fn error_message(body: &Value) -> Option<String> {
    ["detail", "error"].iter().find_map(|key| match body.get(*key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

/// Classification service client
pub struct ClassifierClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ClassifierClient {
    pub fn new(base_url: &str) -> Result<Self, SubmissionError> {
        // Trailing slash so `join` appends instead of replacing the last segment
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| {
            SubmissionError::Transport(format!("invalid server URL '{}': {}", base_url, e))
        })?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, SubmissionError> {
        Self::new(&config.server_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the multipart request
    pub fn prepare(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        mapping: &ColumnMapping,
        params: &ProcessingParameters,
        token: &str,
    ) -> Result<PreparedSubmission, SubmissionError> {
        let url = self
            .base_url
            .join(PROCESS_PATH)
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        let mapping_json = serde_json::to_string(mapping)
            .map_err(|e| SubmissionError::Transport(format!("mapping serialization: {}", e)))?;

        let upload_bytes = file_bytes.len();
        let file_part = Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("file", file_part)
            .text("mapping", mapping_json);

        let request = self
            .http_client
            .post(url)
            .query(&params.query_pairs())
            .bearer_auth(token)
            .multipart(form);

        Ok(PreparedSubmission {
            request,
            upload_bytes,
        })
    }

    /// Send the request; resolves once response headers arrive
    pub async fn dispatch(
        &self,
        prepared: PreparedSubmission,
    ) -> Result<Response, SubmissionError> {
        tracing::debug!(upload_bytes = prepared.upload_bytes, "Sending classification request");
        prepared
            .request
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))
    }

    /// Check status and decode the body
    pub async fn read_response(
        &self,
        response: Response,
    ) -> Result<ProcessResponse, SubmissionError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::warn!(status = status.as_u16(), %message, "Classification request failed");
            return Err(SubmissionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| SubmissionError::MalformedResponse(e.to_string()))?;

        if value.get("success").and_then(Value::as_bool) != Some(true) {
            let message = error_message(&value)
                .unwrap_or_else(|| "service reported failure".to_string());
            return Err(SubmissionError::Rejected(message));
        }

        let parsed: ProcessResponse = serde_json::from_value(value)
            .map_err(|e| SubmissionError::MalformedResponse(e.to_string()))?;
        if parsed.zip_url.trim().is_empty() {
            return Err(SubmissionError::MalformedResponse("empty zip_url".to_string()));
        }

        tracing::info!(
            run_id = parsed.run_id.as_deref().unwrap_or("-"),
            has_summary = parsed.summary.is_some(),
            "Classification request accepted"
        );

        Ok(parsed)
    }

    /// `prepare`, `dispatch` and `read_response` in one call
    pub async fn submit(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        mapping: &ColumnMapping,
        params: &ProcessingParameters,
        token: &str,
    ) -> Result<ProcessResponse, SubmissionError> {
        let prepared = self.prepare(file_name, file_bytes, mapping, params, token)?;
        let response = self.dispatch(prepared).await?;
        self.read_response(response).await
    }

    /// Download and open the result bundle
    ///
    /// Relative URLs are resolved against the server URL. No credentials
    /// are sent.
    pub async fn fetch_bundle(&self, zip_url: &str) -> Result<ResultArchive, BundleFetchError> {
        let url = self
            .base_url
            .join(zip_url)
            .map_err(|e| {
                BundleFetchError::Transport(format!("invalid bundle URL '{}': {}", zip_url, e))
            })?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| BundleFetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BundleFetchError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BundleFetchError::Transport(e.to_string()))?;
        tracing::debug!(size = bytes.len(), "Fetched result bundle");

        ResultArchive::open(bytes.to_vec()).map_err(|e| BundleFetchError::Corrupt(e.to_string()))
    }
}
