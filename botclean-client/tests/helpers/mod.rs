//! Test helpers: in-process classification service and bundle builder
#![allow(dead_code)]

use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use botclean_client::models::{ColumnMapping, Dataset, MappingRole};
use botclean_client::services::{
    tabular_parser, ProcessingOrchestrator, SessionGateway, StaticGateway, SubmissionRequest,
};
use botclean_common::config::ClientConfig;
use botclean_common::events::EventBus;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const BUNDLE_PATH: &str = "/exports/run-1/contacts_processed.zip";
pub const TOKEN: &str = "test-token";

/// Five contacts: three bots, two clean
pub const CONTACTS_CSV: &str = "\
email,first_name,last_name,company
bot@mailinator.com,Bot,User,Spam Inc
john.doe@gmail.com,John,Doe,Acme
test@company.com,Test,Account,Company
jane.smith@company.com,Jane,Smith,Company
admin@company.com,Admin,Root,Company
";

pub const ANNOTATED_CSV: &str = "\u{feff}\
email,first_name,last_name,company,BOT
bot@mailinator.com,Bot,User,Spam Inc,TRUE
john.doe@gmail.com,John,Doe,Acme,FALSE
test@company.com,Test,Account,Company,TRUE
jane.smith@company.com,Jane,Smith,Company,FALSE
admin@company.com,Admin,Root,Company,TRUE
";

pub const CLEAN_CSV: &str = "\u{feff}\
email,first_name,last_name,company
john.doe@gmail.com,John,Doe,Acme
jane.smith@company.com,Jane,Smith,Company
";

pub const BOTS_CSV: &str = "\u{feff}\
email,first_name,last_name,company
bot@mailinator.com,Bot,User,Spam Inc
test@company.com,Test,Account,Company
admin@company.com,Admin,Root,Company
";

pub fn summary_json() -> Value {
    json!({
        "total_rows": 5,
        "rows_with_email": 5,
        "rows_without_email": 0,
        "bots_count": 3,
        "clean_count": 2,
        "valid_emails": 2,
        "invalid_syntax_emails": 0,
        "no_mx_emails": 0,
        "unknown_emails": 0,
        "timestamp": "2024-05-01T10:00:00.000000Z"
    })
}

/// Zip archive with the given members, deflate-compressed
pub fn build_bundle(members: &[(&str, &[u8])]) -> Vec<u8> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The bundle the service produces for [`CONTACTS_CSV`]
pub fn contacts_bundle() -> Vec<u8> {
    let summary = serde_json::to_vec_pretty(&summary_json()).unwrap();
    build_bundle(&[
        ("clean.csv", CLEAN_CSV.as_bytes()),
        ("bots.csv", BOTS_CSV.as_bytes()),
        ("annotated.csv", ANNOTATED_CSV.as_bytes()),
        ("summary.json", &summary),
    ])
}

/// How the mock answers `POST /process`
#[derive(Clone)]
pub enum ProcessReply {
    /// `success: true` with a bundle URL and optional summary
    Accept { summary: Option<Value> },
    Json { status: u16, body: Value },
    Text { status: u16, body: String },
    /// Hold the request open
    Stall(Duration),
}

/// One `/process` call as received
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub file_name: Option<String>,
    pub file_bytes: Vec<u8>,
    pub mapping: Option<Value>,
}

struct MockState {
    base_url: String,
    reply: ProcessReply,
    /// `None` answers the bundle URL with 404
    bundle: Option<Vec<u8>>,
    /// Hold bundle downloads open this long before answering
    bundle_delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
    bundle_auth: Mutex<Vec<Option<String>>>,
}

/// Running mock classification service
pub struct MockService {
    state: Arc<MockState>,
}

impl MockService {
    pub async fn start(reply: ProcessReply, bundle: Option<Vec<u8>>) -> Self {
        Self::start_with_bundle_delay(reply, bundle, None).await
    }

    /// Accepts every submission, then stalls the bundle download
    pub async fn stalled_bundle(delay: Duration) -> Self {
        Self::start_with_bundle_delay(
            ProcessReply::Accept {
                summary: Some(summary_json()),
            },
            Some(contacts_bundle()),
            Some(delay),
        )
        .await
    }

    async fn start_with_bundle_delay(
        reply: ProcessReply,
        bundle: Option<Vec<u8>>,
        bundle_delay: Option<Duration>,
    ) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState {
            base_url: format!("http://{}", addr),
            reply,
            bundle,
            bundle_delay,
            requests: Mutex::new(Vec::new()),
            bundle_auth: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/process", post(process))
            .route(BUNDLE_PATH, get(bundle_download))
            .with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state }
    }

    /// Service that classifies [`CONTACTS_CSV`] successfully
    pub async fn accepting() -> Self {
        Self::start(
            ProcessReply::Accept {
                summary: Some(summary_json()),
            },
            Some(contacts_bundle()),
        )
        .await
    }

    pub fn base_url(&self) -> &str {
        &self.state.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Authorization headers seen on bundle downloads
    pub fn bundle_auth(&self) -> Vec<Option<String>> {
        self.state.bundle_auth.lock().unwrap().clone()
    }

    /// Resolves once a bundle download has reached the service
    pub async fn bundle_requested(&self) {
        while self.bundle_auth().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.base_url().to_string(),
            ..ClientConfig::default()
        }
    }

    pub fn orchestrator(&self, gateway: impl SessionGateway + 'static) -> ProcessingOrchestrator {
        self.orchestrator_with(self.config(), gateway)
    }

    pub fn orchestrator_with(
        &self,
        config: ClientConfig,
        gateway: impl SessionGateway + 'static,
    ) -> ProcessingOrchestrator {
        ProcessingOrchestrator::new(config, Arc::new(gateway), EventBus::new(64)).unwrap()
    }
}

async fn process(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut recorded = RecordedRequest {
        query,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..RecordedRequest::default()
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap_or_default();
        match name.as_str() {
            "file" => {
                recorded.file_name = file_name;
                recorded.file_bytes = data.to_vec();
            }
            "mapping" => recorded.mapping = serde_json::from_slice(&data).ok(),
            _ => {}
        }
    }
    state.requests.lock().unwrap().push(recorded);

    match &state.reply {
        ProcessReply::Accept { summary } => {
            let mut body = json!({
                "success": true,
                "run_id": "run-1",
                "zip_url": format!("{}{}", state.base_url, BUNDLE_PATH),
            });
            if let Some(summary) = summary {
                body["summary"] = summary.clone();
            }
            Json(body).into_response()
        }
        ProcessReply::Json { status, body } => {
            (StatusCode::from_u16(*status).unwrap(), Json(body.clone())).into_response()
        }
        ProcessReply::Text { status, body } => {
            (StatusCode::from_u16(*status).unwrap(), body.clone()).into_response()
        }
        ProcessReply::Stall(duration) => {
            tokio::time::sleep(*duration).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

async fn bundle_download(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.bundle_auth.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    if let Some(delay) = state.bundle_delay {
        tokio::time::sleep(delay).await;
    }
    match &state.bundle {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn gateway() -> StaticGateway {
    StaticGateway::new(TOKEN)
}

pub fn contacts_dataset() -> Dataset {
    tabular_parser::parse(CONTACTS_CSV.as_bytes()).unwrap()
}

pub fn contacts_mapping() -> ColumnMapping {
    ColumnMapping::default()
        .with(MappingRole::Email, "email")
        .with(MappingRole::FirstName, "first_name")
        .with(MappingRole::LastName, "last_name")
}

pub fn contacts_request() -> SubmissionRequest {
    SubmissionRequest::new(
        "contacts.csv",
        CONTACTS_CSV.as_bytes().to_vec(),
        contacts_dataset(),
        contacts_mapping(),
    )
}
