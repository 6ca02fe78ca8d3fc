//! Pipeline services
//!
//! Parsing and mapping run locally and synchronously. Submission and bundle
//! download go through the orchestrator.

pub mod archive_reader;
pub mod classifier_client;
pub mod column_preview;
pub mod mapping_inferencer;
pub mod mapping_validator;
pub mod session_gateway;
pub mod tabular_parser;
pub mod upload_guard;
pub mod workflow_orchestrator;

pub use archive_reader::{ResultArchive, ResultMember};
pub use classifier_client::{ClassifierClient, ProcessResponse};
pub use column_preview::{estimate_processing_minutes, ColumnPreview};
pub use mapping_inferencer::{InferenceReport, RoleMatch};
pub use mapping_validator::{MappingValidation, ValidationReport};
pub use session_gateway::{SessionGateway, StaticGateway};
pub use tabular_parser::{ParserOptions, TabularParser};
pub use upload_guard::{bundle_file_name, UploadGuard};
pub use workflow_orchestrator::{ProcessingOrchestrator, SubmissionRequest};
