//! Upload → parse → infer → validate → preview, before any submission

mod helpers;

use anyhow::Result;
use botclean_client::error::{MappingError, ParseError};
use botclean_client::models::{AdvancedOptions, MappingRole, ProcessingSession, ProcessingState};
use botclean_client::services::{
    bundle_file_name, column_preview, estimate_processing_minutes, mapping_inferencer,
    mapping_validator, tabular_parser, SubmissionRequest, UploadGuard,
};
use botclean_common::config::ClientConfig;
use helpers::*;
use tokio_util::sync::CancellationToken;

#[test]
fn test_contacts_file_maps_cleanly() -> Result<()> {
    let guard = UploadGuard::from_config(&ClientConfig::default());
    guard.check("contacts.csv", CONTACTS_CSV.len() as u64)?;

    let dataset = tabular_parser::parse(CONTACTS_CSV.as_bytes())?;
    assert_eq!(dataset.headers(), ["email", "first_name", "last_name", "company"]);
    assert_eq!(dataset.row_count(), 5);
    assert_eq!(dataset.rows_containing_at_sign(), 5);

    let mapping = mapping_inferencer::infer(dataset.headers());
    assert_eq!(mapping, contacts_mapping());

    let validation = mapping_validator::validate(&mapping, dataset.headers());
    assert!(validation.is_valid);

    let previews = column_preview::preview(&dataset, &mapping);
    assert_eq!(previews.len(), 3);
    assert_eq!(previews[0].samples[0], "bot@mailinator.com");
    assert_eq!(previews[2].samples[4], "Root");

    let rows = dataset.row_count() as u64;
    assert_eq!(estimate_processing_minutes(rows, &AdvancedOptions::default()), 3);
    assert_eq!(bundle_file_name("contacts.csv"), "contacts_processed.zip");
    Ok(())
}

/// No email-like column: validation fails and nothing is submitted
#[tokio::test]
async fn test_no_email_column_never_reaches_service() -> Result<()> {
    let service = MockService::accepting().await;
    let orchestrator = service.orchestrator(gateway());

    let csv = "name,phone,company\nAnn,555-0100,Acme\nBob,555-0101,Initech\n";
    let dataset = tabular_parser::parse(csv.as_bytes())?;
    let mapping = mapping_inferencer::infer(dataset.headers());
    assert_eq!(mapping.get(MappingRole::Email), None);

    let validation = mapping_validator::validate(&mapping, dataset.headers());
    assert!(!validation.is_valid);
    assert_eq!(validation.errors, vec![MappingError::MissingEmail]);
    assert!(validation.error_messages()[0].contains("Email"));

    // Submitting anyway is refused before the session starts
    let mut session = ProcessingSession::new();
    let request = SubmissionRequest::new("people.csv", csv.as_bytes().to_vec(), dataset, mapping);
    let err = orchestrator
        .submit(&mut session, request, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), "MAPPING_ERROR");
    assert_eq!(session.state(), ProcessingState::Idle);
    assert!(service.requests().is_empty());
    Ok(())
}

/// User override to a header that no longer exists is caught
#[test]
fn test_user_override_to_unknown_column() -> Result<()> {
    let dataset = tabular_parser::parse(CONTACTS_CSV.as_bytes())?;
    let mut mapping = mapping_inferencer::infer(dataset.headers());
    mapping.set(MappingRole::LastName, Some("surname".to_string()));

    let validation = mapping_validator::validate(&mapping, dataset.headers());
    assert!(!validation.is_valid);
    assert_eq!(
        validation.errors,
        vec![MappingError::UnknownColumn {
            role: MappingRole::LastName,
            column: "surname".to_string()
        }]
    );
    Ok(())
}

/// Semicolon-delimited, Windows-1252 export with a BOM-less header
#[test]
fn test_legacy_spreadsheet_export() -> Result<()> {
    let bytes = b"E-Mail;Vorname;Nachname\nm\xFCller@example.de;J\xFCrgen;M\xFCller\n";
    let dataset = tabular_parser::parse(bytes)?;

    assert_eq!(dataset.headers(), ["E-Mail", "Vorname", "Nachname"]);
    assert_eq!(dataset.rows()[0][1], "Jürgen");

    let mapping = mapping_inferencer::infer(dataset.headers());
    assert_eq!(mapping.email.as_deref(), Some("E-Mail"));
    assert!(mapping_validator::validate(&mapping, dataset.headers()).is_valid);
    Ok(())
}

#[test]
fn test_upload_guard_blocks_before_parse() {
    let guard = UploadGuard::new(64);
    assert_eq!(
        guard.check("contacts.xlsx", 10).unwrap_err().reason(),
        "unsupported_file_type"
    );
    assert!(matches!(
        guard.check("contacts.csv", CONTACTS_CSV.len() as u64),
        Err(ParseError::TooLarge { limit: 64, .. })
    ));
}
