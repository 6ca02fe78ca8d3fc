//! Mapping validation
//!
//! Email must be mapped to an existing header. Optional roles, when set, must
//! also name an existing header. Every violation is reported, not only the
//! first.

use crate::error::MappingError;
use crate::models::{ColumnMapping, MappingRole};
use serde::Serialize;

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingValidation {
    pub is_valid: bool,
    pub errors: Vec<MappingError>,
}

impl MappingValidation {
    /// Human-readable reasons, one per violation
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// First violation as an error, for `?` at call sites that need one
    pub fn into_result(self) -> Result<(), MappingError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Serialized form for the presentation layer: `{isValid, errors}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl From<&MappingValidation> for ValidationReport {
    fn from(v: &MappingValidation) -> Self {
        Self {
            is_valid: v.is_valid,
            errors: v.error_messages(),
        }
    }
}

/// Check `mapping` against `headers`
pub fn validate(mapping: &ColumnMapping, headers: &[String]) -> MappingValidation {
    let mut errors = Vec::new();

    for role in MappingRole::ALL {
        match mapping.get(role) {
            Some(column) if !column.trim().is_empty() => {
                if !headers.iter().any(|h| h == column) {
                    errors.push(MappingError::UnknownColumn {
                        role,
                        column: column.to_string(),
                    });
                }
            }
            _ if role.is_required() => errors.push(MappingError::MissingEmail),
            _ => {}
        }
    }

    if !errors.is_empty() {
        tracing::debug!(violations = errors.len(), "Column mapping rejected");
    }

    MappingValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}
