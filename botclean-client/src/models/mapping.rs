//! Column mapping and processing options

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic role a column can be mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MappingRole {
    Email,
    FirstName,
    LastName,
}

impl MappingRole {
    /// All roles, in resolution and display order
    pub const ALL: [MappingRole; 3] = [
        MappingRole::Email,
        MappingRole::FirstName,
        MappingRole::LastName,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MappingRole::Email => "Email",
            MappingRole::FirstName => "First name",
            MappingRole::LastName => "Last name",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, MappingRole::Email)
    }
}

impl fmt::Display for MappingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Assignment of roles to header names
///
/// Serialized in the wire shape the classification service expects:
/// `{"email": "...", "firstName": "...", "lastName": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl ColumnMapping {
    pub fn get(&self, role: MappingRole) -> Option<&str> {
        match role {
            MappingRole::Email => self.email.as_deref(),
            MappingRole::FirstName => self.first_name.as_deref(),
            MappingRole::LastName => self.last_name.as_deref(),
        }
    }

    /// Set or clear a role. An empty or whitespace-only name clears it.
    pub fn set(&mut self, role: MappingRole, column: Option<String>) {
        let column = column.filter(|c| !c.trim().is_empty());
        match role {
            MappingRole::Email => self.email = column,
            MappingRole::FirstName => self.first_name = column,
            MappingRole::LastName => self.last_name = column,
        }
    }

    /// Builder-style `set`
    pub fn with(mut self, role: MappingRole, column: impl Into<String>) -> Self {
        self.set(role, Some(column.into()));
        self
    }

    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }

    /// Populated roles with their column names
    pub fn assigned(&self) -> impl Iterator<Item = (MappingRole, &str)> {
        MappingRole::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|column| (role, column)))
    }
}

/// User-selectable options, snapshotted at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedOptions {
    /// Verify the email domain has mail servers
    pub enable_mx_check: bool,
    /// Count syntactically invalid or undeliverable addresses as bots
    pub treat_invalid_as_bots: bool,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            enable_mx_check: true,
            treat_invalid_as_bots: true,
        }
    }
}

/// Full option set sent with a classification request
///
/// The service echoes this back as `processing_options` in its summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParameters {
    pub enable_syntax_check: bool,
    pub enable_mx_check: bool,
    pub treat_invalid_as_bots: bool,
    /// Seconds
    pub mx_check_timeout: f64,
    pub bot_threshold: f64,
}

impl ProcessingParameters {
    pub const MX_CHECK_TIMEOUT_SECS: f64 = 5.0;
    pub const BOT_THRESHOLD: f64 = 1.0;

    /// User options plus the fixed internal tuning values
    pub fn from_options(options: AdvancedOptions) -> Self {
        Self {
            enable_syntax_check: true,
            enable_mx_check: options.enable_mx_check,
            treat_invalid_as_bots: options.treat_invalid_as_bots,
            mx_check_timeout: Self::MX_CHECK_TIMEOUT_SECS,
            bot_threshold: Self::BOT_THRESHOLD,
        }
    }

    /// Query-string pairs for the `/process` endpoint
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("enable_syntax_check", self.enable_syntax_check.to_string()),
            ("enable_mx_check", self.enable_mx_check.to_string()),
            ("treat_invalid_as_bots", self.treat_invalid_as_bots.to_string()),
            ("mx_check_timeout", format!("{:.1}", self.mx_check_timeout)),
            ("bot_threshold", format!("{:.1}", self.bot_threshold)),
        ]
    }
}

impl Default for ProcessingParameters {
    fn default() -> Self {
        Self::from_options(AdvancedOptions::default())
    }
}
