//! Configuration loading for the BotClean client
//!
//! Resolution priority (highest first):
//! 1. Environment variables (`BOTCLEAN_*`)
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! A missing TOML file is not an error. An unreadable one is `Error::Io`, an
//! unparseable one `Error::Config`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ENV_SERVER_URL: &str = "BOTCLEAN_SERVER_URL";
pub const ENV_SUBMISSION_TIMEOUT: &str = "BOTCLEAN_SUBMISSION_TIMEOUT_SECS";
pub const ENV_BUNDLE_TIMEOUT: &str = "BOTCLEAN_BUNDLE_TIMEOUT_SECS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "BOTCLEAN_MAX_UPLOAD_BYTES";
pub const ENV_SUMMARY_FALLBACK: &str = "BOTCLEAN_SUMMARY_FALLBACK";

const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
const DEFAULT_SUBMISSION_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BUNDLE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// What to do when a result bundle lacks a usable `summary.json`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFallback {
    /// Substitute a zero-filled summary built from the dataset row count
    ZeroFilled,
    /// Treat the missing summary as an error
    Strict,
}

impl std::str::FromStr for SummaryFallback {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero_filled" | "zero-filled" => Ok(Self::ZeroFilled),
            "strict" => Ok(Self::Strict),
            other => Err(Error::Config(format!(
                "Unknown summary fallback policy '{}' (expected 'zero_filled' or 'strict')",
                other
            ))),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the remote classification service
    pub server_url: String,
    /// Upper bound on the submission call (upload + classification)
    pub submission_timeout_secs: u64,
    /// Upper bound on the result bundle download
    pub bundle_timeout_secs: u64,
    /// Largest upload accepted before parsing
    pub max_upload_bytes: u64,
    /// Policy for a missing or malformed `summary.json`
    pub summary_fallback: SummaryFallback,
    /// Check the credit balance against the row count before submitting
    pub credit_preflight: bool,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            submission_timeout_secs: DEFAULT_SUBMISSION_TIMEOUT_SECS,
            bundle_timeout_secs: DEFAULT_BUNDLE_TIMEOUT_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            summary_fallback: SummaryFallback::ZeroFilled,
            credit_preflight: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from `path` (or the default location), then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(ref p) if p.exists() => Self::from_toml_file(p)?,
            Some(ref p) => {
                debug!("No config file at {}, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without env overrides
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!("Read {} failed: {}", path.display(), e);
            Error::Io(e)
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(url) = env_value(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(v) = env_value(ENV_SUBMISSION_TIMEOUT) {
            self.submission_timeout_secs = parse_u64(ENV_SUBMISSION_TIMEOUT, &v)?;
        }
        if let Some(v) = env_value(ENV_BUNDLE_TIMEOUT) {
            self.bundle_timeout_secs = parse_u64(ENV_BUNDLE_TIMEOUT, &v)?;
        }
        if let Some(v) = env_value(ENV_MAX_UPLOAD_BYTES) {
            self.max_upload_bytes = parse_u64(ENV_MAX_UPLOAD_BYTES, &v)?;
        }
        if let Some(v) = env_value(ENV_SUMMARY_FALLBACK) {
            self.summary_fallback = v.parse()?;
        }
        Ok(())
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::Config("server_url must not be empty".to_string()));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server_url must be an http(s) URL, got '{}'",
                self.server_url
            )));
        }
        if self.submission_timeout_secs == 0 || self.bundle_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least one second".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }

    pub fn bundle_timeout(&self) -> Duration {
        Duration::from_secs(self.bundle_timeout_secs)
    }
}

/// `<config_dir>/botclean/client.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("botclean").join("client.toml"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!(
            "{} must be a non-negative integer, got '{}'",
            name, value
        ))
    })
}
