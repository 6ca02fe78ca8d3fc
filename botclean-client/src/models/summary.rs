//! Processing results returned by the classification service

use crate::models::ProcessingParameters;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Counts for one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub total_rows: u64,
    pub rows_with_email: u64,
    pub rows_without_email: u64,
    pub bots_count: u64,
    pub clean_count: u64,

    // Email status breakdown; older services omit these
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_emails: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_syntax_emails: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_mx_emails: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_emails: Option<u64>,

    /// Completion time, ISO 8601 as sent by the service
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_options: Option<ProcessingParameters>,
}

impl ProcessingSummary {
    /// Placeholder used when a bundle has no readable summary
    ///
    /// Only `total_rows` is meaningful; every classification count is zero.
    pub fn zero_filled(total_rows: u64) -> Self {
        Self {
            total_rows,
            rows_with_email: 0,
            rows_without_email: 0,
            bots_count: 0,
            clean_count: 0,
            valid_emails: None,
            invalid_syntax_emails: None,
            no_mx_emails: None,
            unknown_emails: None,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            processing_options: None,
        }
    }

    /// Parsed `timestamp`, if it is valid RFC 3339
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Consistency problems in the counts, empty when consistent
    ///
    /// Rows without an email are neither bot nor clean, so
    /// `bots + clean` may not exceed `rows_with_email`.
    /// Counts come from the service unchecked; a sum that overflows `u64`
    /// is reported as a violation.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let split = self.rows_with_email.checked_add(self.rows_without_email);
        if split != Some(self.total_rows) {
            violations.push(format!(
                "rows_with_email ({}) + rows_without_email ({}) != total_rows ({})",
                self.rows_with_email, self.rows_without_email, self.total_rows
            ));
        }
        let classified = self.bots_count.checked_add(self.clean_count);
        if classified.map_or(true, |n| n > self.rows_with_email) {
            violations.push(format!(
                "bots_count ({}) + clean_count ({}) > rows_with_email ({})",
                self.bots_count, self.clean_count, self.rows_with_email
            ));
        }
        violations
    }

    /// Share of classified rows that are bots, 0.0 when nothing was classified
    pub fn bot_ratio(&self) -> f64 {
        let classified = self.bots_count as f64 + self.clean_count as f64;
        if classified == 0.0 {
            0.0
        } else {
            self.bots_count as f64 / classified
        }
    }
}

/// Per-row outcome in the `BOT` column of the annotated output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BotStatus {
    True,
    False,
    /// Row had no usable email
    Unknown,
}

impl FromStr for BotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "TRUE" => Ok(BotStatus::True),
            "FALSE" => Ok(BotStatus::False),
            "UNKNOWN" => Ok(BotStatus::Unknown),
            other => Err(format!("unexpected BOT value '{}'", other)),
        }
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BotStatus::True => "TRUE",
            BotStatus::False => "FALSE",
            BotStatus::Unknown => "UNKNOWN",
        })
    }
}

/// Row counts per `BOT` value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BotTally {
    pub bots: u64,
    pub clean: u64,
    pub unknown: u64,
}

impl BotTally {
    pub fn record(&mut self, status: BotStatus) {
        match status {
            BotStatus::True => self.bots = self.bots.saturating_add(1),
            BotStatus::False => self.clean = self.clean.saturating_add(1),
            BotStatus::Unknown => self.unknown = self.unknown.saturating_add(1),
        }
    }

    pub fn total(&self) -> u64 {
        self.bots
            .saturating_add(self.clean)
            .saturating_add(self.unknown)
    }
}
