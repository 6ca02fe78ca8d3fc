//! Result bundle access
//!
//! The bundle is a zip archive. `open` checks the archive structure and
//! records member names; members are decompressed on each request and never
//! cached, so repeated extraction re-reads the stored bytes.

use crate::error::ExtractError;
use crate::models::{BotStatus, BotTally, ProcessingSummary};
use crate::services::tabular_parser::TabularParser;
use botclean_common::config::SummaryFallback;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

/// Column added to the annotated output
pub const BOT_COLUMN: &str = "BOT";

/// Largest member `extract_bytes` will decompress
pub const MAX_MEMBER_BYTES: u64 = 256 * 1024 * 1024;

/// Conventional bundle members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMember {
    /// Rows classified clean (plus rows without email)
    Clean,
    Bots,
    /// Every input row with the `BOT` column appended
    Annotated,
    Summary,
}

impl ResultMember {
    pub const ALL: [ResultMember; 4] = [
        ResultMember::Clean,
        ResultMember::Bots,
        ResultMember::Annotated,
        ResultMember::Summary,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ResultMember::Clean => "clean.csv",
            ResultMember::Bots => "bots.csv",
            ResultMember::Annotated => "annotated.csv",
            ResultMember::Summary => "summary.json",
        }
    }
}

impl fmt::Display for ResultMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Opened result bundle
///
/// Cheap to clone; clones share the underlying bytes.
#[derive(Clone)]
pub struct ResultArchive {
    bytes: Arc<[u8]>,
    members: Vec<String>,
    member_limit: u64,
}

impl fmt::Debug for ResultArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultArchive")
            .field("size", &self.bytes.len())
            .field("members", &self.members)
            .field("member_limit", &self.member_limit)
            .finish()
    }
}

impl ResultArchive {
    /// Validate archive structure and take ownership of the bytes
    pub fn open(bytes: Vec<u8>) -> Result<Self, ExtractError> {
        let members: Vec<String> = {
            let archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
                .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;
            archive.file_names().map(str::to_owned).collect()
        };
        debug!(size = bytes.len(), members = members.len(), "Opened result bundle");

        Ok(Self {
            bytes: Arc::from(bytes),
            members,
            member_limit: MAX_MEMBER_BYTES,
        })
    }

    /// Override the per-member decompression limit
    pub fn with_member_limit(mut self, limit: u64) -> Self {
        self.member_limit = limit;
        self
    }

    /// Raw bundle bytes, for saving the download
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn member_names(&self) -> &[String] {
        &self.members
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Stored member name for `name`
    ///
    /// Exact match first, then case-insensitive with `\` read as `/`.
    fn resolve(&self, name: &str) -> Option<&str> {
        if let Some(exact) = self.members.iter().find(|m| *m == name) {
            return Some(exact);
        }
        let pattern = name.replace('\\', "/");
        self.members
            .iter()
            .find(|m| pattern.eq_ignore_ascii_case(m))
            .map(String::as_str)
    }

    /// Decompressed bytes of one member
    pub fn extract_bytes(&self, name: &str) -> Result<Vec<u8>, ExtractError> {
        let not_found = || ExtractError::NotFound {
            member: name.to_string(),
        };
        let malformed = |reason: String| ExtractError::Malformed {
            member: name.to_string(),
            reason,
        };

        let stored = self.resolve(name).ok_or_else(not_found)?;

        let mut archive = ZipArchive::new(Cursor::new(&self.bytes[..]))
            .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;
        let mut file = match archive.by_name(stored) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(not_found()),
            Err(e) => return Err(malformed(e.to_string())),
        };

        // Declared sizes come from the archive and are not trusted
        let declared = file.size();
        if declared > self.member_limit {
            return Err(malformed(format!(
                "declared size {} exceeds limit of {} bytes",
                declared, self.member_limit
            )));
        }

        let mut content = Vec::new();
        file.by_ref()
            .take(self.member_limit.saturating_add(1))
            .read_to_end(&mut content)
            .map_err(|e| malformed(e.to_string()))?;
        if content.len() as u64 > self.member_limit {
            return Err(malformed(format!(
                "content exceeds limit of {} bytes",
                self.member_limit
            )));
        }
        Ok(content)
    }

    /// Member content as UTF-8 text, byte-order mark included if present
    pub fn extract(&self, name: &str) -> Result<String, ExtractError> {
        let bytes = self.extract_bytes(name)?;
        String::from_utf8(bytes).map_err(|_| ExtractError::Malformed {
            member: name.to_string(),
            reason: "not valid UTF-8".to_string(),
        })
    }

    pub fn extract_member(&self, member: ResultMember) -> Result<String, ExtractError> {
        self.extract(member.file_name())
    }

    /// Parse `summary.json`, failing on absence or bad content
    pub fn parse_summary(&self) -> Result<ProcessingSummary, ExtractError> {
        let name = ResultMember::Summary.file_name();
        let text = self.extract(name)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        serde_json::from_str(text).map_err(|e| ExtractError::Malformed {
            member: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Summary with the configured fallback for a missing or broken member
    ///
    /// Under `ZeroFilled` the result is never an error: problems are logged
    /// and a zero-count summary for `total_rows` is returned instead.
    pub fn extract_summary(
        &self,
        total_rows: u64,
        fallback: SummaryFallback,
    ) -> Result<ProcessingSummary, ExtractError> {
        match (self.parse_summary(), fallback) {
            (Ok(summary), _) => Ok(summary),
            (Err(e), SummaryFallback::ZeroFilled) => {
                warn!(error = %e, total_rows, "Summary unavailable, using zero-filled summary");
                Ok(ProcessingSummary::zero_filled(total_rows))
            }
            (Err(e), SummaryFallback::Strict) => Err(e),
        }
    }

    /// Count `BOT` values in `annotated.csv`
    pub fn bot_tally(&self) -> Result<BotTally, ExtractError> {
        let name = ResultMember::Annotated.file_name();
        let malformed = |reason: String| ExtractError::Malformed {
            member: name.to_string(),
            reason,
        };

        let text = self.extract(name)?;
        let dataset = TabularParser::default()
            .with_delimiter(b',')
            .parse_text(&text)
            .map_err(|e| malformed(e.to_string()))?;
        let values = dataset
            .column_values(BOT_COLUMN)
            .ok_or_else(|| malformed(format!("missing {} column", BOT_COLUMN)))?;

        let mut tally = BotTally::default();
        for value in values {
            tally.record(value.parse::<BotStatus>().map_err(malformed)?);
        }
        Ok(tally)
    }
}
