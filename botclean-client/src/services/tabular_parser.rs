//! Tabular parser
//!
//! Turns uploaded bytes into a [`Dataset`]. The first record is always the
//! header row. Short rows are padded; long rows follow [`RowOverflow`].
//!
//! Decoding order: BOM-declared encoding, then UTF-8, then Windows-1252 for
//! text that is not UTF-8 but does not look binary either.

use crate::error::ParseError;
use crate::models::{Dataset, RowOverflow};
use csv::ReaderBuilder;
use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::{debug, warn};

/// Candidate delimiters, in tie-break order
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Lines sampled for delimiter detection
const DELIMITER_SAMPLE_LINES: usize = 10;

/// Above this share of control characters, non-UTF-8 input counts as binary
const MAX_CONTROL_RATIO: f32 = 0.1;

/// Parser settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserOptions {
    /// Handling of rows wider than the header row
    pub overflow: RowOverflow,
    /// Fixed delimiter; detected from content when `None`
    pub delimiter: Option<u8>,
}

/// CSV parser with encoding and delimiter detection
#[derive(Debug, Clone, Default)]
pub struct TabularParser {
    options: ParserOptions,
}

impl TabularParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn with_overflow(mut self, overflow: RowOverflow) -> Self {
        self.options.overflow = overflow;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.options.delimiter = Some(delimiter);
        self
    }

    /// Decode and parse raw file bytes
    pub fn parse(&self, bytes: &[u8]) -> Result<Dataset, ParseError> {
        let text = decode(bytes)?;
        self.parse_text(&text)
    }

    /// Parse already-decoded text
    pub fn parse_text(&self, text: &str) -> Result<Dataset, ParseError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let delimiter = self
            .options
            .delimiter
            .unwrap_or_else(|| detect_delimiter(text));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records = reader.records();

        let headers: Vec<String> = match records.next() {
            Some(record) => record
                .map_err(|e| ParseError::Malformed(format!("header row: {}", e)))?
                .iter()
                .map(|h| h.trim().to_string())
                .collect(),
            None => return Err(ParseError::Empty),
        };

        let mut rows = Vec::new();
        for (index, record) in records.enumerate() {
            let record = record
                .map_err(|e| ParseError::Malformed(format!("row {}: {}", index + 1, e)))?;

            // Whitespace-only line in a multi-column file
            if headers.len() > 1 && record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }

            rows.push(record.iter().map(str::to_string).collect());
        }

        let dataset = Dataset::new(headers, rows, self.options.overflow)?;

        if dataset.truncated_rows() > 0 {
            warn!(
                truncated_rows = dataset.truncated_rows(),
                "Rows wider than the header row were truncated"
            );
        }
        let duplicates = dataset.duplicate_headers();
        if !duplicates.is_empty() {
            warn!(?duplicates, "Duplicate header names; mapping uses the first occurrence");
        }

        debug!(
            columns = dataset.column_count(),
            rows = dataset.row_count(),
            delimiter = %(delimiter as char).escape_default(),
            "Parsed tabular input"
        );

        Ok(dataset)
    }
}

/// Parse with default options (detected delimiter, truncate long rows)
pub fn parse(bytes: &[u8]) -> Result<Dataset, ParseError> {
    TabularParser::default().parse(bytes)
}

/// Decode raw bytes to text, stripping any byte-order mark
pub fn decode(bytes: &[u8]) -> Result<String, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|text| text.into_owned())
            .ok_or(ParseError::Undecodable);
    }

    if looks_binary(bytes) {
        return Err(ParseError::Undecodable);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            debug!("Input is not UTF-8, decoding as Windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            Ok(text.into_owned())
        }
    }
}

/// NUL bytes or a high share of control characters
fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.contains(&0) {
        return true;
    }
    let control = bytes
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
        .count();
    control as f32 / bytes.len() as f32 > MAX_CONTROL_RATIO
}

/// Pick the delimiter whose per-line count is highest and most consistent
///
/// Falls back to comma when no candidate appears at all.
pub fn detect_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    if sample.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0.0f32;

    for &delimiter in &DELIMITERS {
        let counts: Vec<f32> = sample
            .iter()
            .map(|line| line.bytes().filter(|&b| b == delimiter).count() as f32)
            .collect();

        let avg = counts.iter().sum::<f32>() / counts.len() as f32;
        let variance =
            counts.iter().map(|c| (c - avg).powi(2)).sum::<f32>() / counts.len() as f32;
        let score = avg / (1.0 + variance.sqrt());

        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}
