//! Parsed tabular data
//!
//! A dataset is a header row plus data rows. Every row holds exactly one cell
//! per header; the constructor enforces this.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};

/// What to do with a row that has more cells than there are headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOverflow {
    /// Drop the extra cells (lenient mode)
    #[default]
    Truncate,
    /// Fail the whole parse with `ParseError::Malformed`
    Reject,
}

/// Headers plus rows, each row aligned to the headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Rows that lost cells to truncation
    truncated_rows: usize,
}

impl Dataset {
    /// Build a dataset, padding short rows with empty cells and handling long
    /// rows per `overflow`.
    pub fn new(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        overflow: RowOverflow,
    ) -> Result<Self, ParseError> {
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ParseError::Malformed("header row has no columns".to_string()));
        }

        let width = headers.len();
        let mut truncated_rows = 0;
        let mut aligned = Vec::with_capacity(rows.len());

        for (index, mut row) in rows.into_iter().enumerate() {
            if row.len() > width {
                match overflow {
                    RowOverflow::Truncate => {
                        row.truncate(width);
                        truncated_rows += 1;
                    }
                    RowOverflow::Reject => {
                        return Err(ParseError::Malformed(format!(
                            "row {} has {} cells, expected {}",
                            index + 1,
                            row.len(),
                            width
                        )));
                    }
                }
            }
            row.resize(width, String::new());
            aligned.push(row);
        }

        Ok(Self {
            headers,
            rows: aligned,
            truncated_rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Number of rows whose extra cells were dropped
    pub fn truncated_rows(&self) -> usize {
        self.truncated_rows
    }

    /// Index of the first header equal to `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Values of the first column named `name`, or `None` if absent
    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// Rows with at least one cell containing '@' (upload preview heuristic)
    pub fn rows_containing_at_sign(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|cell| cell.contains('@')))
            .count()
    }

    /// Header names that occur more than once, in first-seen order
    pub fn duplicate_headers(&self) -> Vec<&str> {
        let mut duplicates: Vec<&str> = Vec::new();
        for (i, header) in self.headers.iter().enumerate() {
            if self.headers[..i].contains(header) && !duplicates.contains(&header.as_str()) {
                duplicates.push(header);
            }
        }
        duplicates
    }

    /// First `n` rows
    pub fn preview(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }
}
