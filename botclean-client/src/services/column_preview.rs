//! Mapping preview shown before submission

use crate::models::{AdvancedOptions, ColumnMapping, Dataset, MappingRole};
use serde::Serialize;

/// Rows sampled per mapped column
pub const PREVIEW_ROWS: usize = 5;

/// Rows per estimated processing minute
const ROWS_PER_MINUTE: u64 = 1000;

/// MX lookups roughly triple processing time
const MX_CHECK_FACTOR: u64 = 3;

/// Sample values for one mapped role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPreview {
    pub role: MappingRole,
    pub column: String,
    pub required: bool,
    pub samples: Vec<String>,
}

/// Previews for every mapped role whose column exists in `dataset`
///
/// Roles mapped to a missing column are skipped; the validator reports them.
pub fn preview(dataset: &Dataset, mapping: &ColumnMapping) -> Vec<ColumnPreview> {
    mapping
        .assigned()
        .filter_map(|(role, column)| {
            let index = dataset.column_index(column)?;
            let samples = dataset
                .preview(PREVIEW_ROWS)
                .iter()
                .map(|row| row[index].clone())
                .collect();
            Some(ColumnPreview {
                role,
                column: column.to_string(),
                required: role.is_required(),
                samples,
            })
        })
        .collect()
}

/// Rough processing time in whole minutes, at least 1
pub fn estimate_processing_minutes(rows: u64, options: &AdvancedOptions) -> u64 {
    let factor = if options.enable_mx_check { MX_CHECK_FACTOR } else { 1 };
    (rows.div_ceil(ROWS_PER_MINUTE) * factor).max(1)
}
