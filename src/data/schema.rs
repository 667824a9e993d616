//! Merged-table schema check for externally supplied replacement data.

use super::frame::has_column;
use super::records::MergedRow;
use polars::prelude::*;
use serde::Serialize;

/// Result of checking a frame against the merged-table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// Required columns absent from the frame, in schema order.
    pub missing: Vec<String>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

pub fn required_merged_columns() -> &'static [&'static str] {
    &MergedRow::COLUMNS
}

/// CSV header line a valid merged upload starts with.
pub fn merged_template_header() -> String {
    required_merged_columns().join(",")
}

pub fn validate_merged_schema(df: &DataFrame) -> SchemaReport {
    SchemaReport {
        missing: required_merged_columns()
            .iter()
            .filter(|name| !has_column(df, name))
            .map(|name| name.to_string())
            .collect(),
    }
}
