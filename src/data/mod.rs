//! Data module - source loading, cleaning, merging and the table boundary

mod cleaner;
pub mod frame;
mod loader;
mod processor;
mod records;
mod schema;

pub use cleaner::{clean_co2_data, clean_energy_data};
pub use loader::{read_csv, read_csv_bytes, DataLoader, RawDatasets};
pub use processor::{DataProcessor, MergeStats};
pub use records::{
    is_aggregate_code, pct_change, per_capita, ContinentAggregateRow, EmissionsRecord,
    EnergyRecord, GlobalAggregateRow, MergedRow, AGGREGATE_PREFIX,
};
pub use schema::{
    merged_template_header, required_merged_columns, validate_merged_schema, SchemaReport,
};
