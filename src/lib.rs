//! Global CO2 & Renewables - data pipeline
//!
//! Cleans and merges the OWID CO2 and energy datasets into a per-country-year
//! table, derives per-capita and year-over-year metrics, and rolls them up
//! into population-weighted global and continent aggregates.

pub mod config;
pub mod country;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod stats;
pub mod storage;

pub use config::{PipelineConfig, YearRange};
pub use error::{PipelineError, Result};
pub use pipeline::{ImportOutcome, Pipeline, ProcessedData};
