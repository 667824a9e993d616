//! Error taxonomy for the processing pipeline.
//!
//! Only conditions the caller must surface live here. Unresolvable country
//! identities, missing processed output and codec fallback are handled as
//! ordinary values by the components that meet them.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to download dataset from {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("{source_name} source is missing required column '{column}'")]
    SchemaMismatch { source_name: String, column: String },
    #[error("could not persist table '{name}': {reason}")]
    Persist { name: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
