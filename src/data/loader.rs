//! Raw Source Loader Module
//! Downloads the OWID CSV sources, caches them locally and reads them with Polars.

use crate::config::{PipelineConfig, SourceSpec};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use ureq::Agent;

/// The two raw source tables as read from disk or memory.
#[derive(Debug, Clone)]
pub struct RawDatasets {
    pub co2: DataFrame,
    pub energy: DataFrame,
}

/// Read a CSV file, inferring the schema over the whole file.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(None)
        .with_ignore_errors(true)
        .finish()?
        .collect()?;
    Ok(df)
}

/// Read CSV data already held in memory.
pub fn read_csv_bytes(bytes: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_ignore_errors(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Fetches and caches the raw sources named in the configuration.
pub struct DataLoader<'a> {
    config: &'a PipelineConfig,
    agent: Agent,
}

impl<'a> DataLoader<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.fetch_timeout_secs)))
            .build();
        Self {
            config,
            agent: Agent::new_with_config(agent_config),
        }
    }

    /// Download `url` into `dest`.
    ///
    /// The body is streamed into a `.part` sibling and renamed once complete,
    /// so an interrupted download never leaves a truncated cache file.
    pub fn fetch_csv(&self, url: &str, dest: &Path) -> Result<()> {
        let fetch_err = |reason: String| PipelineError::Fetch {
            url: url.to_string(),
            reason,
        };

        info!("downloading {}", url);
        let response = self
            .agent
            .get(url)
            .header("User-Agent", self.config.user_agent.as_str())
            .call()
            .map_err(|e| fetch_err(e.to_string()))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = dest.with_extension("part");
        let mut file = File::create(&partial)?;
        let mut reader = response.into_body().into_reader();
        let bytes = io::copy(&mut reader, &mut file).map_err(|e| {
            let _ = fs::remove_file(&partial);
            fetch_err(format!("reading response body: {e}"))
        })?;
        fs::rename(&partial, dest)?;

        info!("cached {} bytes -> {}", bytes, dest.display());
        Ok(())
    }

    fn ensure_cached(&self, source: &SourceSpec, force: bool) -> Result<PathBuf> {
        let path = self.config.raw_dir().join(&source.file_name);
        if force || !path.exists() {
            self.fetch_csv(&source.url, &path)?;
        } else {
            debug!("using cached {}", path.display());
        }
        Ok(path)
    }

    /// Download both sources unless already cached; returns (co2, energy) paths.
    pub fn download_sources(&self, force: bool) -> Result<(PathBuf, PathBuf)> {
        self.config.ensure_directories()?;
        let co2 = self.ensure_cached(&self.config.co2_source, force)?;
        let energy = self.ensure_cached(&self.config.energy_source, force)?;
        Ok((co2, energy))
    }

    pub fn load_raw_datasets(&self, force: bool) -> Result<RawDatasets> {
        let (co2_path, energy_path) = self.download_sources(force)?;
        let co2 = read_csv(&co2_path)?;
        let energy = read_csv(&energy_path)?;
        info!(
            "raw sources loaded: co2 {} rows, energy {} rows",
            co2.height(),
            energy.height()
        );
        Ok(RawDatasets { co2, energy })
    }
}
