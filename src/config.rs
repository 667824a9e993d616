//! Pipeline configuration.
//! Built once per process invocation and passed into every entry point.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const OWID_CO2_URL: &str = "https://raw.githubusercontent.com/owid/co2-data/master/owid-co2-data.csv";
pub const OWID_ENERGY_URL: &str =
    "https://raw.githubusercontent.com/owid/energy-data/master/owid-energy-data.csv";

/// Inclusive year window kept by the cleaners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 1990,
            end: 2023,
        }
    }
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }
}

/// Remote location of a raw source and the file name it is cached under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: String,
    pub file_name: String,
}

/// Logical names of the persisted output tables (file stems).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNames {
    pub merged: String,
    pub global: String,
    pub continent: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            merged: "merged".to_string(),
            global: "global_aggregates".to_string(),
            continent: "continent_aggregates".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root data directory; raw downloads and processed tables live below it.
    pub base_dir: PathBuf,
    pub years: YearRange,
    pub paris_agreement_year: i32,
    pub co2_source: SourceSpec,
    pub energy_source: SourceSpec,
    /// Country reference CSV used by the name resolver. Defaults to
    /// `<base_dir>/country_reference.csv`.
    pub reference_table: Option<PathBuf>,
    pub output_names: OutputNames,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data"),
            years: YearRange::default(),
            paris_agreement_year: 2015,
            co2_source: SourceSpec {
                url: OWID_CO2_URL.to_string(),
                file_name: "owid-co2-data.csv".to_string(),
            },
            energy_source: SourceSpec {
                url: OWID_ENERGY_URL.to_string(),
                file_name: "owid-energy-data.csv".to_string(),
            },
            reference_table: None,
            output_names: OutputNames::default(),
            fetch_timeout_secs: 60,
            user_agent: "global-co2-renewables/1.0".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Config rooted at `base_dir`, everything else default.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Load overrides from a JSON file. Absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.base_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.base_dir.join("processed")
    }

    pub fn reference_table_path(&self) -> PathBuf {
        self.reference_table
            .clone()
            .unwrap_or_else(|| self.base_dir.join("country_reference.csv"))
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(self.raw_dir())?;
        fs::create_dir_all(self.processed_dir())?;
        Ok(())
    }
}
