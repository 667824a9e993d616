//! End-to-end orchestration: clean, merge, aggregate, persist.
//!
//! Every stage returns a new table; nothing is mutated across stages, so
//! re-running on identical inputs reproduces identical outputs.

use crate::config::PipelineConfig;
use crate::country::CountryResolver;
use crate::data::frame::{
    continent_to_frame, global_from_frame, global_to_frame, merged_from_frame, merged_to_frame,
};
use crate::data::{
    clean_co2_data, clean_energy_data, validate_merged_schema, ContinentAggregateRow,
    DataLoader, DataProcessor, GlobalAggregateRow, MergedRow, SchemaReport,
};
use crate::error::Result;
use crate::stats::Aggregator;
use crate::storage::TableStore;
use polars::prelude::*;
use tracing::info;

/// Output tables of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedData {
    pub merged: Vec<MergedRow>,
    pub global: Vec<GlobalAggregateRow>,
    pub continent: Vec<ContinentAggregateRow>,
}

/// Outcome of importing externally supplied merged data.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Required columns were missing; nothing was saved.
    Rejected(SchemaReport),
    Imported(ProcessedData),
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    resolver: &'a dyn CountryResolver,
    store: &'a TableStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        resolver: &'a dyn CountryResolver,
        store: &'a TableStore,
    ) -> Self {
        Self {
            config,
            resolver,
            store,
        }
    }

    /// Clean both sources, merge and aggregate. Nothing is written.
    pub fn process(&self, co2: &DataFrame, energy: &DataFrame) -> Result<ProcessedData> {
        let years = self.config.years;
        let co2_clean = clean_co2_data(co2, years, self.resolver)?;
        let energy_clean = clean_energy_data(energy, years, self.resolver)?;
        let merged = DataProcessor::merge_datasets(&co2_clean, &energy_clean, self.resolver);
        Ok(Self::derive(merged))
    }

    fn derive(merged: Vec<MergedRow>) -> ProcessedData {
        let global = Aggregator::compute_global_aggregates(&merged);
        let continent = Aggregator::compute_continent_aggregates(&merged);
        ProcessedData {
            merged,
            global,
            continent,
        }
    }

    /// Process and persist all output tables.
    pub fn build_processed_dataset(
        &self,
        co2: &DataFrame,
        energy: &DataFrame,
    ) -> Result<ProcessedData> {
        self.config.ensure_directories()?;
        let data = self.process(co2, energy)?;
        self.save(&data)?;
        Ok(data)
    }

    pub fn save(&self, data: &ProcessedData) -> Result<()> {
        let names = &self.config.output_names;
        self.store.save(&merged_to_frame(&data.merged)?, &names.merged)?;
        self.store.save(&global_to_frame(&data.global)?, &names.global)?;
        self.store
            .save(&continent_to_frame(&data.continent)?, &names.continent)?;
        Ok(())
    }

    /// Previously processed tables, or `None` until both the merged and the
    /// global table exist. Continent rollups are recomputed from the merged rows.
    pub fn load_processed(&self) -> Result<Option<ProcessedData>> {
        let names = &self.config.output_names;
        let Some(merged_df) = self.store.load(&names.merged)? else {
            return Ok(None);
        };
        let Some(global_df) = self.store.load(&names.global)? else {
            return Ok(None);
        };

        let merged = merged_from_frame(&merged_df)?;
        let global = global_from_frame(&global_df)?;
        let continent = Aggregator::compute_continent_aggregates(&merged);
        Ok(Some(ProcessedData {
            merged,
            global,
            continent,
        }))
    }

    /// Load processed data, running acquisition and the full pipeline when
    /// nothing has been processed yet.
    pub fn load_or_build(&self, loader: &DataLoader, force_download: bool) -> Result<ProcessedData> {
        if !force_download {
            if let Some(data) = self.load_processed()? {
                info!("using processed data from {}", self.store.dir().display());
                return Ok(data);
            }
        }
        info!("no processed data yet; running the pipeline");
        let raw = loader.load_raw_datasets(force_download)?;
        self.build_processed_dataset(&raw.co2, &raw.energy)
    }

    /// Replace the processed data with an externally supplied merged table.
    ///
    /// Global aggregates are recomputed unless supplied alongside.
    pub fn import_merged(
        &self,
        merged_df: &DataFrame,
        global_df: Option<&DataFrame>,
    ) -> Result<ImportOutcome> {
        let report = validate_merged_schema(merged_df);
        if !report.is_valid() {
            return Ok(ImportOutcome::Rejected(report));
        }

        let merged = merged_from_frame(merged_df)?;
        let mut data = Self::derive(merged);
        if let Some(df) = global_df {
            data.global = global_from_frame(df)?;
        }
        self.config.ensure_directories()?;
        self.save(&data)?;
        info!("imported {} merged rows", data.merged.len());
        Ok(ImportOutcome::Imported(data))
    }
}
