//! Typed rows flowing between pipeline stages.

use serde::Serialize;

/// Prefix OWID uses for region, income-group and world aggregates.
pub const AGGREGATE_PREFIX: &str = "OWID_";

/// Cleaned row of the emissions source.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionsRecord {
    pub country_standard: String,
    pub iso_code: Option<String>,
    pub continent: Option<String>,
    pub year: i32,
    /// Million tonnes.
    pub co2: Option<f64>,
    /// Tonnes per person.
    pub co2_per_capita: Option<f64>,
    pub gdp: Option<f64>,
    pub population: Option<f64>,
}

/// Cleaned row of the energy source.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRecord {
    pub country_standard: String,
    pub iso_code: Option<String>,
    pub continent: Option<String>,
    pub year: i32,
    /// Percent of primary energy.
    pub renewables_share_energy: Option<f64>,
}

/// One (entity, year) row of the merged table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub country_standard: String,
    pub iso_code: Option<String>,
    pub year: i32,
    pub continent: Option<String>,
    pub co2: Option<f64>,
    pub co2_per_capita: Option<f64>,
    pub gdp: Option<f64>,
    pub population: Option<f64>,
    pub renewables_share_energy: Option<f64>,
    /// Percent change against the previous row of the same entity.
    pub renewables_share_yoy: Option<f64>,
    pub gdp_yoy: Option<f64>,
    pub is_aggregate: bool,
}

impl MergedRow {
    /// Column names of the merged table, in output order.
    pub const COLUMNS: [&'static str; 12] = [
        "country_standard",
        "iso_code",
        "year",
        "continent",
        "co2",
        "co2_per_capita",
        "gdp",
        "population",
        "renewables_share_energy",
        "renewables_share_yoy",
        "gdp_yoy",
        "is_aggregate",
    ];
}

/// True when the code (absent counts as the empty string) marks an OWID aggregate.
pub fn is_aggregate_code(iso_code: Option<&str>) -> bool {
    iso_code.unwrap_or("").starts_with(AGGREGATE_PREFIX)
}

/// Population-weighted world totals for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalAggregateRow {
    pub year: i32,
    pub co2_global: Option<f64>,
    pub population_global: Option<f64>,
    pub renewables_share_global: Option<f64>,
    pub co2_per_capita_global: Option<f64>,
}

impl GlobalAggregateRow {
    pub const COLUMNS: [&'static str; 5] = [
        "year",
        "co2_global",
        "population_global",
        "renewables_share_global",
        "co2_per_capita_global",
    ];
}

/// Population-weighted totals for one continent and year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentAggregateRow {
    pub continent: String,
    pub year: i32,
    pub co2: Option<f64>,
    pub population: Option<f64>,
    pub renewables_share_energy: Option<f64>,
    pub co2_per_capita: Option<f64>,
    pub gdp: Option<f64>,
    pub gdp_yoy: Option<f64>,
}

impl ContinentAggregateRow {
    pub const COLUMNS: [&'static str; 8] = [
        "continent",
        "year",
        "co2",
        "population",
        "renewables_share_energy",
        "co2_per_capita",
        "gdp",
        "gdp_yoy",
    ];
}

/// `co2 * 1e6 / population`, defined only for a positive population.
pub fn per_capita(co2: Option<f64>, population: Option<f64>) -> Option<f64> {
    match (co2, population) {
        (Some(c), Some(p)) if p > 0.0 => Some(c * 1e6 / p),
        _ => None,
    }
}

/// `(curr - prev) / prev * 100`; null when either side is null or prev is zero.
pub fn pct_change(prev: Option<f64>, curr: Option<f64>) -> Option<f64> {
    match (prev, curr) {
        (Some(p), Some(c)) if p != 0.0 => Some((c - p) / p * 100.0),
        _ => None,
    }
}
