//! Statistics Calculator Module
//! Exploratory statistics over the merged table: descriptive summaries,
//! correlations and per-country rankings.

use crate::data::{GlobalAggregateRow, MergedRow};
use rayon::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Metric columns covered by the summaries and correlation matrix.
pub const METRIC_COLUMNS: [&str; 7] = [
    "co2",
    "co2_per_capita",
    "renewables_share_energy",
    "gdp",
    "population",
    "renewables_share_yoy",
    "gdp_yoy",
];

fn metric(row: &MergedRow, name: &str) -> Option<f64> {
    match name {
        "co2" => row.co2,
        "co2_per_capita" => row.co2_per_capita,
        "renewables_share_energy" => row.renewables_share_energy,
        "gdp" => row.gdp,
        "population" => row.population,
        "renewables_share_yoy" => row.renewables_share_yoy,
        "gdp_yoy" => row.gdp_yoy,
        _ => None,
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Descriptive statistics for one metric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub max: Option<f64>,
}

/// Pairwise Pearson correlations between the metric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// One entity in a per-capita ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmitterRow {
    pub country_standard: String,
    pub co2_per_capita: f64,
    pub co2: Option<f64>,
    pub population: Option<f64>,
    pub renewables_share_energy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCorrelation {
    pub country_standard: String,
    pub corr: f64,
}

/// Headline numbers for the latest available year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub latest_year: i32,
    pub co2_per_capita_global: Option<f64>,
    pub renewables_share_global: Option<f64>,
    pub paris_agreement_year: i32,
    pub top_emitters: Vec<EmitterRow>,
    pub bottom_emitters: Vec<EmitterRow>,
}

/// Handles exploratory statistics with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> Option<f64> {
        let n = sorted_values.len();
        if n == 0 {
            return None;
        }
        if n == 1 {
            return Some(sorted_values[0]);
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            Some(sorted_values[lower])
        } else {
            Some(sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac)
        }
    }

    /// Compute descriptive statistics for an array of values.
    pub fn describe(column: &str, values: &[f64]) -> ColumnSummary {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let (mean, std) = if values.is_empty() {
            (None, None)
        } else {
            (finite(values.iter().mean()), finite(values.iter().std_dev()))
        };

        ColumnSummary {
            column: column.to_string(),
            count: values.len(),
            mean,
            std,
            min: sorted.first().copied(),
            p10: Self::percentile(&sorted, 10.0),
            p25: Self::percentile(&sorted, 25.0),
            p50: Self::percentile(&sorted, 50.0),
            p75: Self::percentile(&sorted, 75.0),
            p90: Self::percentile(&sorted, 90.0),
            max: sorted.last().copied(),
        }
    }

    pub fn summary_statistics(rows: &[MergedRow]) -> Vec<ColumnSummary> {
        METRIC_COLUMNS
            .iter()
            .map(|name| {
                let values: Vec<f64> = rows.iter().filter_map(|r| metric(r, name)).collect();
                Self::describe(name, &values)
            })
            .collect()
    }

    /// Pearson correlation of paired samples; `None` with fewer than two
    /// pairs or no variance on either side.
    pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        let sx = x.iter().std_dev();
        let sy = y.iter().std_dev();
        if !(sx > 0.0 && sy > 0.0) {
            return None;
        }
        finite(x.iter().covariance(y.iter()) / (sx * sy))
    }

    fn paired(rows: &[MergedRow], a: &str, b: &str) -> (Vec<f64>, Vec<f64>) {
        rows.iter()
            .filter_map(|r| Some((metric(r, a)?, metric(r, b)?)))
            .unzip()
    }

    pub fn correlations(rows: &[MergedRow]) -> CorrelationMatrix {
        let values = METRIC_COLUMNS
            .iter()
            .map(|a| {
                METRIC_COLUMNS
                    .iter()
                    .map(|b| {
                        let (x, y) = Self::paired(rows, a, b);
                        Self::pearson(&x, &y)
                    })
                    .collect()
            })
            .collect();

        CorrelationMatrix {
            columns: METRIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            values,
        }
    }

    /// Highest and lowest per-capita emitters among the year's
    /// non-aggregate rows.
    pub fn top_bottom_by_co2_per_capita(
        rows: &[MergedRow],
        year: i32,
        top_n: usize,
    ) -> (Vec<EmitterRow>, Vec<EmitterRow>) {
        let mut ranked: Vec<EmitterRow> = rows
            .iter()
            .filter(|r| r.year == year && !r.is_aggregate)
            .filter_map(|r| {
                Some(EmitterRow {
                    country_standard: r.country_standard.clone(),
                    co2_per_capita: r.co2_per_capita?,
                    co2: r.co2,
                    population: r.population,
                    renewables_share_energy: r.renewables_share_energy,
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.co2_per_capita
                .partial_cmp(&a.co2_per_capita)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.country_standard.cmp(&b.country_standard))
        });
        let top: Vec<EmitterRow> = ranked.iter().take(top_n).cloned().collect();
        let bottom: Vec<EmitterRow> = ranked.iter().rev().take(top_n).cloned().collect();
        (top, bottom)
    }

    /// (year, renewable share) series of one entity, ascending by year.
    pub fn country_trend(rows: &[MergedRow], country: &str) -> Vec<(i32, Option<f64>)> {
        let mut series: Vec<(i32, Option<f64>)> = rows
            .iter()
            .filter(|r| r.country_standard == country)
            .map(|r| (r.year, r.renewables_share_energy))
            .collect();
        series.sort_by_key(|(year, _)| *year);
        series
    }

    /// Per-country correlation between GDP growth and renewable-share growth,
    /// computed in parallel, strongest positive first.
    pub fn gdp_vs_renewables_corr(rows: &[MergedRow]) -> Vec<CountryCorrelation> {
        let mut by_country: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for row in rows {
            if let (Some(g), Some(r)) = (row.gdp_yoy, row.renewables_share_yoy) {
                let entry = by_country.entry(row.country_standard.as_str()).or_default();
                entry.0.push(g);
                entry.1.push(r);
            }
        }

        let groups: Vec<(&str, (Vec<f64>, Vec<f64>))> = by_country.into_iter().collect();
        let mut out: Vec<CountryCorrelation> = groups
            .par_iter()
            .filter_map(|(country, (gdp, share))| {
                Some(CountryCorrelation {
                    country_standard: country.to_string(),
                    corr: Self::pearson(gdp, share)?,
                })
            })
            .collect();

        out.sort_by(|a, b| {
            b.corr
                .partial_cmp(&a.corr)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.country_standard.cmp(&b.country_standard))
        });
        out
    }

    /// Headline numbers for the latest year in the global table.
    pub fn insights(
        merged: &[MergedRow],
        global: &[GlobalAggregateRow],
        paris_agreement_year: i32,
        top_n: usize,
    ) -> Option<Insights> {
        let latest = global.iter().max_by_key(|r| r.year)?;
        let (top_emitters, bottom_emitters) =
            Self::top_bottom_by_co2_per_capita(merged, latest.year, top_n);
        Some(Insights {
            latest_year: latest.year,
            co2_per_capita_global: latest.co2_per_capita_global,
            renewables_share_global: latest.renewables_share_global,
            paris_agreement_year,
            top_emitters,
            bottom_emitters,
        })
    }
}
