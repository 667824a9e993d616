//! Aggregation Module
//! Population-weighted yearly rollups, world-wide and per continent.
//!
//! Every sum follows "at least one contributor" semantics: a year where all
//! inputs are null aggregates to null, never to zero.

use crate::data::{pct_change, per_capita, ContinentAggregateRow, GlobalAggregateRow, MergedRow};
use std::collections::BTreeMap;
use tracing::info;

/// Sum over non-null values; null when nothing contributed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullableSum {
    total: f64,
    count: usize,
}

impl NullableSum {
    pub fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.total += v;
            self.count += 1;
        }
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.total)
    }
}

/// Weighted mean over (value, weight) pairs. A pair contributes only when
/// both sides are present; numerator and denominator are each null until
/// something contributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedMean {
    numerator: NullableSum,
    denominator: NullableSum,
}

impl WeightedMean {
    pub fn add(&mut self, value: Option<f64>, weight: Option<f64>) {
        if let (Some(v), Some(w)) = (value, weight) {
            self.numerator.add(Some(v * w));
            self.denominator.add(Some(w));
        }
    }

    pub fn value(&self) -> Option<f64> {
        match (self.numerator.value(), self.denominator.value()) {
            (Some(num), Some(den)) if den != 0.0 => Some(num / den),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct YearBucket {
    co2: NullableSum,
    population: NullableSum,
    renewables: WeightedMean,
    gdp: NullableSum,
}

impl YearBucket {
    fn add(&mut self, row: &MergedRow) {
        self.co2.add(row.co2);
        self.population.add(row.population);
        self.renewables.add(row.renewables_share_energy, row.population);
        self.gdp.add(row.gdp);
    }
}

/// Handles the yearly rollups.
pub struct Aggregator;

impl Aggregator {
    /// One row per distinct year among non-aggregate rows, ascending.
    pub fn compute_global_aggregates(rows: &[MergedRow]) -> Vec<GlobalAggregateRow> {
        let mut by_year: BTreeMap<i32, YearBucket> = BTreeMap::new();
        for row in rows.iter().filter(|r| !r.is_aggregate) {
            by_year.entry(row.year).or_default().add(row);
        }

        let out: Vec<GlobalAggregateRow> = by_year
            .into_iter()
            .map(|(year, bucket)| {
                let co2_global = bucket.co2.value();
                let population_global = bucket.population.value();
                GlobalAggregateRow {
                    year,
                    co2_global,
                    population_global,
                    renewables_share_global: bucket.renewables.value(),
                    co2_per_capita_global: per_capita(co2_global, population_global),
                }
            })
            .collect();

        info!("global aggregates: {} years", out.len());
        out
    }

    /// One row per (continent, year) among non-aggregate rows with a
    /// continent, ordered by continent then year. `gdp_yoy` compares the
    /// summed GDP with the continent's previous year.
    pub fn compute_continent_aggregates(rows: &[MergedRow]) -> Vec<ContinentAggregateRow> {
        let mut groups: BTreeMap<(&str, i32), YearBucket> = BTreeMap::new();
        for row in rows.iter().filter(|r| !r.is_aggregate) {
            if let Some(continent) = row.continent.as_deref() {
                groups.entry((continent, row.year)).or_default().add(row);
            }
        }

        let mut out: Vec<ContinentAggregateRow> = Vec::with_capacity(groups.len());
        for ((continent, year), bucket) in groups {
            let gdp = bucket.gdp.value();
            let gdp_yoy = out
                .last()
                .filter(|prev| prev.continent == continent)
                .and_then(|prev| pct_change(prev.gdp, gdp));
            let co2 = bucket.co2.value();
            let population = bucket.population.value();
            out.push(ContinentAggregateRow {
                continent: continent.to_string(),
                year,
                co2,
                population,
                renewables_share_energy: bucket.renewables.value(),
                co2_per_capita: per_capita(co2, population),
                gdp,
                gdp_yoy,
            });
        }

        info!("continent aggregates: {} rows", out.len());
        out
    }
}
