//! Data Processor Module
//! Outer-joins the cleaned sources and derives per-row metrics.

use super::records::{
    is_aggregate_code, pct_change, per_capita, EmissionsRecord, EnergyRecord, MergedRow,
};
use crate::country::CountryResolver;
use std::collections::HashMap;
use tracing::{debug, info};

/// Join bookkeeping, logged after every merge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub matched_on_code: usize,
    pub repaired_on_name: usize,
    pub emissions_only: usize,
    pub energy_only: usize,
}

/// Handles the merge of the emissions and energy tables.
pub struct DataProcessor;

impl DataProcessor {
    /// Outer join on (iso_code, year), then derive the per-row metrics.
    ///
    /// Continents come from the cleaned records; the resolver is consulted
    /// only for rows that arrive without one. Output is sorted by
    /// (country_standard, year).
    pub fn merge_datasets(
        co2: &[EmissionsRecord],
        energy: &[EnergyRecord],
        resolver: &dyn CountryResolver,
    ) -> Vec<MergedRow> {
        let (rows, stats) = Self::outer_join(co2, energy);
        debug!("{:?}", stats);

        let mut rows: Vec<MergedRow> = rows
            .into_iter()
            .map(|mut row| {
                if row.continent.is_none() {
                    row.continent = row
                        .iso_code
                        .as_deref()
                        .and_then(|code| resolver.continent_of(code));
                }
                if row.co2_per_capita.is_none() {
                    row.co2_per_capita = per_capita(row.co2, row.population);
                }
                row.is_aggregate = is_aggregate_code(row.iso_code.as_deref());
                row
            })
            .collect();

        // Stable: ties keep join order, which keeps re-runs identical.
        rows.sort_by(|a, b| {
            a.country_standard
                .cmp(&b.country_standard)
                .then(a.year.cmp(&b.year))
        });
        Self::fill_year_over_year(&mut rows);

        info!(
            "merged table: {} rows ({} aggregates)",
            rows.len(),
            rows.iter().filter(|r| r.is_aggregate).count()
        );
        rows
    }

    /// Join both sources without any derived fields.
    ///
    /// Emissions rows left unmatched by code get a second chance on
    /// (country_standard, year): rows without a code may take any unclaimed
    /// energy row of that name, rows with a code only an unclaimed energy
    /// row without one. Energy rows that stay unclaimed become rows of
    /// their own.
    pub fn outer_join(
        co2: &[EmissionsRecord],
        energy: &[EnergyRecord],
    ) -> (Vec<MergedRow>, MergeStats) {
        let mut stats = MergeStats::default();
        let mut claimed = vec![false; energy.len()];

        let mut by_code: HashMap<(&str, i32), Vec<usize>> = HashMap::new();
        let mut by_name: HashMap<(&str, i32), Vec<usize>> = HashMap::new();
        let mut uncoded_by_name: HashMap<(&str, i32), Vec<usize>> = HashMap::new();
        for (idx, rec) in energy.iter().enumerate() {
            let name_key = (rec.country_standard.as_str(), rec.year);
            match rec.iso_code.as_deref() {
                Some(code) => by_code.entry((code, rec.year)).or_default().push(idx),
                None => uncoded_by_name.entry(name_key).or_default().push(idx),
            }
            by_name.entry(name_key).or_default().push(idx);
        }

        let mut matches: Vec<Option<usize>> = co2
            .iter()
            .map(|rec| {
                rec.iso_code
                    .as_deref()
                    .and_then(|code| claim(&by_code, (code, rec.year), &mut claimed))
            })
            .collect();
        stats.matched_on_code = matches.iter().flatten().count();

        for (rec, matched) in co2.iter().zip(matches.iter_mut()) {
            if matched.is_some() {
                continue;
            }
            let index = if rec.iso_code.is_none() {
                &by_name
            } else {
                &uncoded_by_name
            };
            *matched = claim(index, (rec.country_standard.as_str(), rec.year), &mut claimed);
            if matched.is_some() {
                stats.repaired_on_name += 1;
            }
        }

        let mut rows = Vec::with_capacity(co2.len() + energy.len());
        for (rec, matched) in co2.iter().zip(&matches) {
            let other = matched.map(|i| &energy[i]);
            if other.is_none() {
                stats.emissions_only += 1;
            }
            let name = if rec.country_standard.is_empty() {
                other.map(|e| e.country_standard.clone()).unwrap_or_default()
            } else {
                rec.country_standard.clone()
            };
            rows.push(MergedRow {
                country_standard: name,
                iso_code: rec
                    .iso_code
                    .clone()
                    .or_else(|| other.and_then(|e| e.iso_code.clone())),
                year: rec.year,
                continent: rec
                    .continent
                    .clone()
                    .or_else(|| other.and_then(|e| e.continent.clone())),
                co2: rec.co2,
                co2_per_capita: rec.co2_per_capita,
                gdp: rec.gdp,
                population: rec.population,
                renewables_share_energy: other.and_then(|e| e.renewables_share_energy),
                renewables_share_yoy: None,
                gdp_yoy: None,
                is_aggregate: false,
            });
        }

        for (rec, _) in energy.iter().zip(&claimed).filter(|&(_, &c)| !c) {
            stats.energy_only += 1;
            rows.push(MergedRow {
                country_standard: rec.country_standard.clone(),
                iso_code: rec.iso_code.clone(),
                year: rec.year,
                continent: rec.continent.clone(),
                co2: None,
                co2_per_capita: None,
                gdp: None,
                population: None,
                renewables_share_energy: rec.renewables_share_energy,
                renewables_share_yoy: None,
                gdp_yoy: None,
                is_aggregate: false,
            });
        }

        (rows, stats)
    }

    /// Percent change from the previous row of the same entity. Rows must
    /// already be sorted by (country_standard, year); a group's first row
    /// gets nulls.
    pub fn fill_year_over_year(rows: &mut [MergedRow]) {
        for i in 0..rows.len() {
            let (share_yoy, gdp_yoy) = match i.checked_sub(1).map(|p| &rows[p]) {
                Some(prev) if prev.country_standard == rows[i].country_standard => (
                    pct_change(prev.renewables_share_energy, rows[i].renewables_share_energy),
                    pct_change(prev.gdp, rows[i].gdp),
                ),
                _ => (None, None),
            };
            rows[i].renewables_share_yoy = share_yoy;
            rows[i].gdp_yoy = gdp_yoy;
        }
    }
}

/// First unclaimed energy row under `key`, marked as claimed.
fn claim<'a>(
    index: &HashMap<(&'a str, i32), Vec<usize>>,
    key: (&'a str, i32),
    claimed: &mut [bool],
) -> Option<usize> {
    let idx = index.get(&key)?.iter().copied().find(|&i| !claimed[i])?;
    claimed[idx] = true;
    Some(idx)
}
