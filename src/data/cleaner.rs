//! Dataset Cleaner Module
//! Column selection, year coercion and filtering, and country standardization
//! for the two raw sources.

use super::frame::{f64_values, has_column, require_column, string_values, year_values};
use super::records::{EmissionsRecord, EnergyRecord};
use crate::config::YearRange;
use crate::country::{standardize_one, CountryResolver};
use crate::error::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Identity columns shared by both sources, one entry per kept raw row.
struct Identity {
    row: usize,
    country_standard: String,
    iso_code: Option<String>,
    continent: Option<String>,
    year: i32,
}

/// Rows with a year inside `years`, standardized. `iso_code` is optional in
/// the raw source; every other identity column is required.
fn clean_identities(
    df: &DataFrame,
    source_name: &str,
    years: YearRange,
    resolver: &dyn CountryResolver,
) -> Result<Vec<Identity>> {
    let countries = string_values(require_column(df, source_name, "country")?)?;
    let year_col = year_values(require_column(df, source_name, "year")?)?;
    let codes = if has_column(df, "iso_code") {
        string_values(df.column("iso_code")?)?
    } else {
        vec![None; df.height()]
    };

    let mut null_years = 0usize;
    let mut out = Vec::with_capacity(df.height());
    for (row, ((country, code), year)) in countries.into_iter().zip(codes).zip(year_col).enumerate() {
        let Some(year) = year else {
            null_years += 1;
            continue;
        };
        if !years.contains(year) {
            continue;
        }
        // Without a name, the code is the only identity left.
        let Some(raw_name) = country.or_else(|| code.clone()) else {
            continue;
        };
        let standard = standardize_one(&raw_name, code.as_deref(), resolver);
        out.push(Identity {
            row,
            country_standard: standard.country_standard,
            iso_code: standard.iso_code,
            continent: standard.continent,
            year,
        });
    }

    debug!(
        "{}: dropped {} rows with null year, kept {} of {} in {}-{}",
        source_name,
        null_years,
        out.len(),
        df.height(),
        years.start,
        years.end
    );
    Ok(out)
}

/// Clean the emissions source.
pub fn clean_co2_data(
    df: &DataFrame,
    years: YearRange,
    resolver: &dyn CountryResolver,
) -> Result<Vec<EmissionsRecord>> {
    const SOURCE: &str = "emissions";
    let co2 = f64_values(require_column(df, SOURCE, "co2")?)?;
    let co2_per_capita = f64_values(require_column(df, SOURCE, "co2_per_capita")?)?;
    let gdp = f64_values(require_column(df, SOURCE, "gdp")?)?;
    let population = f64_values(require_column(df, SOURCE, "population")?)?;

    let records: Vec<EmissionsRecord> = clean_identities(df, SOURCE, years, resolver)?
        .into_iter()
        .map(|id| EmissionsRecord {
            co2: co2[id.row],
            co2_per_capita: co2_per_capita[id.row],
            gdp: gdp[id.row],
            population: population[id.row],
            country_standard: id.country_standard,
            iso_code: id.iso_code,
            continent: id.continent,
            year: id.year,
        })
        .collect();

    info!("cleaned emissions source: {} rows", records.len());
    Ok(records)
}

/// Clean the energy source.
pub fn clean_energy_data(
    df: &DataFrame,
    years: YearRange,
    resolver: &dyn CountryResolver,
) -> Result<Vec<EnergyRecord>> {
    const SOURCE: &str = "energy";
    let share = f64_values(require_column(df, SOURCE, "renewables_share_energy")?)?;

    let records: Vec<EnergyRecord> = clean_identities(df, SOURCE, years, resolver)?
        .into_iter()
        .map(|id| EnergyRecord {
            renewables_share_energy: share[id.row],
            country_standard: id.country_standard,
            iso_code: id.iso_code,
            continent: id.continent,
            year: id.year,
        })
        .collect();

    info!("cleaned energy source: {} rows", records.len());
    Ok(records)
}
