//! DataFrame boundary: typed column extraction and row/frame conversion.
//!
//! Extraction casts non-strictly, so unparsable cells come back as nulls
//! instead of failing the read.

use super::records::{
    is_aggregate_code, ContinentAggregateRow, GlobalAggregateRow, MergedRow,
};
use crate::error::{PipelineError, Result};
use polars::prelude::*;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Column lookup that reports a schema mismatch naming the source.
pub fn require_column<'a>(df: &'a DataFrame, source_name: &str, name: &str) -> Result<&'a Column> {
    df.column(name).map_err(|_| PipelineError::SchemaMismatch {
        source_name: source_name.to_string(),
        column: name.to_string(),
    })
}

pub fn f64_values(col: &Column) -> Result<Vec<Option<f64>>> {
    let cast = col.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

/// Trimmed strings; blank cells are null.
pub fn string_values(col: &Column) -> Result<Vec<Option<String>>> {
    let cast = col.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Years coerced to integers; fractional input is truncated.
pub fn year_values(col: &Column) -> Result<Vec<Option<i32>>> {
    Ok(f64_values(col)?
        .into_iter()
        .map(|v| v.map(|y| y.trunc() as i32))
        .collect())
}

pub fn bool_values(col: &Column) -> Result<Vec<Option<bool>>> {
    if col.dtype() == &DataType::Boolean {
        return Ok(col.bool()?.into_iter().collect());
    }
    Ok(string_values(col)?
        .into_iter()
        .map(|v| {
            v.and_then(|s| match s.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" => Some(true),
                "false" | "f" | "no" => Some(false),
                other => other.parse::<f64>().ok().map(|n| n != 0.0),
            })
        })
        .collect())
}

pub fn merged_to_frame(rows: &[MergedRow]) -> Result<DataFrame> {
    let strings = |f: fn(&MergedRow) -> Option<String>| -> Vec<Option<String>> {
        rows.iter().map(f).collect()
    };
    let floats = |f: fn(&MergedRow) -> Option<f64>| -> Vec<Option<f64>> {
        rows.iter().map(f).collect()
    };

    let df = DataFrame::new(vec![
        Column::new(
            "country_standard".into(),
            rows.iter().map(|r| r.country_standard.clone()).collect::<Vec<_>>(),
        ),
        Column::new("iso_code".into(), strings(|r| r.iso_code.clone())),
        Column::new("year".into(), rows.iter().map(|r| r.year).collect::<Vec<_>>()),
        Column::new("continent".into(), strings(|r| r.continent.clone())),
        Column::new("co2".into(), floats(|r| r.co2)),
        Column::new("co2_per_capita".into(), floats(|r| r.co2_per_capita)),
        Column::new("gdp".into(), floats(|r| r.gdp)),
        Column::new("population".into(), floats(|r| r.population)),
        Column::new(
            "renewables_share_energy".into(),
            floats(|r| r.renewables_share_energy),
        ),
        Column::new("renewables_share_yoy".into(), floats(|r| r.renewables_share_yoy)),
        Column::new("gdp_yoy".into(), floats(|r| r.gdp_yoy)),
        Column::new(
            "is_aggregate".into(),
            rows.iter().map(|r| r.is_aggregate).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

/// Rebuild merged rows from a frame carrying every merged column.
///
/// Rows without a year are dropped. A null `is_aggregate` is re-derived
/// from the ISO code.
pub fn merged_from_frame(df: &DataFrame) -> Result<Vec<MergedRow>> {
    const SOURCE: &str = "merged";
    let col = |name: &str| require_column(df, SOURCE, name);

    let names = string_values(col("country_standard")?)?;
    let codes = string_values(col("iso_code")?)?;
    let years = year_values(col("year")?)?;
    let continents = string_values(col("continent")?)?;
    let co2 = f64_values(col("co2")?)?;
    let co2_pc = f64_values(col("co2_per_capita")?)?;
    let gdp = f64_values(col("gdp")?)?;
    let population = f64_values(col("population")?)?;
    let share = f64_values(col("renewables_share_energy")?)?;
    let share_yoy = f64_values(col("renewables_share_yoy")?)?;
    let gdp_yoy = f64_values(col("gdp_yoy")?)?;
    let aggregate = bool_values(col("is_aggregate")?)?;

    let rows = (0..df.height())
        .filter_map(|i| {
            let year = years[i]?;
            let iso_code = codes[i].clone();
            Some(MergedRow {
                country_standard: names[i].clone().unwrap_or_default(),
                is_aggregate: aggregate[i].unwrap_or_else(|| is_aggregate_code(iso_code.as_deref())),
                iso_code,
                year,
                continent: continents[i].clone(),
                co2: co2[i],
                co2_per_capita: co2_pc[i],
                gdp: gdp[i],
                population: population[i],
                renewables_share_energy: share[i],
                renewables_share_yoy: share_yoy[i],
                gdp_yoy: gdp_yoy[i],
            })
        })
        .collect();
    Ok(rows)
}

pub fn global_to_frame(rows: &[GlobalAggregateRow]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new("year".into(), rows.iter().map(|r| r.year).collect::<Vec<_>>()),
        Column::new(
            "co2_global".into(),
            rows.iter().map(|r| r.co2_global).collect::<Vec<_>>(),
        ),
        Column::new(
            "population_global".into(),
            rows.iter().map(|r| r.population_global).collect::<Vec<_>>(),
        ),
        Column::new(
            "renewables_share_global".into(),
            rows.iter().map(|r| r.renewables_share_global).collect::<Vec<_>>(),
        ),
        Column::new(
            "co2_per_capita_global".into(),
            rows.iter().map(|r| r.co2_per_capita_global).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

pub fn global_from_frame(df: &DataFrame) -> Result<Vec<GlobalAggregateRow>> {
    const SOURCE: &str = "global_aggregates";
    let col = |name: &str| require_column(df, SOURCE, name);

    let years = year_values(col("year")?)?;
    let co2 = f64_values(col("co2_global")?)?;
    let population = f64_values(col("population_global")?)?;
    let share = f64_values(col("renewables_share_global")?)?;
    let per_capita = f64_values(col("co2_per_capita_global")?)?;

    Ok((0..df.height())
        .filter_map(|i| {
            Some(GlobalAggregateRow {
                year: years[i]?,
                co2_global: co2[i],
                population_global: population[i],
                renewables_share_global: share[i],
                co2_per_capita_global: per_capita[i],
            })
        })
        .collect())
}

pub fn continent_to_frame(rows: &[ContinentAggregateRow]) -> Result<DataFrame> {
    let floats = |f: fn(&ContinentAggregateRow) -> Option<f64>| -> Vec<Option<f64>> {
        rows.iter().map(f).collect()
    };

    let df = DataFrame::new(vec![
        Column::new(
            "continent".into(),
            rows.iter().map(|r| r.continent.clone()).collect::<Vec<_>>(),
        ),
        Column::new("year".into(), rows.iter().map(|r| r.year).collect::<Vec<_>>()),
        Column::new("co2".into(), floats(|r| r.co2)),
        Column::new("population".into(), floats(|r| r.population)),
        Column::new(
            "renewables_share_energy".into(),
            floats(|r| r.renewables_share_energy),
        ),
        Column::new("co2_per_capita".into(), floats(|r| r.co2_per_capita)),
        Column::new("gdp".into(), floats(|r| r.gdp)),
        Column::new("gdp_yoy".into(), floats(|r| r.gdp_yoy)),
    ])?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, iso: Option<&str>, year: i32) -> MergedRow {
        MergedRow {
            country_standard: name.to_string(),
            iso_code: iso.map(str::to_string),
            year,
            continent: None,
            co2: Some(1.5),
            co2_per_capita: None,
            gdp: Some(2.0e12),
            population: Some(3.0e6),
            renewables_share_energy: None,
            renewables_share_yoy: None,
            gdp_yoy: Some(-4.25),
            is_aggregate: is_aggregate_code(iso),
        }
    }

    #[test]
    fn merged_frame_has_every_column_in_order() {
        let df = merged_to_frame(&[row("Chile", Some("CHL"), 2000)]).unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, MergedRow::COLUMNS.to_vec());
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn merged_rows_survive_the_frame_boundary() {
        let rows = vec![
            row("Chile", Some("CHL"), 2000),
            row("World", Some("OWID_WRL"), 2000),
            row("Kosovo", None, 2001),
        ];
        let back = merged_from_frame(&merged_to_frame(&rows).unwrap()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn unparsable_numbers_become_null() {
        let col = Column::new("co2".into(), ["1.5", "n/a", "", "7"]);
        assert_eq!(f64_values(&col).unwrap(), vec![Some(1.5), None, None, Some(7.0)]);
    }

    #[test]
    fn years_are_truncated_to_integers() {
        let col = Column::new("year".into(), [Some(1990.0), None, Some(2001.0)]);
        assert_eq!(year_values(&col).unwrap(), vec![Some(1990), None, Some(2001)]);
    }

    #[test]
    fn textual_booleans_parse() {
        let col = Column::new("is_aggregate".into(), ["true", "False", "1", "maybe"]);
        assert_eq!(
            bool_values(&col).unwrap(),
            vec![Some(true), Some(false), Some(true), None]
        );
    }

    #[test]
    fn missing_column_is_a_schema_mismatch() {
        let df = DataFrame::new(vec![Column::new("year".into(), [2000i32])]).unwrap();
        let err = require_column(&df, "emissions", "co2").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SchemaMismatch { ref column, .. } if column == "co2"
        ));
    }
}
