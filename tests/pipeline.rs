use std::path::{Path, PathBuf};

use polars::prelude::*;

use co2_renewables::country::{
    select_resolver, CountryResolver, PassthroughResolver, ReferenceResolver,
};
use co2_renewables::data::frame::merged_to_frame;
use co2_renewables::data::{read_csv_bytes, validate_merged_schema, MergedRow};
use co2_renewables::storage::{CsvCodec, TableCodec, TableStore};
use co2_renewables::{ImportOutcome, Pipeline, PipelineConfig, PipelineError};

const CO2_CSV: &str = "\
country,iso_code,year,co2,co2_per_capita,gdp,population,methane
United States of America,USA,1989,5000,,,,1
United States of America,USA,1990,5000,,8.0e12,250000000,1
United States of America,USA,1991,5100,20.5,8.4e12,253000000,1
Germany,DEU,1990,1000,,2.0e12,80000000,1
Germany,DEU,1991,980,,2.1e12,80500000,1
Kosovo,,1990,8,,,1800000,1
World,OWID_WRL,1990,22000,,,5300000000,1
Europe,OWID_EUR,1991,7000,,,720000000,1
";

const ENERGY_CSV: &str = "\
country,iso_code,year,renewables_share_energy
United States,USA,1990,10
United States,USA,1991,12
Germany,DEU,1990,2
Germany,DEU,1991,
Kosovo,,1990,15
Iceland,ISL,1990,60
World,OWID_WRL,1990,12.5
";

fn reference_table() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/country_reference.csv")
}

fn raw() -> (DataFrame, DataFrame) {
    (
        read_csv_bytes(CO2_CSV.as_bytes().to_vec()).unwrap(),
        read_csv_bytes(ENERGY_CSV.as_bytes().to_vec()).unwrap(),
    )
}

fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        reference_table: Some(reference_table()),
        ..PipelineConfig::with_base_dir(dir)
    }
}

fn find<'a>(rows: &'a [MergedRow], name: &str, year: i32) -> &'a MergedRow {
    rows.iter()
        .find(|r| r.country_standard == name && r.year == year)
        .unwrap_or_else(|| panic!("no row for {name} {year}"))
}

struct NoColumnar;

impl TableCodec for NoColumnar {
    fn extension(&self) -> &'static str {
        "parquet"
    }

    fn write(&self, _df: &mut DataFrame, _path: &Path) -> co2_renewables::Result<()> {
        Err(PipelineError::Persist {
            name: "parquet".to_string(),
            reason: "codec not compiled in".to_string(),
        })
    }

    fn read(&self, path: &Path) -> co2_renewables::Result<DataFrame> {
        Err(PipelineError::Persist {
            name: path.display().to_string(),
            reason: "codec not compiled in".to_string(),
        })
    }
}

#[test]
fn shipped_reference_table_loads() {
    let resolver = ReferenceResolver::from_csv(&reference_table()).unwrap();
    assert!(resolver.len() > 200);
    let us = resolver.resolve_name("United States of America").unwrap();
    assert_eq!(us.iso3, "USA");
    assert_eq!(us.continent.as_deref(), Some("America"));
    assert_eq!(resolver.resolve_name("Czechia").unwrap().iso3, "CZE");
    assert_eq!(resolver.resolve_name("Micronesia (country)").unwrap().iso3, "FSM");
    assert!(resolver.resolve_name("World").is_none());
    assert_eq!(resolver.continent_of("DEU").as_deref(), Some("Europe"));
}

#[test]
fn full_pipeline_merges_both_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let resolver = select_resolver(&config);
    assert_eq!(resolver.describe(), "reference table");
    let store = TableStore::new(config.processed_dir());
    let (co2, energy) = raw();

    let data = Pipeline::new(&config, resolver.as_ref(), &store)
        .build_processed_dataset(&co2, &energy)
        .unwrap();
    let merged = &data.merged;

    // 1989 is outside the window.
    assert!(merged.iter().all(|r| r.year >= 1990));

    let us90 = find(merged, "United States", 1990);
    assert_eq!(us90.iso_code.as_deref(), Some("USA"));
    assert_eq!(us90.continent.as_deref(), Some("America"));
    assert_eq!(us90.co2, Some(5000.0));
    assert_eq!(us90.gdp, Some(8.0e12));
    assert_eq!(us90.population, Some(250_000_000.0));
    assert_eq!(us90.renewables_share_energy, Some(10.0));
    assert_eq!(us90.co2_per_capita, Some(20.0));
    assert_eq!(us90.renewables_share_yoy, None);
    assert_eq!(us90.gdp_yoy, None);

    let us91 = find(merged, "United States", 1991);
    assert_eq!(us91.co2_per_capita, Some(20.5));
    assert_eq!(us91.renewables_share_yoy, Some(20.0));
    assert!((us91.gdp_yoy.unwrap() - 5.0).abs() < 1e-9);

    let kosovo = find(merged, "Kosovo", 1990);
    assert_eq!(kosovo.iso_code.as_deref(), Some("XKX"));
    assert_eq!(kosovo.renewables_share_energy, Some(15.0));

    let iceland = find(merged, "Iceland", 1990);
    assert_eq!(iceland.co2, None);
    assert_eq!(iceland.renewables_share_energy, Some(60.0));

    assert!(find(merged, "World", 1990).is_aggregate);
    assert!(find(merged, "Europe", 1991).is_aggregate);
    assert!(!find(merged, "Germany", 1991).is_aggregate);

    // Rows are ordered by (country_standard, year).
    let keys: Vec<(&str, i32)> = merged
        .iter()
        .map(|r| (r.country_standard.as_str(), r.year))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let g90 = data.global.iter().find(|g| g.year == 1990).unwrap();
    assert_eq!(g90.co2_global, Some(5000.0 + 1000.0 + 8.0));
    assert_eq!(
        g90.population_global,
        Some(250_000_000.0 + 80_000_000.0 + 1_800_000.0)
    );
    let expected_share = (10.0 * 250_000_000.0 + 2.0 * 80_000_000.0 + 15.0 * 1_800_000.0)
        / (250_000_000.0 + 80_000_000.0 + 1_800_000.0);
    assert!((g90.renewables_share_global.unwrap() - expected_share).abs() < 1e-9);

    assert!(store.exists("merged"));
    assert!(store.exists("global_aggregates"));
    assert!(store.exists("continent_aggregates"));
}

#[test]
fn pipeline_survives_missing_reference_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        reference_table: Some(dir.path().join("absent.csv")),
        ..PipelineConfig::with_base_dir(dir.path())
    };
    let resolver = select_resolver(&config);
    let store = TableStore::new(config.processed_dir());
    let (co2, energy) = raw();

    let data = Pipeline::new(&config, resolver.as_ref(), &store)
        .process(&co2, &energy)
        .unwrap();
    let us = find(&data.merged, "United States of America", 1990);
    assert_eq!(us.renewables_share_energy, Some(10.0));
    assert!(data.merged.iter().all(|r| r.continent.is_none()));
    assert!(data.continent.is_empty());
    assert_eq!(find(&data.merged, "Kosovo", 1990).iso_code, None);
}

#[test]
fn reruns_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let resolver = select_resolver(&config);
    let store = TableStore::new(config.processed_dir());
    let pipeline = Pipeline::new(&config, resolver.as_ref(), &store);
    let (co2, energy) = raw();

    let first = pipeline.build_processed_dataset(&co2, &energy).unwrap();
    let second = pipeline.build_processed_dataset(&co2, &energy).unwrap();
    assert_eq!(first, second);
}

#[test]
fn columnar_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let resolver = select_resolver(&config);
    let store = TableStore::new(config.processed_dir());
    let pipeline = Pipeline::new(&config, resolver.as_ref(), &store);
    let (co2, energy) = raw();

    let built = pipeline.build_processed_dataset(&co2, &energy).unwrap();
    assert!(config.processed_dir().join("merged.parquet").exists());

    let loaded = pipeline.load_processed().unwrap().unwrap();
    assert_eq!(loaded.merged, built.merged);
    assert_eq!(loaded.global, built.global);

    let df = store.load("merged").unwrap().unwrap();
    assert_eq!(df.height(), built.merged.len());
    assert!(df.equals_missing(&merged_to_frame(&built.merged).unwrap()));
}

fn close(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => (x - y).abs() <= 1e-9 * x.abs().max(1.0),
        (None, None) => true,
        _ => false,
    }
}

#[test]
fn csv_fallback_round_trips_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let resolver = select_resolver(&config);
    let store = TableStore::with_codecs(
        config.processed_dir(),
        vec![Box::new(NoColumnar), Box::new(CsvCodec)],
    );
    let pipeline = Pipeline::new(&config, resolver.as_ref(), &store);
    let (co2, energy) = raw();

    let built = pipeline.build_processed_dataset(&co2, &energy).unwrap();
    assert!(config.processed_dir().join("merged.csv").exists());
    assert!(!config.processed_dir().join("merged.parquet").exists());

    let loaded = pipeline.load_processed().unwrap().unwrap();
    assert_eq!(loaded.merged.len(), built.merged.len());
    for (a, b) in loaded.merged.iter().zip(&built.merged) {
        assert_eq!(a.country_standard, b.country_standard);
        assert_eq!(a.iso_code, b.iso_code);
        assert_eq!(a.year, b.year);
        assert_eq!(a.continent, b.continent);
        assert_eq!(a.is_aggregate, b.is_aggregate);
        assert!(close(a.co2, b.co2));
        assert!(close(a.co2_per_capita, b.co2_per_capita));
        assert!(close(a.gdp, b.gdp));
        assert!(close(a.population, b.population));
        assert!(close(a.renewables_share_energy, b.renewables_share_energy));
        assert!(close(a.renewables_share_yoy, b.renewables_share_yoy));
        assert!(close(a.gdp_yoy, b.gdp_yoy));
    }
    assert_eq!(loaded.global.len(), built.global.len());

    let df = store.load("merged").unwrap().unwrap();
    let columns: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();
    assert_eq!(columns, MergedRow::COLUMNS.to_vec());
}

#[test]
fn nothing_processed_yet_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let store = TableStore::new(config.processed_dir());
    let pipeline = Pipeline::new(&config, &PassthroughResolver, &store);
    assert!(pipeline.load_processed().unwrap().is_none());
}

#[test]
fn schema_mismatch_in_a_source_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let store = TableStore::new(config.processed_dir());
    let pipeline = Pipeline::new(&config, &PassthroughResolver, &store);
    let (co2, energy) = raw();
    let energy = energy.drop("renewables_share_energy").unwrap();

    let err = pipeline.process(&co2, &energy).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SchemaMismatch { ref column, .. } if column == "renewables_share_energy"
    ));
    assert!(!store.exists("merged"));
}

#[test]
fn import_validates_then_recomputes_aggregates() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let store = TableStore::new(config.processed_dir());
    let resolver: &dyn CountryResolver = &PassthroughResolver;
    let pipeline = Pipeline::new(&config, resolver, &store);

    let (co2, energy) = raw();
    let built = pipeline.process(&co2, &energy).unwrap();
    let full = merged_to_frame(&built.merged).unwrap();

    let partial = full.drop("population").unwrap();
    assert_eq!(validate_merged_schema(&partial).missing, vec!["population".to_string()]);
    match pipeline.import_merged(&partial, None).unwrap() {
        ImportOutcome::Rejected(report) => assert_eq!(report.missing, vec!["population"]),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!store.exists("merged"));

    match pipeline.import_merged(&full, None).unwrap() {
        ImportOutcome::Imported(data) => {
            assert_eq!(data.merged, built.merged);
            assert_eq!(data.global, built.global);
        }
        other => panic!("expected import, got {other:?}"),
    }
    assert!(pipeline.load_processed().unwrap().is_some());
}

#[test]
fn energy_source_without_codes_joins_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_base_dir(dir.path());
    let store = TableStore::new(config.processed_dir());
    let pipeline = Pipeline::new(&config, &PassthroughResolver, &store);

    let co2 = read_csv_bytes(
        b"country,iso_code,year,co2,co2_per_capita,gdp,population\n\
          Chile,CHL,2000,50,,100,15000000\n\
          Chile,CHL,2001,55,,110,15200000\n"
            .to_vec(),
    )
    .unwrap();
    let energy = read_csv_bytes(
        b"country,year,renewables_share_energy\n\
          Chile,2000,25\n\
          Chile,2001,30\n"
            .to_vec(),
    )
    .unwrap();

    let data = pipeline.process(&co2, &energy).unwrap();
    assert_eq!(data.merged.len(), 2);
    let chile = find(&data.merged, "Chile", 2001);
    assert_eq!(chile.iso_code.as_deref(), Some("CHL"));
    assert_eq!(chile.co2, Some(55.0));
    assert_eq!(chile.renewables_share_energy, Some(30.0));
    assert!((chile.gdp_yoy.unwrap() - 10.0).abs() < 1e-9);
    assert!((chile.renewables_share_yoy.unwrap() - 20.0).abs() < 1e-9);
}
