//! Global CO2 & Renewables - command line entry point
//!
//! Runs the processing pipeline and exposes the read-side helpers
//! (schema validation, import of replacement data, headline summaries).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use co2_renewables::country::select_resolver;
use co2_renewables::data::{
    merged_template_header, read_csv, validate_merged_schema, DataLoader,
};
use co2_renewables::stats::{EmitterRow, StatsCalculator};
use co2_renewables::storage::TableStore;
use co2_renewables::{ImportOutcome, Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "co2_renewables",
    disable_help_subcommand = true,
    about = "Global CO2 emissions and renewable energy trends, 1990-2023",
    long_about = "Clean and merge the OWID CO2 and energy datasets, derive per-capita and year-over-year metrics, and compute population-weighted global and continent aggregates."
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "JSON configuration file")]
    config: Option<PathBuf>,
    #[arg(
        long = "base-dir",
        global = true,
        value_name = "PATH",
        help = "Data directory override (raw downloads and processed tables)"
    )]
    base_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the sources (unless cached) and rebuild every processed table
    Run {
        #[arg(long, help = "Download the sources even when cached")]
        force_download: bool,
        #[arg(long, value_name = "CSV", requires = "energy", help = "Local emissions CSV")]
        co2: Option<PathBuf>,
        #[arg(long, value_name = "CSV", requires = "co2", help = "Local energy CSV")]
        energy: Option<PathBuf>,
    },
    /// Check that a CSV carries every merged-table column
    Validate { path: PathBuf },
    /// Replace the processed data with a merged CSV
    Import {
        merged: PathBuf,
        #[arg(long, value_name = "CSV", help = "Global aggregates; recomputed when omitted")]
        global: Option<PathBuf>,
    },
    /// Print the merged-table CSV header
    Template,
    /// Headline metrics and per-capita rankings
    Summary {
        #[arg(long, help = "Ranking year (defaults to the latest year)")]
        year: Option<i32>,
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long, help = "Emit JSON instead of text")]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &cli.base_dir {
        config.base_dir = dir.clone();
    }
    Ok(config)
}

fn print_ranking(title: &str, rows: &[EmitterRow]) {
    println!("{title}");
    for (i, row) in rows.iter().enumerate() {
        println!(
            "  {:>2}. {:<32} {:>8.2} t/person",
            i + 1,
            row.country_standard,
            row.co2_per_capita
        );
    }
}

fn no_data_prompt() {
    println!("No processed data found.");
    println!("Run `co2_renewables run` to fetch and build it, or supply your own with");
    println!("`co2_renewables import <merged.csv>` (see `co2_renewables template`).");
}

fn main() -> Result<ExitCode> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let store = TableStore::new(config.processed_dir());

    match cli.command {
        Command::Run {
            force_download,
            co2,
            energy,
        } => {
            let resolver = select_resolver(&config);
            let pipeline = Pipeline::new(&config, resolver.as_ref(), &store);
            let data = match (co2, energy) {
                (Some(co2), Some(energy)) => {
                    let co2 = read_csv(&co2).with_context(|| format!("reading {}", co2.display()))?;
                    let energy = read_csv(&energy)
                        .with_context(|| format!("reading {}", energy.display()))?;
                    pipeline.build_processed_dataset(&co2, &energy)?
                }
                _ => {
                    let loader = DataLoader::new(&config);
                    let raw = loader.load_raw_datasets(force_download)?;
                    pipeline.build_processed_dataset(&raw.co2, &raw.energy)?
                }
            };
            println!(
                "Processed {} merged rows, {} global years, {} continent-years into {}",
                data.merged.len(),
                data.global.len(),
                data.continent.len(),
                store.dir().display()
            );
        }
        Command::Validate { path } => {
            let df = read_csv(&path).with_context(|| format!("reading {}", path.display()))?;
            let report = validate_merged_schema(&df);
            if !report.is_valid() {
                println!("Missing required columns: {}", report.missing.join(", "));
                return Ok(ExitCode::FAILURE);
            }
            println!("{} has every required column", path.display());
        }
        Command::Import { merged, global } => {
            let merged_df =
                read_csv(&merged).with_context(|| format!("reading {}", merged.display()))?;
            let global_df = global
                .as_ref()
                .map(|p| read_csv(p).with_context(|| format!("reading {}", p.display())))
                .transpose()?;
            let resolver = select_resolver(&config);
            let pipeline = Pipeline::new(&config, resolver.as_ref(), &store);
            match pipeline.import_merged(&merged_df, global_df.as_ref())? {
                ImportOutcome::Rejected(report) => {
                    println!(
                        "Merged CSV is missing required columns: {}",
                        report.missing.join(", ")
                    );
                    return Ok(ExitCode::FAILURE);
                }
                ImportOutcome::Imported(data) => {
                    println!(
                        "Imported {} rows; {} global years available",
                        data.merged.len(),
                        data.global.len()
                    );
                }
            }
        }
        Command::Template => {
            println!("{}", merged_template_header());
        }
        Command::Summary { year, top, json } => {
            let resolver = select_resolver(&config);
            let pipeline = Pipeline::new(&config, resolver.as_ref(), &store);
            let Some(data) = pipeline.load_processed()? else {
                no_data_prompt();
                return Ok(ExitCode::SUCCESS);
            };
            let Some(mut insights) = StatsCalculator::insights(
                &data.merged,
                &data.global,
                config.paris_agreement_year,
                top,
            ) else {
                no_data_prompt();
                return Ok(ExitCode::SUCCESS);
            };
            if let Some(year) = year {
                let (top_rows, bottom_rows) =
                    StatsCalculator::top_bottom_by_co2_per_capita(&data.merged, year, top);
                insights.top_emitters = top_rows;
                insights.bottom_emitters = bottom_rows;
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                let fmt = |v: Option<f64>| v.map_or("n/a".to_string(), |x| format!("{x:.2}"));
                println!("Latest year: {}", insights.latest_year);
                println!(
                    "Global CO2 per capita (t/person): {}",
                    fmt(insights.co2_per_capita_global)
                );
                println!(
                    "Global renewable share (%): {}",
                    fmt(insights.renewables_share_global)
                );
                println!("Paris Agreement: {}", insights.paris_agreement_year);
                let ranking_year = year.unwrap_or(insights.latest_year);
                print_ranking(
                    &format!("Highest CO2 per capita, {ranking_year}"),
                    &insights.top_emitters,
                );
                print_ranking(
                    &format!("Lowest CO2 per capita, {ranking_year}"),
                    &insights.bottom_emitters,
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
