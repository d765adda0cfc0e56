#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for household trend feature extraction.
//!
//! Uses `indicatif-log-bridge` (via [`household_trends_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the extraction progress bar never fight for the terminal.

mod config;
mod inspect;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use household_trends_cli_utils::{IndicatifProgress, MultiProgress};
use household_trends_table::{read_observations_path, write_feature_table_path};
use household_trends_trend::{CancellationFlag, ExtractOptions, extract_parallel};
use household_trends_trend_models::EntityKey;

use crate::config::{Overrides, PipelineConfig};

#[derive(Parser)]
#[command(
    name = "household_trends",
    about = "Polynomial trend features from yearly county household counts"
)]
struct Cli {
    /// TOML configuration file (defaults to the embedded configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Settings that override the configuration file.
#[derive(Args)]
struct OverrideArgs {
    /// First year of the analysis range
    #[arg(long, global = true)]
    start_year: Option<i32>,
    /// Last year of the analysis range
    #[arg(long, global = true)]
    end_year: Option<i32>,
    /// Minimum fitness for a polynomial degree to be selected
    #[arg(long, global = true)]
    threshold: Option<f64>,
    /// Highest polynomial degree to try
    #[arg(long, global = true)]
    max_degree: Option<usize>,
    /// Year whose raw value is reported (default: second-to-last year)
    #[arg(long, global = true)]
    reference_year: Option<i32>,
    /// Number of extraction workers (default: available parallelism)
    #[arg(long, global = true)]
    workers: Option<usize>,
}

impl From<&OverrideArgs> for Overrides {
    fn from(args: &OverrideArgs) -> Self {
        Self {
            start_year: args.start_year,
            end_year: args.end_year,
            threshold: args.threshold,
            max_degree: args.max_degree,
            reference_year: args.reference_year,
            workers: args.workers,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract trend features for every entity in a yearly table
    Extract {
        /// Input CSV, one row per entity per year
        #[arg(long)]
        input: PathBuf,
        /// Output CSV, one row per entity
        #[arg(long)]
        output: PathBuf,
    },
    /// Show every candidate fit and the selected trend for one entity
    Inspect {
        /// Input CSV, one row per entity per year
        #[arg(long)]
        input: PathBuf,
        /// Entity display name (e.g., "Autauga County, Alabama")
        #[arg(long)]
        name: String,
        /// State code (e.g., "01")
        #[arg(long)]
        state: String,
        /// County code (e.g., "001")
        #[arg(long)]
        county: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = household_trends_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = PipelineConfig::load(cli.config.as_deref())?
        .with_overrides(Overrides::from(&cli.overrides))?;

    match cli.command {
        Commands::Extract { input, output } => {
            run_extract(&multi, config, &input, &output).await?;
        }
        Commands::Inspect {
            input,
            name,
            state,
            county,
            json,
        } => {
            let set =
                read_observations_path(&input, &config.layout, &config.extract.indicators)?;
            let key = EntityKey::new(name, state, county);
            let report = inspect::inspect(&set, &key, &config.extract)
                .ok_or_else(|| format!("Entity not found: {key}"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn run_extract(
    multi: &MultiProgress,
    config: PipelineConfig,
    input: &Path,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let set = read_observations_path(input, &config.layout, &config.extract.indicators)?;

    let cancellation = CancellationFlag::new();
    let ctrl_c = {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted; finishing entities in progress");
                cancellation.cancel();
            }
        })
    };

    let progress = IndicatifProgress::entities_bar(multi, "Extracting trend features");
    let options = ExtractOptions::from_config(&config.extract)
        .with_progress(progress)
        .with_cancellation(cancellation);

    let result = extract_parallel(Arc::new(set), Arc::new(config.extract), options).await;
    ctrl_c.abort();
    let extraction = result?;

    write_feature_table_path(output, &extraction.table, &config.layout)?;

    log::info!(
        "Extraction complete: {} entities in {:.1}s",
        extraction.table.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
