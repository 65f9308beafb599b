#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the health access pipeline.
//!
//! Chains fetch -> vector processing -> zonal population -> accessibility
//! -> summary statistics, saving an artifact after each stage so a failed
//! run can be inspected (and resumed) from its last completed stage.
//!
//! Uses `indicatif-log-bridge` (via [`health_access_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use health_access_config::AppConfig;

#[derive(Parser)]
#[command(
    name = "health_access_cli",
    about = "Healthcare facility accessibility analysis"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline (default)
    Run {
        /// Override the configured output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Skip all downloads and use previously fetched inputs
        #[arg(long)]
        skip_download: bool,
        /// Load facilities from a local CSV (lat/lon columns) instead of
        /// the facility API
        #[arg(long)]
        facilities_csv: Option<PathBuf>,
        /// Population raster in ESRI ASCII grid format
        #[arg(long)]
        population: Option<PathBuf>,
    },
    /// Download input datasets without running the analysis
    Fetch,
    /// Print the effective configuration and exit
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = health_access_cli_utils::init_logger();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        None => {
            let options = pipeline::RunOptions::default();
            pipeline::run(&multi, &config, &options).await?;
        }
        Some(Commands::Run {
            output_dir,
            skip_download,
            facilities_csv,
            population,
        }) => {
            let options = pipeline::RunOptions {
                output_dir,
                skip_download,
                facilities_csv,
                population,
            };
            pipeline::run(&multi, &config, &options).await?;
        }
        Some(Commands::Fetch) => {
            pipeline::fetch_inputs(&config, None).await?;
        }
        Some(Commands::Config) => {
            println!("{}", health_access_config::to_toml_string(&config)?);
        }
    }

    Ok(())
}
