mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bqmirror",
    version,
    about = "Replicate a fixed catalogue of BigQuery tables and views into another dataset"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full replication pass
    Run {
        /// Path to replication config YAML file
        config: PathBuf,
        /// Print the planned operations without calling the warehouse
        #[arg(long)]
        dry_run: bool,
        /// Print the final report as JSON instead of the text summary
        #[arg(long)]
        json: bool,
        /// Region for copy jobs (overrides `location` in the config)
        #[arg(long)]
        location: Option<String>,
        /// Maximum operations in flight per phase (overrides `concurrency`)
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Validate config and resolve source/destination dataset regions
    Check {
        /// Path to replication config YAML file
        config: PathBuf,
    },
    /// List tables and views in the source dataset
    Discover {
        /// Path to replication config YAML file
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            dry_run,
            json,
            location,
            concurrency,
        } => {
            let options = commands::run::RunOptions {
                dry_run,
                json,
                overrides: commands::Overrides {
                    location,
                    concurrency,
                },
            };
            commands::run::execute(&config, &options).await
        }
        Commands::Check { config } => commands::check::execute(&config).await,
        Commands::Discover { config } => commands::discover::execute(&config).await,
    }
}
