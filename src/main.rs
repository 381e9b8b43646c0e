//! CLI entry point for the cash-flow rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use cashflow_rebalancer::config::Config;
use cashflow_rebalancer::error::{Error, Result};
use cashflow_rebalancer::run::{self, RunOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Allocates a cash deposit into whole-unit purchases toward a target allocation")]
#[command(version)]
struct Cli {
    /// Path to config.toml (falls back to ./config.toml, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch quotes, compute the purchase plan, and write the report
    Run {
        /// Input document path (overrides config)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Report path (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Compute and print without writing the report
        #[arg(long)]
        dry_run: bool,
    },

    /// Check an input document without fetching quotes
    Validate {
        /// Input document path (overrides config)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run {
            input,
            output,
            dry_run,
        } => {
            let mut config = config;
            if let Some(path) = input {
                config.files.input = path;
            }
            if let Some(path) = output {
                config.files.output = path;
            }
            let opts = RunOptions { dry_run };
            run::run(&config, &opts).map(|_| ())
        }
        Command::Validate { input } => {
            let path = input.unwrap_or(config.files.input);
            run::validate_input(&path).map(|normalized| {
                println!(
                    "{} OK: {} assets ({}), deposit {:.2}",
                    path.display(),
                    normalized.allocation_bps.len(),
                    normalized.priced_symbols().join(", "),
                    normalized.deposit_amount,
                );
            })
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        match e {
            Error::Validation(_) | Error::InputParse(_) => process::exit(2),
            _ => process::exit(1),
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
}
