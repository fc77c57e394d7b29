//! Temporal Viewer
//!
//! Browse the row history of SQL Server system-versioned temporal tables over
//! HTTP, or inspect one record from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tempview::cli;
use tempview_logging::{init_logging, LogConfig};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "tempview", version, about = "Temporal table history viewer")]
struct Cli {
    /// Enable verbose logging (debug to stderr and log file)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default ~/.tempview/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(cli::serve::ServeArgs),

    /// Run one request from a JSON file and print the response
    Inspect(cli::inspect::InspectArgs),

    /// Show resolved configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "tempview",
        verbose: cli.verbose,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: failed to initialize logging: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{:#}", err), "Command failed");
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Config(args) => cli::config::run(args, config_path),
        Commands::Serve(args) => runtime()?.block_on(cli::serve::run(args, config_path)),
        Commands::Inspect(args) => runtime()?.block_on(cli::inspect::run(args, config_path)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
