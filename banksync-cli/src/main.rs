//! banksync CLI - bank transactions into your spreadsheet

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{rules, status, sync};

/// banksync - reconcile bank transactions into a spreadsheet
#[derive(Parser)]
#[command(name = "banksync", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent transactions and reconcile them into the store
    Sync {
        /// Preview changes without writing rows or advancing the sync time
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show last sync time, next window and configuration summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect categorisation rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync { dry_run, json } => sync::run(dry_run, json),
        Commands::Status { json } => status::run(json),
        Commands::Rules { command } => rules::run(command),
    }
}
