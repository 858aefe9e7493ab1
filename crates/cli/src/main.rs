//! chessqa CLI - Main Entry Point
//!
//! Bootstraps the login session, lists the scenario catalogue and runs it
//! against the live site.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use chessqa_e2e::E2eConfig;

mod commands;
mod output;

use commands::{list, setup_auth, test};

/// chessqa - browser test suite for chess.com
#[derive(Parser)]
#[command(name = "chessqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (TOML); defaults to ./chessqa.toml when present
    #[arg(long, env = "CHESSQA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in once and save the session snapshot
    SetupAuth(setup_auth::SetupAuthArgs),

    /// Run scenarios
    Test(test::TestArgs),

    /// List scenarios without running them
    List(list::ListArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let load_config = || {
        E2eConfig::load(cli.config.as_deref()).context("Failed to load configuration")
    };

    match cli.command {
        Commands::SetupAuth(args) => setup_auth::execute(args, load_config()?).await,
        Commands::Test(args) => test::execute(args, load_config()?, cli.format).await,
        Commands::List(args) => list::execute(args, cli.format),
        Commands::Version => {
            println!("chessqa v{}", env!("CARGO_PKG_VERSION"));
            println!("Playwright-driven browser tests for chess.com");
            Ok(ExitCode::SUCCESS)
        }
    }
}
