//! Session bootstrap

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use chessqa_e2e::bootstrap;
use chessqa_e2e::E2eConfig;

use crate::output::print_success;

#[derive(Args)]
pub struct SetupAuthArgs {
    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Where to write the snapshot
    #[arg(long)]
    pub storage_state: Option<std::path::PathBuf>,
}

pub async fn execute(args: SetupAuthArgs, mut config: E2eConfig) -> Result<ExitCode> {
    if let Some(path) = args.storage_state {
        config.storage_state = path;
    }

    bootstrap::setup_auth(&config, !args.headless)
        .await
        .context("Login did not complete; no session snapshot was written")?;

    print_success(&format!(
        "Session for {} saved to {}",
        config.username,
        config.storage_state.display()
    ));
    Ok(ExitCode::SUCCESS)
}
