//! Binary crate for the `weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Human-friendly output formatting and exit status

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod logging;
mod render;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env file is fine; variables already set in the environment win.
    dotenvy::dotenv().ok();

    let cmd = cli::Cli::parse();
    logging::init(cmd.verbose);
    cmd.run().await
}
