//! aclwarden CLI
//!
//! Command-line interface for auditing and enforcing ACL policy.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use std::io::Write;
use std::process::ExitCode;

use aclwarden_cli::cli::Cli;
use aclwarden_cli::commands;
use anyhow::Result;
use clap::Parser;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!(command = ?cli.command, "Starting aclwarden");

    let output = commands::run(cli)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.text.as_bytes())?;
    stdout.flush()?;

    Ok(if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
