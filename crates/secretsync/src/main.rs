//! secretsync CLI - Kubernetes secret backup and restore
//!
//! This is the main entry point for the secretsync command-line interface.

mod cli;
mod commands;
mod output;
mod settings;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use commands::sync::Render;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Ok(match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            });
        }
    };

    init_tracing(cli.verbose, cli.quiet);

    let render = Render {
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose > 0,
    };
    let config = cli.config.as_deref();

    let code = match cli.command {
        Commands::Backup(args) => commands::sync::backup(args, config, render).await,
        Commands::Restore(args) => commands::sync::restore(args, config, render).await,
        Commands::Run(args) => commands::sync::run(args, config, render).await,
    }?;

    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

/// Initialize tracing with appropriate verbosity
///
/// `RUST_LOG`, when set, overrides the flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("info"),
                1 => EnvFilter::new("debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
