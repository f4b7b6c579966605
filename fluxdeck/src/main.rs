//! Fluxdeck - session-aware image generation on top of `mflux-generate`.
//!
//! Each invocation produces one run of image variations inside a
//! timestamped session directory. Settings not given on the command line
//! are inherited from the previous run in the session, and named styles
//! are appended to the prompt.

mod brainstorm;
mod cli;
mod config;
mod error;
mod gallery;
mod generate;
mod logging;
mod models;
mod persist;
mod process;
mod server;
mod session;
mod settings;
mod styles;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};
use config::Config;
use error::FluxError;

/// Exit code for requests rejected before anything was written.
const EXIT_CONFIGURATION: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            match e.downcast_ref::<FluxError>() {
                Some(flux) if flux.is_configuration() => ExitCode::from(EXIT_CONFIGURATION),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?.with_output_dir(cli.output_dir.clone());
    tracing::debug!(?config, "loaded configuration");
    execute(cli, config).await
}
