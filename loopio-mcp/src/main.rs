//! `loopio-mcp` binary: MCP server for the Loopio API over stdio.
//!
//! Environment:
//! - `LOOPIO_CLIENT_ID`, `LOOPIO_CLIENT_SECRET` (required)
//! - `LOOPIO_API_BASE_URL` (optional)
//! - `RUST_LOG` (optional, default `info`)
//!
//! Variables may also come from a `.env.rfp` file in the working directory.

use loopio_mcp::app::{self, StartupError};
use loopio_mcp::clients::{ConfigError, LoopioConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Optional dotenv file read at startup.
const ENV_FILE: &str = ".env.rfp";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .init();
}

fn main() -> ExitCode {
    dotenvy::from_filename(ENV_FILE).ok();
    init_tracing();

    let config = match LoopioConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingEnvVar(_)) => {
            eprintln!("ERROR: LOOPIO_CLIENT_ID and LOOPIO_CLIENT_SECRET must be set in the environment or {}", ENV_FILE);
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("ERROR: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: failed to start the async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match app::block_on_detached(runtime, app::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ StartupError::Token(_)) => {
            eprintln!("ERROR: {}. Check the client credentials.", err);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("ERROR: {}", err);
            ExitCode::FAILURE
        }
    }
}
