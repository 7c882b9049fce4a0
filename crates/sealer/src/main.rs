//! `sealer` binary entry point.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`Config`] from environment variables.
//! 3. Initialise tracing.
//! 4. Run the command and report the outcome; the exit code identifies the
//!    error kind (see [`common::SealError::exit_code`]).

mod classify;
mod cli;
mod config;
mod convert;
mod crypto;
mod envelope;
mod json;
mod key;
mod pipeline;
mod telemetry;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use cli::Cli;
use config::Config;

/// Exit code for configuration or telemetry failures before any command runs.
const STARTUP_FAILURE: u8 = 1;

fn main() -> ExitCode {
    // -----------------------------------------------------------------------
    // 1. Arguments
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("[ERROR] configuration invalid: {e:#}");
            return ExitCode::from(STARTUP_FAILURE);
        }
    };

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init_telemetry(&cfg.log_level, cfg.log_format) {
        eprintln!("[ERROR] failed to initialise logging: {e:#}");
        return ExitCode::from(STARTUP_FAILURE);
    }
    info!(version = env!("CARGO_PKG_VERSION"), "sealer starting");

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    match cli::run(&cli, &cfg) {
        Ok(report) => {
            cli::print_success(&report, cli.json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "command failed");
            cli::print_failure(&e, cli.json);
            ExitCode::from(e.exit_code())
        }
    }
}
