//! trdp-sim CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: API error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod client;
mod commands;

use client::{ApiClient, ClientError};
use commands::{Cli, CommandError, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const API_ERROR: u8 = 4;
}

fn init_logging(verbose: bool, json: bool) {
    let default_filter = if verbose { "trdp=debug,info" } else { "trdp=info,warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout carries command output; logs go to stderr.
    let log_result = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr)))
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    match run(cli).await {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let api_url = cli.api_url;
    let client = || ApiClient::new(api_url.as_str());

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &client()?).await,
        Commands::Pause(args) => commands::control::pause(args, &client()?).await,
        Commands::Resume(args) => commands::control::resume(args, &client()?).await,
        Commands::Fail(args) => commands::control::fail(args, &client()?).await,
        Commands::Fault(args) => commands::control::fault(args, &client()?).await,
        Commands::Status(args) => commands::status::execute(args, &client()?).await,
        Commands::Scenarios => commands::catalog::scenarios(&client()?).await,
        Commands::Devices => commands::catalog::devices(&client()?).await,
        Commands::Validate(args) => commands::validate::execute(args, &client()?).await,
        Commands::Serve(args) => commands::serve::execute(args).await,
    }
}

/// Map an error to its exit code by the first typed cause in its chain.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<CommandError>() {
            return match err {
                CommandError::InvalidMessage(_) => ExitCodes::INVALID_ARGS,
                CommandError::ValidationFailed(_) => ExitCodes::VALIDATION_FAILURE,
            };
        }
        if let Some(err) = cause.downcast_ref::<ClientError>() {
            return match err {
                ClientError::Setup(_) => ExitCodes::GENERAL_ERROR,
                _ => ExitCodes::API_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_categorize_typed_errors() {
        let invalid = anyhow::Error::from(CommandError::InvalidMessage("x".into()));
        assert_eq!(categorize_error(&invalid), ExitCodes::INVALID_ARGS);

        let failed = anyhow::Error::from(CommandError::ValidationFailed(2));
        assert_eq!(categorize_error(&failed), ExitCodes::VALIDATION_FAILURE);
    }

    #[test]
    fn test_categorize_through_context() {
        let api: anyhow::Result<()> = Err(ClientError::Status {
            status: 404,
            message: "Unknown run id: x".into(),
        })
        .context("Failed to fetch status of run x");
        assert_eq!(categorize_error(&api.unwrap_err()), ExitCodes::API_ERROR);
    }

    #[test]
    fn test_untyped_errors_are_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
