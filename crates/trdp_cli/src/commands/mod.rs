//! CLI command definitions.
//!
//! Every command except `serve` talks to a running automation API; `serve`
//! hosts that API in-process.

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::client::DEFAULT_API_URL;

pub mod catalog;
pub mod control;
pub mod run;
pub mod serve;
pub mod status;
pub mod validate;

/// trdp-sim - TRDP simulator automation client
#[derive(Parser, Debug)]
#[command(name = "trdp-sim")]
#[command(version, about = "TRDP simulator automation client")]
#[command(long_about = r#"
Drive simulation runs of the TRDP simulator through its automation API.

COMMANDS:
  run        → Start a run of a scenario
  pause      → Pause an active run
  resume     → Resume a paused run
  fail       → Force an active run to fail
  fault      → Inject a fault telegram into an active run
  status     → Inspect a run
  scenarios  → List catalog scenarios
  devices    → List catalog device profiles
  validate   → Validate a scenario file
  serve      → Host the automation API

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - API error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Automation API endpoint
    #[arg(long, global = true, env = "TRDP_SIM_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a simulation run
    Run(run::RunArgs),

    /// Pause an active run
    Pause(control::RunIdArgs),

    /// Resume a paused run
    Resume(control::RunIdArgs),

    /// Force an active run to fail
    Fail(control::FailArgs),

    /// Inject a fault into an active run
    Fault(control::FaultArgs),

    /// Inspect run status
    Status(status::StatusArgs),

    /// List scenarios in the catalog
    Scenarios,

    /// List device profiles in the catalog
    Devices,

    /// Validate a scenario file
    Validate(validate::ValidateArgs),

    /// Serve the automation API
    Serve(serve::ServeArgs),
}

/// Failures detected by the CLI itself, before or after talking to the API.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid message specification: {0}")]
    InvalidMessage(String),

    #[error("Scenario validation failed with {0} error(s)")]
    ValidationFailed(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "trdp-sim",
            "--api-url",
            "http://example",
            "run",
            "demo",
            "--message",
            "1:data",
            "--message",
            "2:more",
            "--realtime",
            "--step-delay",
            "0.5",
        ])
        .unwrap();

        assert_eq!(cli.api_url, "http://example");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.scenario, "demo");
                assert_eq!(args.messages, vec!["1:data", "2:more"]);
                assert!(args.realtime);
                assert_eq!(args.step_delay, 0.5);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_api_url_is_global() {
        let cli = Cli::try_parse_from(["trdp-sim", "status", "abc", "--api-url", "http://x:1"])
            .unwrap();
        assert_eq!(cli.api_url, "http://x:1");
    }

    #[test]
    fn test_pause_requires_run_id() {
        assert!(Cli::try_parse_from(["trdp-sim", "pause"]).is_err());
    }
}
