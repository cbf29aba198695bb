//! Run command - Start a simulation run.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use trdp_api::{MessageSpec, RunOptionsSpec, StartRunRequest};

use super::CommandError;
use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario identifier to execute
    pub scenario: String,

    /// Process data message to include (can be repeated)
    #[arg(long = "message", value_name = "DATASET:PAYLOAD")]
    pub messages: Vec<String>,

    /// Execute in realtime mode
    #[arg(long)]
    pub realtime: bool,

    /// Delay in seconds between PD messages
    #[arg(long, default_value_t = 0.0)]
    pub step_delay: f64,
}

/// Parse a `DATASET:PAYLOAD` message. The payload may itself contain colons.
pub fn parse_message(spec: &str) -> Result<MessageSpec, CommandError> {
    let (dataset, payload) = spec
        .split_once(':')
        .ok_or_else(|| CommandError::InvalidMessage(spec.to_string()))?;
    let dataset_id = dataset
        .trim()
        .parse::<u32>()
        .map_err(|_| CommandError::InvalidMessage(spec.to_string()))?;

    Ok(MessageSpec {
        dataset_id,
        payload: payload.to_string(),
    })
}

pub fn build_request(args: &RunArgs) -> Result<StartRunRequest, CommandError> {
    let messages = args
        .messages
        .iter()
        .map(|spec| parse_message(spec))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(StartRunRequest {
        scenario_id: args.scenario.clone(),
        messages,
        options: RunOptionsSpec {
            realtime: args.realtime,
            step_delay: args.step_delay,
        },
    })
}

pub async fn execute(args: RunArgs, client: &ApiClient) -> Result<()> {
    let request = build_request(&args)?;
    info!(
        "Starting scenario {} with {} message(s)",
        request.scenario_id,
        request.messages.len()
    );

    let response = client
        .start_run(&request)
        .await
        .with_context(|| format!("Failed to start scenario {}", args.scenario))?;
    println!("Run started: {} (state={})", response.run_id, response.state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(messages: &[&str]) -> RunArgs {
        RunArgs {
            scenario: "demo".to_string(),
            messages: messages.iter().map(|m| m.to_string()).collect(),
            realtime: false,
            step_delay: 0.05,
        }
    }

    #[test]
    fn test_parse_message() {
        let message = parse_message("1:data").unwrap();
        assert_eq!(message.dataset_id, 1);
        assert_eq!(message.payload, "data");

        let message = parse_message("42:a:b").unwrap();
        assert_eq!(message.dataset_id, 42);
        assert_eq!(message.payload, "a:b");

        let message = parse_message("7:").unwrap();
        assert_eq!(message.payload, "");
    }

    #[test]
    fn test_parse_message_rejects_bad_specs() {
        assert!(matches!(
            parse_message("nodelimiter"),
            Err(CommandError::InvalidMessage(_))
        ));
        assert!(matches!(
            parse_message("abc:payload"),
            Err(CommandError::InvalidMessage(_))
        ));
        assert!(matches!(
            parse_message("-1:payload"),
            Err(CommandError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_build_request() {
        let request = build_request(&args(&["1:a", "2:b"])).unwrap();
        assert_eq!(request.scenario_id, "demo");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].dataset_id, 2);
        assert_eq!(request.options.step_delay, 0.05);

        let err = build_request(&args(&["1:a", "oops"])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid message specification: oops");
    }
}
