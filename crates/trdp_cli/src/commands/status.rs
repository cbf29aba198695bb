//! Status command - Inspect a run.

use anyhow::{Context, Result};
use clap::Args;

use trdp_core::ControllerStatus;

use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Run identifier; omit for the current or last run
    pub run_id: Option<String>,
}

/// One-line summary of a run status.
pub fn format_status(status: &ControllerStatus) -> String {
    let run_id = status.run_id.as_deref().unwrap_or("-");
    let mut line = format!(
        "Run {} state={} realtime={} telemetry=[{}]",
        run_id,
        status.state,
        status.realtime,
        status.telemetry.join(", ")
    );
    if let Some(detail) = status.detail.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(", detail={}", detail));
    }
    line
}

pub async fn execute(args: StatusArgs, client: &ApiClient) -> Result<()> {
    let status = client
        .status(args.run_id.as_deref())
        .await
        .with_context(|| match &args.run_id {
            Some(id) => format!("Failed to fetch status of run {}", id),
            None => "Failed to fetch current run status".to_string(),
        })?;
    println!("{}", format_status(&status));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trdp_core::RunState;

    fn status(state: RunState, detail: Option<&str>) -> ControllerStatus {
        ControllerStatus {
            run_id: Some("abc".to_string()),
            scenario_id: Some("demo".to_string()),
            state,
            telemetry: vec!["pd:1:true".to_string(), "pd:2:false".to_string()],
            realtime: false,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn test_format_completed_status() {
        assert_eq!(
            format_status(&status(RunState::Completed, None)),
            "Run abc state=completed realtime=false telemetry=[pd:1:true, pd:2:false]"
        );
    }

    #[test]
    fn test_format_failed_status_includes_detail() {
        let line = format_status(&status(RunState::Failed, Some("boom")));
        assert!(line.ends_with("telemetry=[pd:1:true, pd:2:false], detail=boom"));
        assert!(line.contains("state=failed"));
    }

    #[test]
    fn test_format_idle_status() {
        let idle = ControllerStatus {
            run_id: None,
            scenario_id: None,
            state: RunState::Idle,
            telemetry: Vec::new(),
            realtime: false,
            detail: None,
        };
        assert_eq!(format_status(&idle), "Run - state=idle realtime=false telemetry=[]");
    }
}
