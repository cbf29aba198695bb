//! Control commands - Pause, resume, fail and fault injection.

use anyhow::{Context, Result};
use clap::Args;

use trdp_api::FaultRequest;

use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct RunIdArgs {
    /// Run identifier returned by the run command
    pub run_id: String,
}

#[derive(Args, Debug)]
pub struct FailArgs {
    /// Run identifier returned by the run command
    pub run_id: String,

    /// Reason recorded on the failed run
    #[arg(long)]
    pub detail: Option<String>,
}

#[derive(Args, Debug)]
pub struct FaultArgs {
    /// Run identifier returned by the run command
    pub run_id: String,

    /// Fault name, sent as the control telegram label
    pub name: String,

    /// Fault severity
    #[arg(long, default_value = "minor")]
    pub severity: String,
}

pub async fn pause(args: RunIdArgs, client: &ApiClient) -> Result<()> {
    let status = client
        .pause_run(&args.run_id)
        .await
        .with_context(|| format!("Failed to pause run {}", args.run_id))?;
    println!("Run {} paused (state={})", display_id(&status.run_id, &args.run_id), status.state);
    Ok(())
}

pub async fn resume(args: RunIdArgs, client: &ApiClient) -> Result<()> {
    let status = client
        .resume_run(&args.run_id)
        .await
        .with_context(|| format!("Failed to resume run {}", args.run_id))?;
    println!("Run {} resumed (state={})", display_id(&status.run_id, &args.run_id), status.state);
    Ok(())
}

pub async fn fail(args: FailArgs, client: &ApiClient) -> Result<()> {
    let status = client
        .fail_run(&args.run_id, args.detail)
        .await
        .with_context(|| format!("Failed to fail run {}", args.run_id))?;
    println!("Run {} failed (state={})", display_id(&status.run_id, &args.run_id), status.state);
    Ok(())
}

pub async fn fault(args: FaultArgs, client: &ApiClient) -> Result<()> {
    let request = FaultRequest {
        name: args.name,
        severity: args.severity,
    };
    let report = client
        .inject_fault(&args.run_id, &request)
        .await
        .with_context(|| format!("Failed to inject fault into run {}", args.run_id))?;

    let outcome = if report.success { "delivered" } else { "rejected" };
    println!("Fault {} {} ({})", request.name, outcome, request.severity);
    Ok(())
}

/// The run id echoed by the API, or the one the user typed.
fn display_id<'a>(reported: &'a Option<String>, requested: &'a str) -> &'a str {
    reported.as_deref().unwrap_or(requested)
}
