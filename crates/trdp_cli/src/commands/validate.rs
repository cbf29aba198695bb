//! Validate command - Check a scenario file against the catalog rules.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::CommandError;
use crate::client::ApiClient;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Scenario file to validate
    pub file: PathBuf,
}

pub async fn execute(args: ValidateArgs, client: &ApiClient) -> Result<()> {
    info!("Validating scenario file {:?}", args.file);

    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read scenario file {}", args.file.display()))?;
    let report = client
        .validate(content)
        .await
        .context("Failed to validate scenario")?;

    if report.valid {
        println!("Scenario validated successfully");
        return Ok(());
    }

    println!("Scenario validation failed:");
    for error in &report.errors {
        println!("  - {}", error);
    }
    Err(CommandError::ValidationFailed(report.errors.len()).into())
}
