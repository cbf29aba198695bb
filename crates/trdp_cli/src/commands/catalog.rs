//! Catalog commands - List scenarios and device profiles.

use anyhow::{Context, Result};

use trdp_api::{DeviceSummary, ScenarioSummary};

use crate::client::ApiClient;

pub fn format_scenario(scenario: &ScenarioSummary) -> String {
    format!(
        "{} (device={}, events={}) {}",
        scenario.identifier,
        scenario.device,
        scenario.events,
        scenario.path.display()
    )
}

pub fn format_device(device: &DeviceSummary) -> String {
    format!("{} {}", device.name, device.path.display())
}

pub async fn scenarios(client: &ApiClient) -> Result<()> {
    let items = client
        .scenarios()
        .await
        .context("Failed to list scenarios")?;

    if items.is_empty() {
        println!("No scenarios found");
    }
    for scenario in &items {
        println!("{}", format_scenario(scenario));
    }
    Ok(())
}

pub async fn devices(client: &ApiClient) -> Result<()> {
    let items = client.devices().await.context("Failed to list devices")?;

    if items.is_empty() {
        println!("No devices found");
    }
    for device in &items {
        println!("{}", format_device(device));
    }
    Ok(())
}
