//! Request and response bodies of the automation API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use trdp_core::{FaultDescriptor, ProcessDataMessage, RunOptions, RunState};

use crate::catalog::{DeviceSummary, ScenarioSummary};
use crate::error::{ApiError, ApiResult};

/// One process-data message of a start request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MessageSpec {
    pub dataset_id: u32,
    #[serde(default)]
    pub payload: String,
}

impl From<MessageSpec> for ProcessDataMessage {
    fn from(spec: MessageSpec) -> Self {
        ProcessDataMessage::new(spec.dataset_id, spec.payload.into_bytes())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunOptionsSpec {
    pub realtime: bool,
    /// Seconds to wait after each message
    pub step_delay: f64,
}

impl RunOptionsSpec {
    pub fn to_options(&self) -> ApiResult<RunOptions> {
        let step_delay = Duration::try_from_secs_f64(self.step_delay).map_err(|_| {
            ApiError::bad_request("step_delay must be a non-negative number of seconds")
        })?;
        Ok(RunOptions::default()
            .realtime(self.realtime)
            .step_delay(step_delay))
    }
}

/// Body of `POST /runs`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StartRunRequest {
    #[serde(default)]
    pub scenario_id: String,
    #[serde(default)]
    pub messages: Vec<MessageSpec>,
    #[serde(default)]
    pub options: RunOptionsSpec,
}

/// Body returned by `POST /runs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StartRunResponse {
    pub run_id: String,
    pub state: RunState,
    pub telemetry: Vec<String>,
    pub realtime: bool,
}

/// Body of `POST /runs/:run_id/fail`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FailRunRequest {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Body of `POST /runs/:run_id/faults`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FaultRequest {
    pub name: String,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "minor".to_string()
}

impl From<FaultRequest> for FaultDescriptor {
    fn from(request: FaultRequest) -> Self {
        FaultDescriptor::new(request.name, request.severity)
    }
}

/// Body of `POST /scenarios/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidateRequest {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList<T> {
    pub items: Vec<T>,
}

pub type ScenarioList = ItemList<ScenarioSummary>;
pub type DeviceList = ItemList<DeviceSummary>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
