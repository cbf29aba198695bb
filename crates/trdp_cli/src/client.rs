//! HTTP client for the automation API.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use trdp_api::{
    DeviceList, DeviceSummary, FailRunRequest, FaultRequest, ScenarioList, ScenarioSummary,
    StartRunRequest, StartRunResponse, ValidateRequest, ValidationReport,
};
use trdp_core::{ControllerStatus, DeliveryReport};

/// Default endpoint of the automation API.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors talking to the automation API.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to reach API at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid API response: {0}")]
    Decode(String),

    #[error("Failed to create HTTP client: {0}")]
    Setup(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pull the message out of an error envelope, or return the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Thin typed wrapper over the automation API routes.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base_url, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn start_run(&self, request: &StartRunRequest) -> ClientResult<StartRunResponse> {
        let url = self.url("/runs");
        let response = self.send(self.http.post(&url).json(request), &url).await?;
        read_json(response).await
    }

    pub async fn pause_run(&self, run_id: &str) -> ClientResult<ControllerStatus> {
        let url = self.url(&format!("/runs/{}/pause", run_id));
        let response = self.send(self.http.post(&url), &url).await?;
        read_json(response).await
    }

    pub async fn resume_run(&self, run_id: &str) -> ClientResult<ControllerStatus> {
        let url = self.url(&format!("/runs/{}/resume", run_id));
        let response = self.send(self.http.post(&url), &url).await?;
        read_json(response).await
    }

    pub async fn fail_run(&self, run_id: &str, detail: Option<String>) -> ClientResult<ControllerStatus> {
        let url = self.url(&format!("/runs/{}/fail", run_id));
        let body = FailRunRequest { detail };
        let response = self.send(self.http.post(&url).json(&body), &url).await?;
        read_json(response).await
    }

    pub async fn inject_fault(&self, run_id: &str, fault: &FaultRequest) -> ClientResult<DeliveryReport> {
        let url = self.url(&format!("/runs/{}/faults", run_id));
        let response = self.send(self.http.post(&url).json(fault), &url).await?;
        read_json(response).await
    }

    /// Status of a run, or of the current/last run without an id.
    pub async fn status(&self, run_id: Option<&str>) -> ClientResult<ControllerStatus> {
        let url = match run_id {
            Some(id) => self.url(&format!("/runs/{}", id)),
            None => self.url("/runs"),
        };
        let response = self.send(self.http.get(&url), &url).await?;
        read_json(response).await
    }

    pub async fn scenarios(&self) -> ClientResult<Vec<ScenarioSummary>> {
        let url = self.url("/scenarios");
        let response = self.send(self.http.get(&url), &url).await?;
        let list: ScenarioList = read_json(response).await?;
        Ok(list.items)
    }

    pub async fn devices(&self) -> ClientResult<Vec<DeviceSummary>> {
        let url = self.url("/devices");
        let response = self.send(self.http.get(&url), &url).await?;
        let list: DeviceList = read_json(response).await?;
        Ok(list.items)
    }

    /// Validate scenario content. An invalid scenario is a report, not an error.
    pub async fn validate(&self, content: impl Into<String>) -> ClientResult<ValidationReport> {
        let url = self.url("/scenarios/validate");
        let body = ValidateRequest {
            content: content.into(),
        };
        let response = self.send(self.http.post(&url).json(&body), &url).await?;
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let text = response
                .text()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            return serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()));
        }
        read_json(response).await
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> ClientResult<Response> {
        debug!("Calling {}", url);
        request
            .send()
            .await
            .map_err(|source| ClientError::Unreachable {
                url: url.to_string(),
                source,
            })
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))?;

    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}
