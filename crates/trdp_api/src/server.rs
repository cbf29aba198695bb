//! Axum router exposing simulation control over HTTP.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use trdp_core::{
    ControllerStatus, DeliveryReport, FaultDescriptor, ProcessDataMessage, SimulationController,
    TracingObserver,
};

use crate::catalog::{CatalogService, ValidationReport};
use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult, ServerError};
use crate::models::{
    DeviceList, FailRunRequest, FaultRequest, HealthResponse, ItemList, ScenarioList,
    StartRunRequest, StartRunResponse, ValidateRequest,
};

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Page served at `/ui` when no dashboard file is available.
pub const FALLBACK_DASHBOARD: &str = "<h1>TRDP Simulator</h1>";

/// Shared state of the API handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SimulationController>,
    pub catalog: Arc<CatalogService>,
    pub dashboard: Arc<str>,
}

impl AppState {
    pub fn new(controller: Arc<SimulationController>, catalog: CatalogService) -> Self {
        Self {
            controller,
            catalog: Arc::new(catalog),
            dashboard: Arc::from(FALLBACK_DASHBOARD),
        }
    }

    pub fn with_dashboard(mut self, html: impl Into<String>) -> Self {
        self.dashboard = Arc::from(html.into());
        self
    }
}

/// Read the dashboard page, falling back to a plain heading.
pub fn load_dashboard(path: impl AsRef<FsPath>) -> String {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(html) => html,
        Err(e) => {
            debug!("No dashboard at {:?} ({}), serving fallback", path, e);
            FALLBACK_DASHBOARD.to_string()
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/runs", get(current_run).post(start_run))
        .route("/runs/:run_id", get(run_status))
        .route("/runs/:run_id/pause", post(pause_run))
        .route("/runs/:run_id/resume", post(resume_run))
        .route("/runs/:run_id/fail", post(fail_run))
        .route("/runs/:run_id/faults", post(inject_fault))
        .route("/scenarios", get(list_scenarios))
        .route("/scenarios/validate", post(validate_scenario))
        .route("/devices", get(list_devices))
        .route("/ui", get(dashboard))
        .layer(from_fn(request_log_middleware))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    let controller = Arc::new(SimulationController::from_trdp_config(
        config.trdp_config(),
        config.engine_config(),
    ));
    controller.engine().register_observer(Arc::new(TracingObserver));
    let catalog = CatalogService::new(config.catalog_dir.clone());
    let state =
        AppState::new(controller, catalog).with_dashboard(load_dashboard(&config.dashboard));
    let router = build_router(state);

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;
    info!(
        "TRDP simulator API listening on {} (catalog: {:?})",
        config.bind, config.catalog_dir
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("TRDP simulator API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

async fn request_log_middleware(
    request: axum::extract::Request,
    next: Next,
) -> axum::response::Response {
    let rid = request_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    if let Some(err) = response.extensions_mut().remove::<ApiError>() {
        response = err.with_request_id(rid.clone()).into_response();
    }
    info!(
        "request_id={} {} {} -> {}",
        rid,
        method,
        path,
        response.status().as_u16()
    );
    if let Ok(value) = HeaderValue::from_str(&rid) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn dashboard(State(state): State<AppState>) -> Html<String> {
    Html(state.dashboard.to_string())
}

pub async fn start_run(
    State(state): State<AppState>,
    payload: Result<Json<StartRunRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StartRunResponse>)> {
    let request = json_body(payload)?;
    if request.scenario_id.trim().is_empty() {
        return Err(ApiError::bad_request("scenario_id is required"));
    }
    let options = request.options.to_options()?;
    let messages: Vec<ProcessDataMessage> = request
        .messages
        .into_iter()
        .map(ProcessDataMessage::from)
        .collect();

    let run_id = state
        .controller
        .start_run(request.scenario_id, messages, options)
        .await?;
    let status = state.controller.status(Some(&run_id)).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartRunResponse {
            run_id,
            state: status.state,
            telemetry: status.telemetry,
            realtime: status.realtime,
        }),
    ))
}

pub async fn current_run(State(state): State<AppState>) -> ApiResult<Json<ControllerStatus>> {
    Ok(Json(state.controller.status(None).await?))
}

pub async fn run_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<ControllerStatus>> {
    Ok(Json(state.controller.status(Some(&run_id)).await?))
}

pub async fn pause_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<ControllerStatus>> {
    state
        .controller
        .pause_run(&run_id)
        .await
        .map_err(ApiError::from_control)?;
    control_status(&state, &run_id).await
}

pub async fn resume_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<ControllerStatus>> {
    state
        .controller
        .resume_run(&run_id)
        .await
        .map_err(ApiError::from_control)?;
    control_status(&state, &run_id).await
}

pub async fn fail_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ControllerStatus>> {
    let request = if body.is_empty() {
        FailRunRequest::default()
    } else {
        serde_json::from_slice::<FailRunRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid fail request: {}", e)))?
    };
    let detail = request
        .detail
        .unwrap_or_else(|| "Run failed by operator".to_string());

    state
        .controller
        .fail_run(&run_id, detail)
        .await
        .map_err(ApiError::from_control)?;
    control_status(&state, &run_id).await
}

pub async fn inject_fault(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    payload: Result<Json<FaultRequest>, JsonRejection>,
) -> ApiResult<Json<DeliveryReport>> {
    let fault = FaultDescriptor::from(json_body(payload)?);
    if fault.name.trim().is_empty() {
        return Err(ApiError::bad_request("fault name is required"));
    }
    let report = state
        .controller
        .inject_fault(&run_id, &fault)
        .await
        .map_err(ApiError::from_control)?;
    Ok(Json(report))
}

pub async fn list_scenarios(State(state): State<AppState>) -> Json<ScenarioList> {
    Json(ItemList {
        items: state.catalog.list_scenarios(),
    })
}

pub async fn list_devices(State(state): State<AppState>) -> Json<DeviceList> {
    Json(ItemList {
        items: state.catalog.list_devices(),
    })
}

pub async fn validate_scenario(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ValidationReport>)> {
    let request = json_body(payload)?;
    let report = state.catalog.validate_scenario(&request.content);
    let status = if report.valid {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(report)))
}

async fn control_status(state: &AppState, run_id: &str) -> ApiResult<Json<ControllerStatus>> {
    let status = state
        .controller
        .status(Some(run_id))
        .await
        .map_err(ApiError::from_control)?;
    Ok(Json(status))
}
