//! # trdp_api
//!
//! HTTP automation API for the TRDP simulator.
//!
//! The router exposes the run controller (start, pause, resume, fail, fault
//! injection and status) together with a catalog of scenario and device
//! files found in a directory.
//!
//! | route                        | purpose                                |
//! |------------------------------|----------------------------------------|
//! | `POST /runs`                 | start a run, `201` with its id         |
//! | `GET /runs`                  | status of the current or last run      |
//! | `GET /runs/:run_id`          | status of one run                      |
//! | `POST /runs/:run_id/pause`   | pause a running run                    |
//! | `POST /runs/:run_id/resume`  | resume a paused run                    |
//! | `POST /runs/:run_id/fail`    | force a run into the failed state      |
//! | `POST /runs/:run_id/faults`  | inject a fault telegram                |
//! | `GET /scenarios`             | list valid scenario files              |
//! | `POST /scenarios/validate`   | validate scenario content              |
//! | `GET /devices`               | list device profiles                   |
//! | `GET /health`                | liveness                               |
//! | `GET /ui`                    | dashboard page                         |
//!
//! Every request is tagged with the `x-request-id` header it arrived with,
//! or a fresh UUID. The id is logged, echoed on the response and used as
//! the `request_id` of error envelopes.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod server;

pub use catalog::{CatalogService, DeviceSummary, ScenarioSummary, ValidationReport};
pub use config::{ServerConfig, DEFAULT_BIND, DEFAULT_CATALOG_DIR, DEFAULT_DASHBOARD};
pub use error::{ApiError, ApiResult, ConfigError, ServerError};
pub use models::{
    DeviceList, FailRunRequest, FaultRequest, HealthResponse, ItemList, MessageSpec,
    RunOptionsSpec, ScenarioList, StartRunRequest, StartRunResponse, ValidateRequest,
};
pub use server::{build_router, load_dashboard, serve, AppState, FALLBACK_DASHBOARD, REQUEST_ID_HEADER};
