//! Integration tests for the trdp-sim binary.
//!
//! Each test serves the automation API on an ephemeral port and runs the
//! binary against it.

use std::fs;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::process::Command;
use trdp_api::{build_router, AppState, CatalogService};
use trdp_core::SimulationController;

async fn spawn_api(catalog: CatalogService) -> String {
    let controller = Arc::new(SimulationController::default());
    let router = build_router(AppState::new(controller, catalog));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn trdp_sim(api_url: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trdp-sim"))
        .arg("--api-url")
        .arg(api_url)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("TRDP_SIM_API_URL")
        .output()
        .await
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn started_run_id(output: &Output) -> String {
    let text = stdout(output);
    let rest = text
        .trim()
        .strip_prefix("Run started: ")
        .unwrap_or_else(|| panic!("unexpected output: {}", text));
    rest.split(" (").next().unwrap().to_string()
}

async fn poll_status(api_url: &str, run_id: &str, state: &str) -> String {
    let needle = format!("state={}", state);
    for _ in 0..50 {
        let output = trdp_sim(api_url, &["status", run_id]).await;
        let text = stdout(&output);
        if text.contains(&needle) {
            return text;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("run {} never reached {}", run_id, state);
}

fn empty_catalog() -> CatalogService {
    CatalogService::new("/nonexistent/catalog")
}

/// Test run followed by status reports ordered telemetry.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_and_status() {
    let api = spawn_api(empty_catalog()).await;

    let output = trdp_sim(&api, &["run", "demo", "--message", "1:a", "--message", "2:b"]).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("(state="));
    let run_id = started_run_id(&output);

    let status = poll_status(&api, &run_id, "completed").await;
    assert!(status.starts_with(&format!("Run {} state=completed", run_id)));
    assert!(status.contains("realtime=false"));
    assert!(status.contains("telemetry=[pd:1:true, pd:2:true]"));
}

/// Test pause, resume and fail through the binary.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pause_resume_and_fail() {
    let api = spawn_api(empty_catalog()).await;

    let output = trdp_sim(
        &api,
        &["run", "slow", "--message", "1:a", "--message", "2:b", "--step-delay", "5", "--realtime"],
    )
    .await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let run_id = started_run_id(&output);

    let output = trdp_sim(&api, &["pause", &run_id]).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), format!("Run {} paused (state=paused)", run_id));

    let output = trdp_sim(&api, &["resume", &run_id]).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), format!("Run {} resumed (state=running)", run_id));

    let output = trdp_sim(&api, &["fail", &run_id, "--detail", "bench stopped"]).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let status = poll_status(&api, &run_id, "failed").await;
    assert!(status.contains("realtime=true"));
    assert!(status.trim_end().ends_with("detail=bench stopped"));
}

/// Test a second run is rejected while one is active.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_conflicting_run_is_api_error() {
    let api = spawn_api(empty_catalog()).await;

    let output = trdp_sim(&api, &["run", "slow", "--message", "1:a", "--step-delay", "5"]).await;
    assert!(output.status.success());
    let run_id = started_run_id(&output);

    let output = trdp_sim(&api, &["run", "other"]).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("409"));

    trdp_sim(&api, &["fail", &run_id]).await;
}

/// Test malformed message specifications exit with code 2.
#[tokio::test]
async fn test_invalid_message_spec() {
    let output = trdp_sim("http://127.0.0.1:9", &["run", "demo", "--message", "nodelimiter"]).await;
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Invalid message specification: nodelimiter"));
}

/// Test an unknown run id exits with the API error code.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_run_status() {
    let api = spawn_api(empty_catalog()).await;

    let output = trdp_sim(&api, &["status", "missing"]).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("Unknown run id: missing"));
}

/// Test an unreachable API exits with the API error code.
#[tokio::test]
async fn test_unreachable_api() {
    let output = trdp_sim("http://127.0.0.1:9", &["status", "abc"]).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("Failed to reach API"));
}

/// Test catalog listing and scenario validation.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_catalog_commands() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("loop.yaml"),
        "scenario: loop\ndevice: device1\nevents:\n  - type: pd\n    label: start\n  - type: pd\n    label: stop\n",
    )
    .unwrap();
    fs::write(dir.path().join("device1.xml"), "<device name=\"device1\"/>").unwrap();
    let api = spawn_api(CatalogService::new(dir.path())).await;

    let output = trdp_sim(&api, &["scenarios"]).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("loop (device=device1, events=2)"));

    let output = trdp_sim(&api, &["devices"]).await;
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("device1 "));

    let valid = dir.path().join("scenario.yaml");
    fs::write(&valid, "scenario: loop\ndevice: device1\nevents:\n  - type: pd\n    label: start\n").unwrap();
    let output = trdp_sim(&api, &["validate", valid.to_str().unwrap()]).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Scenario validated successfully"));

    let invalid = dir.path().join("invalid.txt");
    fs::write(&invalid, "device: device1\n").unwrap();
    let output = trdp_sim(&api, &["validate", invalid.to_str().unwrap()]).await;
    assert_eq!(output.status.code(), Some(3));
    let text = stdout(&output);
    assert!(text.contains("scenario field is required"));
    assert!(text.contains("At least one event must be defined"));
}
