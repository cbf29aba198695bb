//! Run controller for automation clients.
//!
//! The controller addresses runs by an opaque id rather than "the current
//! run". It allows one active run at a time and, once a run has finished and
//! been reaped, keeps its final status so later queries by the same id still
//! succeed after newer runs have started.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::{EngineConfig, SimulationEngine};
use crate::error::{SimError, SimResult};
use crate::message::{DeliveryReport, ProcessDataMessage};
use crate::port::CommunicationPort;
use crate::run::{RunState, RunStatus};
use crate::scenario::{FaultDescriptor, RunOptions, Scenario};
use crate::session::{SessionManager, TrdpConfig};

/// Metadata about the active run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunHandle {
    pub run_id: String,
    pub scenario_id: String,
    pub options: RunOptions,
}

/// Status returned to automation clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub run_id: Option<String>,
    pub scenario_id: Option<String>,
    pub state: RunState,
    pub telemetry: Vec<String>,
    pub realtime: bool,
    pub detail: Option<String>,
}

impl ControllerStatus {
    fn for_run(handle: &RunHandle, status: RunStatus) -> Self {
        Self {
            run_id: Some(handle.run_id.clone()),
            scenario_id: Some(handle.scenario_id.clone()),
            state: status.state,
            telemetry: status.telemetry,
            realtime: status.realtime,
            detail: status.detail,
        }
    }

    fn detached(status: RunStatus) -> Self {
        Self {
            run_id: None,
            scenario_id: None,
            state: status.state,
            telemetry: status.telemetry,
            realtime: status.realtime,
            detail: status.detail,
        }
    }
}

/// Bookkeeping guarded by the controller lock.
#[derive(Debug, Default)]
struct Registry {
    active: Option<RunHandle>,
    latched: HashMap<String, ControllerStatus>,
    last_latched: Option<String>,
}

impl Registry {
    fn is_active(&self, run_id: &str) -> bool {
        self.active
            .as_ref()
            .map_or(false, |handle| handle.run_id == run_id)
    }

    fn validate_run_id(&self, run_id: &str) -> SimResult<()> {
        if self.is_active(run_id) {
            Ok(())
        } else {
            Err(SimError::UnknownRun(run_id.to_string()))
        }
    }
}

/// Manages the lifecycle of simulation runs for CLI/API automation.
pub struct SimulationController {
    port: Arc<dyn CommunicationPort>,
    engine: SimulationEngine,
    registry: Mutex<Registry>,
}

impl Default for SimulationController {
    fn default() -> Self {
        Self::from_trdp_config(TrdpConfig::default(), EngineConfig::default())
    }
}

impl SimulationController {
    /// Create a controller driving the given port.
    pub fn new(port: Arc<dyn CommunicationPort>) -> Self {
        Self::with_config(port, EngineConfig::default())
    }

    pub fn with_config(port: Arc<dyn CommunicationPort>, config: EngineConfig) -> Self {
        Self {
            engine: SimulationEngine::with_config(port.clone(), config),
            port,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Create a controller backed by an in-process TRDP session.
    pub fn from_trdp_config(trdp: TrdpConfig, config: EngineConfig) -> Self {
        Self::with_config(Arc::new(SessionManager::new(trdp)), config)
    }

    /// The engine executing runs for this controller.
    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    /// Start executing a scenario and return the new run id.
    ///
    /// Does not wait for the run to make progress.
    pub async fn start_run(
        &self,
        scenario_id: impl Into<String>,
        messages: Vec<ProcessDataMessage>,
        options: RunOptions,
    ) -> SimResult<String> {
        let scenario_id = scenario_id.into();
        let mut registry = self.registry.lock().await;

        if let Some(handle) = registry.active.clone() {
            let live = self.engine.status();
            if live.state.is_active() {
                warn!(
                    "Rejecting run of {}: run {} is {}",
                    scenario_id, handle.run_id, live.state
                );
                return Err(SimError::Conflict(
                    "A simulation run is already active".to_string(),
                ));
            }
            // Finished but never polled; keep its final status reachable.
            self.reap(&mut registry, ControllerStatus::for_run(&handle, live))
                .await;
        }

        let port_started = !self.port.is_running();
        if port_started {
            self.port.start().await?;
        }

        let run_id = Uuid::new_v4().to_string();
        if let Err(e) = self
            .engine
            .start(Scenario::new(scenario_id.clone(), messages), options)
        {
            if port_started {
                if let Err(stop_err) = self.port.stop().await {
                    warn!("Failed to stop communication port: {}", stop_err);
                }
            }
            return Err(e);
        }
        info!("Run {} started for scenario {}", run_id, scenario_id);

        registry.active = Some(RunHandle {
            run_id: run_id.clone(),
            scenario_id,
            options,
        });
        Ok(run_id)
    }

    /// Pause the active run.
    pub async fn pause_run(&self, run_id: &str) -> SimResult<()> {
        let registry = self.registry.lock().await;
        registry.validate_run_id(run_id)?;
        self.engine.pause()
    }

    /// Resume a paused run.
    pub async fn resume_run(&self, run_id: &str) -> SimResult<()> {
        let registry = self.registry.lock().await;
        registry.validate_run_id(run_id)?;
        self.engine.resume()
    }

    /// Force the active run to fail with the given detail.
    pub async fn fail_run(&self, run_id: &str, detail: impl Into<String>) -> SimResult<()> {
        let registry = self.registry.lock().await;
        registry.validate_run_id(run_id)?;
        self.engine.fail(detail)
    }

    /// Inject a fault into the active run.
    ///
    /// The controller lock is released before the fault is sent.
    pub async fn inject_fault(
        &self,
        run_id: &str,
        fault: &FaultDescriptor,
    ) -> SimResult<DeliveryReport> {
        self.registry.lock().await.validate_run_id(run_id)?;
        self.engine.apply_fault(fault).await
    }

    /// Wait for a run to finish. Returns `false` if the timeout elapsed.
    ///
    /// The controller lock is not held while waiting.
    pub async fn wait_run(&self, run_id: &str, timeout: Option<Duration>) -> SimResult<bool> {
        {
            let registry = self.registry.lock().await;
            if registry.latched.contains_key(run_id) {
                return Ok(true);
            }
            registry.validate_run_id(run_id)?;
        }
        Ok(self.engine.wait(timeout).await)
    }

    /// Status of the requested run, or of the current/last run when no id is
    /// given.
    ///
    /// Querying a run that has reached a terminal state reaps it: the final
    /// status is latched under its id, the active slot is released and the
    /// communication port is stopped.
    pub async fn status(&self, run_id: Option<&str>) -> SimResult<ControllerStatus> {
        let mut registry = self.registry.lock().await;

        if let Some(id) = run_id {
            if !registry.is_active(id) {
                return registry
                    .latched
                    .get(id)
                    .cloned()
                    .ok_or_else(|| SimError::UnknownRun(id.to_string()));
            }
        }

        let Some(handle) = registry.active.clone() else {
            let last = registry
                .last_latched
                .as_ref()
                .and_then(|id| registry.latched.get(id))
                .cloned();
            return Ok(last.unwrap_or_else(|| ControllerStatus::detached(self.engine.status())));
        };

        let status = ControllerStatus::for_run(&handle, self.engine.status());
        if status.state.is_terminal() {
            return Ok(self.reap(&mut registry, status).await);
        }
        Ok(status)
    }

    /// Finalise a terminated run and release the active slot.
    async fn reap(&self, registry: &mut Registry, mut status: ControllerStatus) -> ControllerStatus {
        self.engine.wait(None).await;

        let settled = self.engine.status();
        status.state = settled.state;
        status.detail = settled.detail;
        if let Some(result) = self.engine.result() {
            status.telemetry = result.telemetry;
        }

        if let Some(run_id) = status.run_id.clone() {
            debug!("Latching final status of run {} ({})", run_id, status.state);
            registry.latched.insert(run_id.clone(), status.clone());
            registry.last_latched = Some(run_id);
        }
        registry.active = None;

        if self.port.is_running() {
            if let Err(e) = self.port.stop().await {
                warn!("Failed to stop communication port after run: {}", e);
            }
        }
        status
    }
}

impl std::fmt::Debug for SimulationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationController")
            .field("engine", &self.engine)
            .field("port_running", &self.port.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPort;

    fn controller() -> (SimulationController, MockPort) {
        let port = MockPort::new();
        (SimulationController::new(Arc::new(port.clone())), port)
    }

    #[tokio::test]
    async fn test_fresh_controller_reports_idle() {
        let (controller, _) = controller();

        let status = controller.status(None).await.unwrap();
        assert_eq!(status.state, RunState::Idle);
        assert!(status.run_id.is_none());
        assert!(status.telemetry.is_empty());

        let err = controller.status(Some("missing")).await.unwrap_err();
        assert_eq!(err, SimError::UnknownRun("missing".to_string()));
    }

    #[tokio::test]
    async fn test_start_run_starts_port_and_reap_stops_it() {
        let (controller, port) = controller();

        let run_id = controller
            .start_run("demo", vec![ProcessDataMessage::new(1, "a")], RunOptions::default())
            .await
            .unwrap();
        assert!(port.is_running());

        assert!(controller.wait_run(&run_id, None).await.unwrap());
        let status = controller.status(Some(&run_id)).await.unwrap();
        assert_eq!(status.state, RunState::Completed);
        assert!(!port.is_running());
        assert!(port.was_called("stop"));
    }

    #[tokio::test]
    async fn test_unpolled_finished_run_is_latched_on_next_start() {
        let (controller, _) = controller();

        let first = controller
            .start_run("first", vec![ProcessDataMessage::new(1, "a")], RunOptions::default())
            .await
            .unwrap();
        assert!(controller.wait_run(&first, None).await.unwrap());

        let second = controller
            .start_run("second", vec![ProcessDataMessage::new(2, "b")], RunOptions::default())
            .await
            .unwrap();
        assert_ne!(first, second);

        let latched = controller.status(Some(&first)).await.unwrap();
        assert_eq!(latched.state, RunState::Completed);
        assert_eq!(latched.telemetry, vec!["pd:1:true"]);
    }

    #[tokio::test]
    async fn test_status_responds_while_fault_is_sent() {
        let port = MockPort::new().with_control_latency(Duration::from_millis(500));
        let controller = Arc::new(SimulationController::new(Arc::new(port.clone())));
        let run_id = controller
            .start_run(
                "slow",
                vec![ProcessDataMessage::new(1, "a")],
                RunOptions::default().step_delay(Duration::from_secs(5)),
            )
            .await
            .unwrap();

        let fault = {
            let controller = controller.clone();
            let run_id = run_id.clone();
            tokio::spawn(async move {
                controller
                    .inject_fault(&run_id, &FaultDescriptor::new("door", "major"))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(port.was_called("send_control"));

        let status = tokio::time::timeout(Duration::from_millis(200), controller.status(Some(&run_id)))
            .await
            .expect("status blocked behind fault delivery")
            .unwrap();
        assert_eq!(status.state, RunState::Running);
        tokio::time::timeout(Duration::from_millis(200), controller.pause_run(&run_id))
            .await
            .expect("pause blocked behind fault delivery")
            .unwrap();

        assert!(fault.await.unwrap().unwrap().success);
        controller.fail_run(&run_id, "teardown").await.unwrap();
        assert!(controller.wait_run(&run_id, Some(Duration::from_secs(1))).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_start_leaves_port_stopped() {
        let (controller, port) = controller();
        port.start().await.unwrap();
        controller
            .engine()
            .start(
                Scenario::new("direct", vec![ProcessDataMessage::new(1, "a")]),
                RunOptions::default().step_delay(Duration::from_secs(5)),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        port.stop().await.unwrap();

        let err = controller
            .start_run("other", Vec::new(), RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Conflict(_)));
        assert!(!port.is_running());
        assert_eq!(port.get_method_calls("start").len(), 2);
        assert_eq!(port.get_method_calls("stop").len(), 2);

        controller.engine().fail("teardown").unwrap();
        assert!(controller.engine().wait(Some(Duration::from_secs(1))).await);
    }

    #[tokio::test]
    async fn test_wait_run_rejects_unknown_id() {
        let (controller, _) = controller();
        let err = controller.wait_run("nope", None).await.unwrap_err();
        assert!(matches!(err, SimError::UnknownRun(_)));
    }
}
