//! Run lifecycle engine.
//!
//! The engine owns exactly one run at a time and executes it on a background
//! task. Control operations (`pause`, `resume`, `fail`) and `status` reads
//! only ever take the state lock briefly; the lock is never held while the
//! worker talks to the communication port or sleeps.
//!
//! # State Machine
//!
//! ```text
//!            start()             pause()
//! ┌──────┐ ──────────▶ ┌─────────┐ ──────▶ ┌────────┐
//! │ Idle │             │ Running │         │ Paused │
//! └──────┘             └─────────┘ ◀────── └────────┘
//!                       │   ▲   │  resume()    │
//!             finished  │   │   │ error/fail() │ fail()
//!                       ▼   │   ▼              ▼
//!              ┌───────────┐│  ┌────────┐◀─────┘
//!              │ Completed ││  │ Failed │
//!              └───────────┘│  └────────┘
//!                    └──────┴──────┘ start()
//! ```
//!
//! The worker suspends at the pause gate, checked before each message is
//! published, and in the chunked step delay, which re-checks the gate after
//! every chunk so a pause or forced failure is observed promptly even during
//! long delays. A pause accepted after the last message holds the run in
//! `Paused` until it is resumed or failed.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{SimError, SimResult};
use crate::message::{ControlMessage, DeliveryReport};
use crate::observer::{notify_all, RunEvent, RunObserver};
use crate::port::CommunicationPort;
use crate::run::{pd_telemetry, RunState, RunStatus, SimulationResult};
use crate::scenario::{FaultDescriptor, RunOptions, Scenario};

/// Default granularity of the step delay.
pub const DEFAULT_DELAY_CHUNK: Duration = Duration::from_millis(50);

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Longest uninterrupted sleep inside a step delay.
    pub delay_chunk: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay_chunk: DEFAULT_DELAY_CHUNK,
        }
    }
}

impl EngineConfig {
    pub fn delay_chunk(mut self, chunk: Duration) -> Self {
        self.delay_chunk = chunk.max(Duration::from_millis(1));
        self
    }
}

/// Mutable run state, guarded by `Shared::slot`.
#[derive(Default)]
struct RunSlot {
    state: RunState,
    scenario_id: Option<String>,
    telemetry: Vec<String>,
    realtime: bool,
    detail: Option<String>,
    result: Option<SimulationResult>,
    /// Incremented by every `start`.
    generation: u64,
    worker: Option<JoinHandle<()>>,
}

impl RunSlot {
    fn snapshot(&self) -> RunStatus {
        RunStatus {
            state: self.state,
            scenario_id: self.scenario_id.clone(),
            telemetry: self.telemetry.clone(),
            realtime: self.realtime,
            detail: self.detail.clone(),
        }
    }

    fn failure_detail(&self) -> String {
        self.detail
            .clone()
            .unwrap_or_else(|| "Simulation failed".to_string())
    }
}

/// What the worker should do at a suspension point.
enum Checkpoint {
    Proceed,
    Hold,
    Abort(String),
}

struct Shared {
    slot: Mutex<RunSlot>,
    /// Pause gate; `true` while the worker may proceed.
    gate: watch::Sender<bool>,
    /// Generation of the last run whose worker has finished.
    finished: watch::Sender<u64>,
    observers: RwLock<Vec<Arc<dyn RunObserver>>>,
}

/// Executes scenarios against a communication port on a background task.
///
/// Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct SimulationEngine {
    port: Arc<dyn CommunicationPort>,
    shared: Arc<Shared>,
    config: EngineConfig,
}

impl SimulationEngine {
    /// Create an engine with the default configuration.
    pub fn new(port: Arc<dyn CommunicationPort>) -> Self {
        Self::with_config(port, EngineConfig::default())
    }

    pub fn with_config(port: Arc<dyn CommunicationPort>, config: EngineConfig) -> Self {
        let (gate, _) = watch::channel(true);
        let (finished, _) = watch::channel(0);
        Self {
            port,
            shared: Arc::new(Shared {
                slot: Mutex::new(RunSlot::default()),
                gate,
                finished,
                observers: RwLock::new(Vec::new()),
            }),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register an observer to receive lifecycle events.
    pub fn register_observer(&self, observer: Arc<dyn RunObserver>) {
        self.shared.observers.write().push(observer);
    }

    /// Start executing a scenario in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, scenario: Scenario, options: RunOptions) -> SimResult<()> {
        let generation = {
            let mut slot = self.shared.slot.lock();
            if slot.state.is_active() {
                warn!(
                    "Rejecting start of {}: simulation already {}",
                    scenario.identifier, slot.state
                );
                return Err(SimError::Conflict(
                    "Simulation already in progress".to_string(),
                ));
            }
            if *self.shared.finished.borrow() < slot.generation {
                warn!(
                    "Rejecting start of {}: previous worker still unwinding",
                    scenario.identifier
                );
                return Err(SimError::Conflict(
                    "Previous simulation is still shutting down".to_string(),
                ));
            }

            slot.generation += 1;
            slot.state = RunState::Running;
            slot.scenario_id = Some(scenario.identifier.clone());
            slot.telemetry.clear();
            slot.realtime = options.realtime;
            slot.detail = None;
            slot.result = None;
            self.shared.gate.send_replace(true);
            slot.generation
        };

        info!(
            "Starting simulation {} ({} messages, realtime={}, step_delay={:?})",
            scenario.identifier,
            scenario.messages.len(),
            options.realtime,
            options.step_delay
        );
        self.notify(&RunEvent::Starting {
            scenario_id: scenario.identifier.clone(),
        });

        let worker = tokio::spawn(self.clone().execute(scenario, options, generation));
        self.shared.slot.lock().worker = Some(worker);
        Ok(())
    }

    /// Start a scenario, wait for it and return its result.
    ///
    /// Fails with [`SimError::RunFailed`] carrying the recorded detail if the
    /// run did not succeed.
    pub async fn run(&self, scenario: Scenario, options: RunOptions) -> SimResult<SimulationResult> {
        self.start(scenario, options)?;
        self.wait(None).await;

        let result = self.result().ok_or_else(|| {
            SimError::RunFailed("Simulation did not produce a result".to_string())
        })?;
        if !result.success {
            let detail = self.shared.slot.lock().failure_detail();
            return Err(SimError::RunFailed(detail));
        }
        Ok(result)
    }

    /// Pause the active run at its next suspension point.
    pub fn pause(&self) -> SimResult<()> {
        let mut slot = self.shared.slot.lock();
        if slot.state != RunState::Running {
            return Err(SimError::InvalidState(format!(
                "Simulation is not running (state={})",
                slot.state
            )));
        }
        slot.state = RunState::Paused;
        self.shared.gate.send_replace(false);
        info!("Simulation paused after {} message(s)", slot.telemetry.len());
        Ok(())
    }

    /// Resume a paused run.
    pub fn resume(&self) -> SimResult<()> {
        let mut slot = self.shared.slot.lock();
        if slot.state != RunState::Paused {
            return Err(SimError::InvalidState(format!(
                "Simulation is not paused (state={})",
                slot.state
            )));
        }
        slot.state = RunState::Running;
        self.shared.gate.send_replace(true);
        info!("Simulation resumed");
        Ok(())
    }

    /// Force the active run to fail.
    ///
    /// The worker observes the failure at its next suspension point.
    pub fn fail(&self, detail: impl Into<String>) -> SimResult<()> {
        let mut slot = self.shared.slot.lock();
        if !slot.state.is_active() {
            return Err(SimError::InvalidState(format!(
                "No active simulation to fail (state={})",
                slot.state
            )));
        }
        let detail = detail.into();
        warn!("Failing simulation: {}", detail);
        slot.detail = Some(detail);
        slot.state = RunState::Failed;
        self.shared.gate.send_replace(true);
        Ok(())
    }

    /// Snapshot of the current run.
    pub fn status(&self) -> RunStatus {
        self.shared.slot.lock().snapshot()
    }

    /// Result of the most recently finished run.
    pub fn result(&self) -> Option<SimulationResult> {
        self.shared.slot.lock().result.clone()
    }

    /// Wait until the current run has finished and its worker has exited.
    ///
    /// Returns `false` if the timeout elapsed first. Returns `true` at once
    /// when no run has been started.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        let generation = self.shared.slot.lock().generation;
        let mut finished = self.shared.finished.subscribe();
        let reached = async move { finished.wait_for(|g| *g >= generation).await.is_ok() };

        let completed = match timeout {
            Some(limit) => tokio::time::timeout(limit, reached).await.unwrap_or(false),
            None => reached.await,
        };

        if completed {
            let worker = self.shared.slot.lock().worker.take();
            if let Some(worker) = worker {
                if let Err(e) = worker.await {
                    warn!("Simulation worker did not exit cleanly: {}", e);
                }
            }
        }
        completed
    }

    /// Send a fault telegram and notify observers.
    pub async fn apply_fault(&self, fault: &FaultDescriptor) -> SimResult<DeliveryReport> {
        info!("Applying fault {} ({})", fault.name, fault.severity);
        let report = self
            .port
            .send_control(&ControlMessage::new(fault.name.as_str(), Vec::<u8>::new()))
            .await?;
        self.notify(&RunEvent::Fault {
            name: fault.name.clone(),
            severity: fault.severity.clone(),
        });
        Ok(report)
    }

    fn notify(&self, event: &RunEvent) {
        let observers = self.shared.observers.read().clone();
        notify_all(&observers, event);
    }

    /// Worker body. Never returns an error: failures end up in the slot.
    async fn execute(self, scenario: Scenario, options: RunOptions, generation: u64) {
        let outcome = AssertUnwindSafe(self.drive(&scenario, &options))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err("Simulation worker panicked".to_string()));

        // A pause that lands after the last suspension point still holds the run.
        let mut failure = outcome.err();
        while !self.finish(&scenario.identifier, options.realtime, generation, failure.take()) {
            failure = self.suspension_point().await.err();
        }
    }

    async fn drive(&self, scenario: &Scenario, options: &RunOptions) -> Result<(), String> {
        self.port
            .configure(scenario)
            .await
            .map_err(|e| e.to_string())?;

        let total = scenario.messages.len();
        for (index, message) in scenario.messages.iter().enumerate() {
            self.suspension_point().await?;

            let report = self
                .port
                .publish(message)
                .await
                .map_err(|e| e.to_string())?;
            let entry = pd_telemetry(message.dataset_id, report.success);
            debug!("[{}/{}] {}", index + 1, total, entry);
            self.record(entry)?;

            if !options.step_delay.is_zero() {
                self.step_delay(options.step_delay).await?;
            }
        }
        Ok(())
    }

    /// Block while paused; bail out if the run was failed.
    async fn suspension_point(&self) -> Result<(), String> {
        let mut gate = self.shared.gate.subscribe();
        loop {
            if gate.wait_for(|open| *open).await.is_err() {
                return Err("Pause gate closed".to_string());
            }
            match self.checkpoint() {
                Checkpoint::Proceed => return Ok(()),
                Checkpoint::Hold => continue,
                Checkpoint::Abort(detail) => return Err(detail),
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        let slot = self.shared.slot.lock();
        match slot.state {
            RunState::Failed => Checkpoint::Abort(slot.failure_detail()),
            RunState::Paused => Checkpoint::Hold,
            _ => Checkpoint::Proceed,
        }
    }

    fn record(&self, entry: String) -> Result<(), String> {
        let mut slot = self.shared.slot.lock();
        if slot.state == RunState::Failed {
            return Err(slot.failure_detail());
        }
        slot.telemetry.push(entry);
        Ok(())
    }

    async fn step_delay(&self, delay: Duration) -> Result<(), String> {
        let mut remaining = delay;
        while !remaining.is_zero() {
            let chunk = remaining.min(self.config.delay_chunk);
            tokio::time::sleep(chunk).await;
            remaining = remaining.saturating_sub(chunk);
            self.suspension_point().await?;
        }
        Ok(())
    }

    /// Move the run to its terminal state.
    ///
    /// Returns `false`, leaving the slot untouched, when a successful run is
    /// currently paused.
    fn finish(
        &self,
        scenario_id: &str,
        realtime: bool,
        generation: u64,
        failure: Option<String>,
    ) -> bool {
        let state = {
            let mut slot = self.shared.slot.lock();
            if failure.is_none() && slot.state == RunState::Paused {
                debug!("Simulation {} paused before completion", scenario_id);
                return false;
            }
            // A forced failure keeps the detail it was given.
            let failure = if slot.state == RunState::Failed {
                Some(slot.failure_detail())
            } else {
                failure
            };
            let telemetry = slot.telemetry.clone();
            match failure {
                None => {
                    slot.result = Some(SimulationResult {
                        success: true,
                        telemetry,
                    });
                    slot.state = RunState::Completed;
                }
                Some(detail) => {
                    error!("Simulation {} failed: {}", scenario_id, detail);
                    slot.detail = Some(detail);
                    slot.result = Some(SimulationResult {
                        success: false,
                        telemetry,
                    });
                    slot.state = RunState::Failed;
                }
            }
            self.shared.gate.send_replace(true);
            slot.state
        };

        info!("Simulation {} finished ({})", scenario_id, state);
        self.notify(&RunEvent::Finished {
            scenario_id: scenario_id.to_string(),
            realtime,
        });
        self.shared
            .finished
            .send_modify(|finished| *finished = (*finished).max(generation));
        true
    }
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("status", &self.status())
            .field("config", &self.config)
            .finish()
    }
}
