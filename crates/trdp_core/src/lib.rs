//! # trdp_core
//!
//! Run lifecycle engine for the TRDP simulator.
//!
//! This crate provides the state machine that executes a scenario on a
//! background task, and the controller that lets automation clients drive
//! and observe runs by id.
//!
//! # Architecture
//!
//! - **Port**: Abstract TRDP endpoint the engine publishes through
//! - **Session**: In-process TRDP session implementing the port
//! - **Engine**: Owns one run at a time; pause/resume/fail/wait/status
//! - **Controller**: Issues run ids, enforces one active run, latches final status
//! - **Observers**: Receive lifecycle events (`starting`, `finished`, `fault`)
//!
//! # Example
//!
//! ```rust,no_run
//! use trdp_core::{ProcessDataMessage, RunOptions, SimulationController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = SimulationController::default();
//!
//!     let run_id = controller
//!         .start_run("demo", vec![ProcessDataMessage::new(1, "a")], RunOptions::default())
//!         .await?;
//!     controller.wait_run(&run_id, None).await?;
//!
//!     let status = controller.status(Some(&run_id)).await?;
//!     println!("{} {:?}", status.state, status.telemetry);
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod engine;
pub mod error;
pub mod message;
pub mod mock;
pub mod observer;
pub mod port;
pub mod run;
pub mod scenario;
pub mod session;

// Re-export main types for convenience
pub use controller::{ControllerStatus, RunHandle, SimulationController};
pub use engine::{EngineConfig, SimulationEngine, DEFAULT_DELAY_CHUNK};
pub use error::{CommError, CommResult, SimError, SimResult};
pub use message::{ControlMessage, DeliveryReport, ProcessDataMessage};
pub use mock::{CapturedCall, MockPort};
pub use observer::{RecordingObserver, RunEvent, RunObserver, TracingObserver};
pub use port::CommunicationPort;
pub use run::{RunState, RunStatus, SimulationResult};
pub use scenario::{FaultDescriptor, RunOptions, Scenario};
pub use session::{SessionManager, SessionStats, TrdpConfig};
