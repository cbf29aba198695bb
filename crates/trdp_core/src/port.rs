//! Communication port trait.

use async_trait::async_trait;

use crate::error::CommResult;
use crate::message::{ControlMessage, DeliveryReport, ProcessDataMessage};
use crate::scenario::Scenario;

/// Endpoint the engine drives while executing a scenario.
///
/// Only the run worker calls `configure` and `publish` during a run; the
/// controller owns `start` and `stop`.
#[async_trait]
pub trait CommunicationPort: Send + Sync {
    /// Configure endpoints for the given scenario. Fails if the port has not
    /// been started.
    async fn configure(&self, scenario: &Scenario) -> CommResult<()>;

    /// Publish a process data telegram.
    async fn publish(&self, message: &ProcessDataMessage) -> CommResult<DeliveryReport>;

    /// Send a message data telegram.
    async fn send_control(&self, message: &ControlMessage) -> CommResult<DeliveryReport>;

    /// Open the underlying session.
    async fn start(&self) -> CommResult<()>;

    /// Close the underlying session.
    async fn stop(&self) -> CommResult<()>;

    /// Whether the session is currently open.
    fn is_running(&self) -> bool;
}
