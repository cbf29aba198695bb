//! Error types for the core module.

use thiserror::Error;

/// Result type alias for engine and controller operations.
pub type SimResult<T> = Result<T, SimError>;

/// Result type alias for communication port operations.
pub type CommResult<T> = Result<T, CommError>;

/// Errors surfaced by the engine and the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A run is already in progress.
    #[error("{0}")]
    Conflict(String),

    /// The operation is not legal in the current run state.
    #[error("{0}")]
    InvalidState(String),

    /// The run id matches neither the active run nor a latched one.
    #[error("Unknown run id: {0}")]
    UnknownRun(String),

    /// The run reached the failed state.
    #[error("Simulation failed: {0}")]
    RunFailed(String),

    #[error("Communication error: {0}")]
    Communication(#[from] CommError),
}

/// Errors raised by a communication port.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    #[error("TRDP context must be running before configuration")]
    NotRunning,

    #[error("Endpoint configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("Process data publish failed: {0}")]
    PublishFailed(String),

    #[error("Message data send failed: {0}")]
    SendFailed(String),
}
