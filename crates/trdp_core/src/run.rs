//! Run state and the snapshots derived from it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of the run currently owned by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No run has been started
    #[default]
    Idle,
    /// The worker is publishing messages
    Running,
    /// The worker is held at its next suspension point
    Paused,
    /// All messages were processed
    Completed,
    /// The run stopped on an error or a forced failure
    Failed,
}

impl RunState {
    /// Running or paused.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Completed or failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only copy of the engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub state: RunState,
    pub scenario_id: Option<String>,
    pub telemetry: Vec<String>,
    pub realtime: bool,
    pub detail: Option<String>,
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub success: bool,
    pub telemetry: Vec<String>,
}

/// Telemetry entry recorded for each published message.
pub(crate) fn pd_telemetry(dataset_id: u32, delivered: bool) -> String {
    format!("pd:{}:{}", dataset_id, delivered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names_are_lowercase() {
        assert_eq!(RunState::Paused.to_string(), "paused");
        assert_eq!(
            serde_json::to_string(&RunState::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn test_state_classification() {
        assert!(RunState::Running.is_active());
        assert!(RunState::Paused.is_active());
        assert!(!RunState::Idle.is_active());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Paused.is_terminal());
    }

    #[test]
    fn test_pd_telemetry_format() {
        assert_eq!(pd_telemetry(7, true), "pd:7:true");
        assert_eq!(pd_telemetry(7, false), "pd:7:false");
    }
}
