//! Scenario definitions and per-run options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::ProcessDataMessage;

/// An ordered script of process data messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub identifier: String,
    pub messages: Vec<ProcessDataMessage>,
}

impl Scenario {
    pub fn new(identifier: impl Into<String>, messages: Vec<ProcessDataMessage>) -> Self {
        Self {
            identifier: identifier.into(),
            messages,
        }
    }

    /// Append a message.
    pub fn message(mut self, message: ProcessDataMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// Execution options controlling a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Reported back to clients; no deadline guarantees are attached.
    pub realtime: bool,
    /// Pause inserted after each published message.
    pub step_delay: Duration,
}

impl RunOptions {
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }
}

/// A fault injected into a running simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultDescriptor {
    pub name: String,
    pub severity: String,
}

impl FaultDescriptor {
    pub fn new(name: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            severity: severity.into(),
        }
    }
}
