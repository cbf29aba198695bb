//! Lifecycle notifications emitted by the engine.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

/// Lifecycle event delivered to observers.
///
/// The `Display` form is the tag format understood by automation clients,
/// e.g. `starting:demo` or `finished:demo:false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Starting { scenario_id: String },
    Finished { scenario_id: String, realtime: bool },
    Fault { name: String, severity: String },
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting { scenario_id } => write!(f, "starting:{}", scenario_id),
            Self::Finished {
                scenario_id,
                realtime,
            } => write!(f, "finished:{}:{}", scenario_id, realtime),
            Self::Fault { name, severity } => write!(f, "fault:{}:{}", name, severity),
        }
    }
}

/// Receives lifecycle events from the engine.
///
/// Called synchronously from the thread that produced the event, never while
/// engine state is locked.
pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent);
}

/// Observer that forwards events to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &RunEvent) {
        info!(event = %event, "Simulation event");
    }
}

/// Observer that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().clone()
    }

    /// Event tags received so far.
    pub fn tags(&self) -> Vec<String> {
        self.events.lock().iter().map(ToString::to_string).collect()
    }
}

impl RunObserver for RecordingObserver {
    fn on_event(&self, event: &RunEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Deliver an event to every observer, isolating panics.
pub(crate) fn notify_all(observers: &[Arc<dyn RunObserver>], event: &RunEvent) {
    for observer in observers {
        let delivered = catch_unwind(AssertUnwindSafe(|| observer.on_event(event)));
        if delivered.is_err() {
            warn!(event = %event, "Observer panicked while handling event, ignoring");
        }
    }
}
