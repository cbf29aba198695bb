//! Mock communication port for testing.
//!
//! Provides a configurable mock implementation of the CommunicationPort trait
//! for use in unit tests without a TRDP stack.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{CommError, CommResult};
use crate::message::{ControlMessage, DeliveryReport, ProcessDataMessage};
use crate::port::CommunicationPort;
use crate::scenario::Scenario;

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub method: String,
    pub scenario_id: Option<String>,
    pub dataset_id: Option<u32>,
    pub label: Option<String>,
}

impl CapturedCall {
    fn method(method: &str) -> Self {
        Self {
            method: method.to_string(),
            scenario_id: None,
            dataset_id: None,
            label: None,
        }
    }
}

/// Mock communication port for testing.
///
/// This port captures all calls and returns predefined delivery outcomes,
/// allowing tests to drive the engine without a session.
#[derive(Clone)]
pub struct MockPort {
    /// Whether the port is started.
    running: Arc<AtomicBool>,
    /// Predefined delivery outcomes for publish calls.
    outcomes: Arc<RwLock<Vec<bool>>>,
    /// Index of next outcome to return.
    outcome_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Error returned from configure.
    configure_failure: Arc<RwLock<Option<String>>>,
    /// Error returned from publish, keyed by dataset id.
    publish_failures: Arc<RwLock<Vec<(u32, String)>>>,
    /// Simulated time spent inside each publish.
    publish_latency: Arc<RwLock<Duration>>,
    /// Simulated time spent inside each control send.
    control_latency: Arc<RwLock<Duration>>,
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPort {
    /// Create a new mock port. It starts stopped, like a real session.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            outcomes: Arc::new(RwLock::new(Vec::new())),
            outcome_index: Arc::new(AtomicUsize::new(0)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            configure_failure: Arc::new(RwLock::new(None)),
            publish_failures: Arc::new(RwLock::new(Vec::new())),
            publish_latency: Arc::new(RwLock::new(Duration::ZERO)),
            control_latency: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Mark the port as already started.
    pub fn started(self) -> Self {
        self.running.store(true, Ordering::SeqCst);
        self
    }

    /// Set delivery outcomes returned by successive publish calls (cycled).
    pub fn with_outcomes(self, outcomes: Vec<bool>) -> Self {
        *self.outcomes.write() = outcomes;
        self
    }

    /// Make configure fail with the given message.
    pub fn fail_configure(self, message: impl Into<String>) -> Self {
        *self.configure_failure.write() = Some(message.into());
        self
    }

    /// Make publishing the given dataset fail with the given message.
    pub fn fail_publish(self, dataset_id: u32, message: impl Into<String>) -> Self {
        self.publish_failures.write().push((dataset_id, message.into()));
        self
    }

    /// Sleep for the given duration inside each publish.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.publish_latency.write() = latency;
        self
    }

    /// Sleep for the given duration inside each control send.
    pub fn with_control_latency(self, latency: Duration) -> Self {
        *self.control_latency.write() = latency;
        self
    }

    /// Clear all captured calls.
    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Check if a specific method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.method == method)
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Dataset ids published so far, in order.
    pub fn published_datasets(&self) -> Vec<u32> {
        self.get_method_calls("publish")
            .into_iter()
            .filter_map(|c| c.dataset_id)
            .collect()
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn next_outcome(&self) -> bool {
        let outcomes = self.outcomes.read();
        if outcomes.is_empty() {
            return true;
        }
        let index = self.outcome_index.fetch_add(1, Ordering::SeqCst);
        outcomes[index % outcomes.len()]
    }
}

#[async_trait]
impl CommunicationPort for MockPort {
    async fn configure(&self, scenario: &Scenario) -> CommResult<()> {
        self.record_call(CapturedCall {
            scenario_id: Some(scenario.identifier.clone()),
            ..CapturedCall::method("configure")
        });
        if let Some(msg) = self.configure_failure.read().clone() {
            return Err(CommError::ConfigurationFailed(msg));
        }
        if !self.is_running() {
            return Err(CommError::NotRunning);
        }
        Ok(())
    }

    async fn publish(&self, message: &ProcessDataMessage) -> CommResult<DeliveryReport> {
        self.record_call(CapturedCall {
            dataset_id: Some(message.dataset_id),
            ..CapturedCall::method("publish")
        });

        let latency = *self.publish_latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failure = self
            .publish_failures
            .read()
            .iter()
            .find(|(id, _)| *id == message.dataset_id)
            .map(|(_, msg)| msg.clone());
        if let Some(msg) = failure {
            return Err(CommError::PublishFailed(msg));
        }

        if self.next_outcome() {
            Ok(DeliveryReport::delivered("mock"))
        } else {
            Ok(DeliveryReport::rejected("mock"))
        }
    }

    async fn send_control(&self, message: &ControlMessage) -> CommResult<DeliveryReport> {
        self.record_call(CapturedCall {
            label: Some(message.label.clone()),
            ..CapturedCall::method("send_control")
        });

        let latency = *self.control_latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(DeliveryReport {
            success: self.is_running(),
            detail: Some(message.label.clone()),
        })
    }

    async fn start(&self) -> CommResult<()> {
        self.record_call(CapturedCall::method("start"));
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> CommResult<()> {
        self.record_call(CapturedCall::method("stop"));
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
