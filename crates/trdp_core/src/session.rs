//! In-process TRDP session.
//!
//! Stands in for the production TRDP stack: it tracks the session lifecycle
//! and reports deliveries according to whether the session is open, which is
//! enough to drive the engine end to end.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CommError, CommResult};
use crate::message::{ControlMessage, DeliveryReport, ProcessDataMessage};
use crate::port::CommunicationPort;
use crate::scenario::Scenario;

/// Configuration used to open a TRDP session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrdpConfig {
    pub application_name: String,
    #[serde(default)]
    pub redundancy: bool,
}

impl Default for TrdpConfig {
    fn default() -> Self {
        Self {
            application_name: "trdp-sim".to_string(),
            redundancy: false,
        }
    }
}

impl TrdpConfig {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            redundancy: false,
        }
    }

    pub fn redundancy(mut self, enabled: bool) -> Self {
        self.redundancy = enabled;
        self
    }
}

/// Counters describing session activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub published: u64,
    pub sent: u64,
    pub configured_scenario: Option<String>,
}

/// Session manager backed by an in-process TRDP context.
#[derive(Debug)]
pub struct SessionManager {
    config: TrdpConfig,
    running: AtomicBool,
    published: AtomicU64,
    sent: AtomicU64,
    configured_scenario: RwLock<Option<String>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(TrdpConfig::default())
    }
}

impl SessionManager {
    pub fn new(config: TrdpConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
            published: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            configured_scenario: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &TrdpConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            published: self.published.load(Ordering::SeqCst),
            sent: self.sent.load(Ordering::SeqCst),
            configured_scenario: self.configured_scenario.read().clone(),
        }
    }
}

#[async_trait]
impl CommunicationPort for SessionManager {
    async fn configure(&self, scenario: &Scenario) -> CommResult<()> {
        if !self.is_running() {
            return Err(CommError::NotRunning);
        }
        debug!(
            "Configuring {} endpoint(s) for scenario {}",
            scenario.messages.len(),
            scenario.identifier
        );
        *self.configured_scenario.write() = Some(scenario.identifier.clone());
        Ok(())
    }

    async fn publish(&self, message: &ProcessDataMessage) -> CommResult<DeliveryReport> {
        self.published.fetch_add(1, Ordering::SeqCst);
        debug!(
            "Publishing PD dataset {} ({} bytes)",
            message.dataset_id,
            message.payload.len()
        );
        Ok(DeliveryReport {
            success: self.is_running(),
            detail: Some("pd".to_string()),
        })
    }

    async fn send_control(&self, message: &ControlMessage) -> CommResult<DeliveryReport> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        debug!("Sending MD telegram {}", message.label);
        Ok(DeliveryReport {
            success: self.is_running(),
            detail: Some(message.label.clone()),
        })
    }

    async fn start(&self) -> CommResult<()> {
        if !self.running.swap(true, Ordering::SeqCst) {
            info!("TRDP session started for {}", self.config.application_name);
        }
        Ok(())
    }

    async fn stop(&self) -> CommResult<()> {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("TRDP session stopped for {}", self.config.application_name);
        }
        *self.configured_scenario.write() = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configure_requires_running_session() {
        let session = SessionManager::default();
        let scenario = Scenario::new("demo", Vec::new());

        let err = session.configure(&scenario).await.unwrap_err();
        assert_eq!(err, CommError::NotRunning);

        session.start().await.unwrap();
        session.configure(&scenario).await.unwrap();
        assert_eq!(session.stats().configured_scenario.as_deref(), Some("demo"));
    }

    #[tokio::test]
    async fn test_delivery_follows_session_state() {
        let session = SessionManager::new(TrdpConfig::new("test").redundancy(true));
        let message = ProcessDataMessage::new(1, "a");

        let closed = session.publish(&message).await.unwrap();
        assert!(!closed.success);

        session.start().await.unwrap();
        let open = session.publish(&message).await.unwrap();
        assert!(open.success);
        assert_eq!(open.detail.as_deref(), Some("pd"));

        let md = session
            .send_control(&ControlMessage::new("door-fault", Vec::<u8>::new()))
            .await
            .unwrap();
        assert_eq!(md.detail.as_deref(), Some("door-fault"));

        let stats = session.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.sent, 1);
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let session = SessionManager::default();
        session.start().await.unwrap();
        session.start().await.unwrap();
        assert!(session.is_running());

        session.stop().await.unwrap();
        session.stop().await.unwrap();
        assert!(!session.is_running());
    }
}
