//! TRDP telegram types exchanged with a communication port.

use serde::{Deserialize, Serialize};

/// Process data telegram, published cyclically on a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDataMessage {
    pub dataset_id: u32,
    pub payload: Vec<u8>,
}

impl ProcessDataMessage {
    pub fn new(dataset_id: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            dataset_id,
            payload: payload.into(),
        }
    }
}

/// Message data telegram, used for control and fault signalling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub label: String,
    pub payload: Vec<u8>,
}

impl ControlMessage {
    pub fn new(label: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub success: bool,
    pub detail: Option<String>,
}

impl DeliveryReport {
    pub fn delivered(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: Some(detail.into()),
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: Some(detail.into()),
        }
    }
}
