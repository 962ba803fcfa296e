//! Common types for cross-chain transfer orchestration
//!
//! Shared data model for the orchestrator, execution client, and progress
//! tracker: protocol steps, engine results, and engine events.

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One phase of the bridge protocol, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepName {
    Approval,
    Burn,
    Attestation,
    Mint,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Approval => "approval",
            StepName::Burn => "burn",
            StepName::Attestation => "attestation",
            StepName::Mint => "mint",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a single step inside an engine result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Active,
    Done,
    Error,
}

/// A single step entry from the engine's transfer result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStep {
    pub name: StepName,
    pub state: StepState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Overall state reported by the engine for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultState {
    Success,
    Error,
    Pending,
}

/// An ordered sequence of steps plus the engine's overall verdict.
///
/// The overall `state` is advisory: the engine may report success at the
/// transport level while an individual step recorded an error, so callers
/// must check the steps independently (see [`TransferResult::error_step`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub state: ResultState,
    #[serde(default)]
    pub steps: Vec<TransferStep>,
}

impl TransferResult {
    /// First step that recorded an error, if any.
    pub fn error_step(&self) -> Option<&TransferStep> {
        self.steps.iter().find(|s| s.state == StepState::Error)
    }

    pub fn has_error_step(&self) -> bool {
        self.error_step().is_some()
    }
}

/// Values carried by an engine progress event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventValues {
    #[serde(default)]
    pub state: String,
}

/// An opaque progress event from the bridging engine.
///
/// Consumed transiently: the progress tracker maps it to a step transition,
/// the orchestrator inspects it for mid-transfer network switching. Never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeEvent {
    pub method: String,
    #[serde(default)]
    pub values: EventValues,
}

impl BridgeEvent {
    pub fn new(method: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            values: EventValues {
                state: state.into(),
            },
        }
    }
}

/// Normalize an engine result payload.
///
/// The engine may hand back the result either as structured JSON or as a
/// serialized string; a string payload is parsed as embedded JSON.
pub fn normalize_payload(value: Value) -> Result<Value> {
    match value {
        Value::String(s) => {
            serde_json::from_str(&s).wrap_err("engine returned an unparseable result string")
        }
        other => Ok(other),
    }
}

/// Decode a normalized engine payload into a [`TransferResult`].
pub fn decode_result(value: &Value) -> Result<TransferResult> {
    serde_json::from_value(value.clone()).wrap_err("engine result did not match expected shape")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_name_roundtrip() {
        assert_eq!(StepName::Mint.as_str(), "mint");
        let parsed: StepName = serde_json::from_str("\"attestation\"").unwrap();
        assert_eq!(parsed, StepName::Attestation);
    }

    #[test]
    fn test_error_step_found_despite_success_state() {
        let result: TransferResult = serde_json::from_value(json!({
            "state": "success",
            "steps": [
                {"name": "approval", "state": "done"},
                {"name": "burn", "state": "done"},
                {"name": "attestation", "state": "done"},
                {"name": "mint", "state": "error", "errorMessage": "RPC timeout"}
            ]
        }))
        .unwrap();

        assert_eq!(result.state, ResultState::Success);
        let step = result.error_step().expect("error step");
        assert_eq!(step.name, StepName::Mint);
        assert_eq!(step.error_message.as_deref(), Some("RPC timeout"));
    }

    #[test]
    fn test_normalize_payload_parses_string() {
        let raw = Value::String("{\"state\":\"success\",\"steps\":[]}".to_string());
        let normalized = normalize_payload(raw).unwrap();
        let result = decode_result(&normalized).unwrap();
        assert_eq!(result.state, ResultState::Success);
        assert!(result.steps.is_empty());
    }

    #[test]
    fn test_normalize_payload_passes_object_through() {
        let raw = json!({"state": "pending", "steps": []});
        let normalized = normalize_payload(raw.clone()).unwrap();
        assert_eq!(normalized, raw);
    }

    #[test]
    fn test_normalize_payload_rejects_garbage_string() {
        let raw = Value::String("not json".to_string());
        assert!(normalize_payload(raw).is_err());
    }
}
