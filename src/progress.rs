//! Progress tracker for a transfer attempt
//!
//! A small state machine mapping engine progress events onto a current-step
//! pointer plus an append-only log. The mapping from events to transitions is
//! pure and defensive: unrecognized event methods are ignored so future
//! engine versions cannot break the display.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{BridgeEvent, StepName};

/// User-facing position within the transfer protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKey {
    Approving,
    Burning,
    WaitingAttestation,
    Minting,
    Completed,
    Error,
}

impl StepKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKey::Approving => "approving",
            StepKey::Burning => "burning",
            StepKey::WaitingAttestation => "waiting-attestation",
            StepKey::Minting => "minting",
            StepKey::Completed => "completed",
            StepKey::Error => "error",
        }
    }

    /// Position in the protocol order; terminal states rank past the steps.
    fn rank(&self) -> usize {
        match self {
            StepKey::Approving => 0,
            StepKey::Burning => 1,
            StepKey::WaitingAttestation => 2,
            StepKey::Minting => 3,
            StepKey::Completed => 4,
            StepKey::Error => 5,
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fixed 4-step display, in protocol order, with the step key each
/// display slot corresponds to.
pub const DISPLAY_STEPS: [(StepName, StepKey); 4] = [
    (StepName::Approval, StepKey::Approving),
    (StepName::Burn, StepKey::Burning),
    (StepName::Attestation, StepKey::WaitingAttestation),
    (StepName::Mint, StepKey::Minting),
];

/// Derived badge state for one slot of the 4-step display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepBadge {
    Pending,
    Active,
    Done,
    Completed,
    Error,
}

/// Tracks the current step and the transfer log for one attempt.
///
/// Owned exclusively by the orchestrator side; mutated via explicit calls
/// (`set_current_step`, `add_log`) and engine events (`handle_event`).
/// Created or reset at the start of every attempt.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    current: StepKey,
    log: Vec<String>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            current: StepKey::Approving,
            log: Vec::new(),
        }
    }

    pub fn current(&self) -> StepKey {
        self.current
    }

    /// Append-only log, insertion order significant.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Clear the log and return to the initial step.
    pub fn reset(&mut self) {
        self.log.clear();
        self.current = StepKey::Approving;
    }

    /// Unconditionally overwrite the current step. Used for steps the
    /// orchestrator initiates before any engine event exists.
    pub fn set_current_step(&mut self, key: StepKey) {
        self.current = key;
    }

    pub fn add_log(&mut self, message: impl Into<String>) {
        self.log.push(message.into());
    }

    /// Apply an engine progress event.
    ///
    /// Advances the current step forward only (an earlier step never regresses
    /// a later one within an attempt), except a terminal `error` which wins
    /// regardless of position. A terminal success on the final step marks the
    /// whole transfer completed. Unknown methods are a no-op.
    pub fn handle_event(&mut self, evt: &BridgeEvent) {
        let Some(key) = step_key_for_method(&evt.method) else {
            tracing::debug!(method = %evt.method, "Ignoring unrecognized engine event");
            return;
        };

        self.add_log(format!("{}: {}", evt.method, evt.values.state));

        match evt.values.state.as_str() {
            "error" => {
                self.current = StepKey::Error;
            }
            "success" if key == StepKey::Minting => {
                self.current = StepKey::Completed;
                self.add_log("Transfer completed successfully");
            }
            _ => {
                if key.rank() > self.current.rank() {
                    self.current = key;
                }
            }
        }
    }

    /// Badge state for a slot of the fixed 4-step display.
    pub fn badge(&self, index: usize) -> StepBadge {
        if self.current == StepKey::Completed {
            return StepBadge::Completed;
        }
        if self.current == StepKey::Error {
            return StepBadge::Error;
        }
        let current_index = DISPLAY_STEPS
            .iter()
            .position(|(_, key)| *key == self.current);
        match current_index {
            Some(c) if c == index => StepBadge::Active,
            Some(c) if c > index => StepBadge::Done,
            _ => StepBadge::Pending,
        }
    }
}

/// Map an engine event method onto a step key.
///
/// Total and defensive: anything unrecognized maps to `None`.
fn step_key_for_method(method: &str) -> Option<StepKey> {
    match method {
        "approve" | "approval" => Some(StepKey::Approving),
        "burn" => Some(StepKey::Burning),
        "attestation" => Some(StepKey::WaitingAttestation),
        "mint" => Some(StepKey::Minting),
        _ => None,
    }
}
