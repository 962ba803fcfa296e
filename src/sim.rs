//! Simulated bridging engine and wallets
//!
//! An in-process stand-in for the external collaborators, used for local
//! runs of the binary and by the test suite. Emits the four-step event
//! sequence the real engine emits, with programmable step failure, retry
//! outcome, and wallet switch rejection.

use async_trait::async_trait;
use eyre::{eyre, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::chains::ChainInfo;
use crate::engine::{BridgeEngine, ChainAdapter, Endpoint, EventHandler, EvmWallet, SubscriptionId};
use crate::error::BridgeError;
use crate::orchestrator::Wallets;
use crate::types::{BridgeEvent, StepName};

/// Protocol steps in order, with the method string each one events as.
const PROTOCOL_STEPS: [(StepName, &str); 4] = [
    (StepName::Approval, "approve"),
    (StepName::Burn, "burn"),
    (StepName::Attestation, "attestation"),
    (StepName::Mint, "mint"),
];

/// What the engine's retry operation should do.
#[derive(Debug, Clone)]
pub enum RetryOutcome {
    /// Mint completes; result settles as success.
    Succeed,
    /// Mint errors again with the same message.
    FailAgain,
    /// The retry call itself throws.
    Transport(String),
}

/// Programmable engine behavior for one scenario.
#[derive(Debug, Clone)]
pub struct SimBehavior {
    /// Step that records an error instead of completing, if any.
    pub fail_step: Option<StepName>,
    pub fail_message: String,
    pub retry_outcome: RetryOutcome,
    /// Hand the result back as a serialized JSON string instead of a value.
    pub stringify_result: bool,
    /// Pause between protocol steps, for demo runs.
    pub step_delay: Duration,
}

impl Default for SimBehavior {
    fn default() -> Self {
        Self {
            fail_step: None,
            fail_message: "RPC request timed out".to_string(),
            retry_outcome: RetryOutcome::Succeed,
            stringify_result: false,
            step_delay: Duration::ZERO,
        }
    }
}

pub struct SimulatedEngine {
    chains: Vec<ChainInfo>,
    behavior: Mutex<SimBehavior>,
    subscribers: Mutex<HashMap<u64, EventHandler>>,
    next_id: AtomicU64,
    bridge_calls: AtomicU64,
    retry_calls: AtomicU64,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::with_chains(test_chains())
    }

    pub fn with_chains(chains: Vec<ChainInfo>) -> Self {
        Self {
            chains,
            behavior: Mutex::new(SimBehavior::default()),
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            bridge_calls: AtomicU64::new(0),
            retry_calls: AtomicU64::new(0),
        }
    }

    pub fn bridge_calls(&self) -> u64 {
        self.bridge_calls.load(Ordering::SeqCst)
    }

    pub fn retry_calls(&self) -> u64 {
        self.retry_calls.load(Ordering::SeqCst)
    }

    pub fn set_behavior(&self, behavior: SimBehavior) {
        *self.behavior.lock().expect("behavior lock") = behavior;
    }

    /// Live wildcard subscriptions. Zero between calls when every caller
    /// honored the scoped-subscription contract.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("subscribers lock").len()
    }

    async fn emit(&self, method: &str, state: &str) {
        let handlers: Vec<EventHandler> = self
            .subscribers
            .lock()
            .expect("subscribers lock")
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            handler(BridgeEvent::new(method, state)).await;
        }
    }

    fn behavior(&self) -> SimBehavior {
        self.behavior.lock().expect("behavior lock").clone()
    }

    fn finalize(&self, result: Value, stringify: bool) -> Value {
        if stringify {
            Value::String(result.to_string())
        } else {
            result
        }
    }
}

/// Build a result payload: steps up to (not including) `failed_at` are done,
/// the failing step carries the error, later steps stay pending.
fn build_result(failed_at: Option<StepName>, message: &str) -> Value {
    let mut steps = Vec::new();
    let mut reached_failure = false;
    for (name, _) in PROTOCOL_STEPS {
        let step = if Some(name) == failed_at {
            reached_failure = true;
            json!({"name": name, "state": "error", "errorMessage": message})
        } else if reached_failure {
            json!({"name": name, "state": "pending"})
        } else {
            json!({"name": name, "state": "done"})
        };
        steps.push(step);
    }
    let state = if failed_at.is_some() { "error" } else { "success" };
    json!({"state": state, "steps": steps})
}

#[async_trait]
impl BridgeEngine for SimulatedEngine {
    async fn supported_chains(&self) -> Result<Vec<ChainInfo>> {
        Ok(self.chains.clone())
    }

    fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .lock()
            .expect("subscribers lock")
            .insert(id, handler);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .expect("subscribers lock")
            .remove(&id.0);
    }

    async fn bridge(&self, from: Endpoint, to: Endpoint, amount: &str) -> Result<Value> {
        self.bridge_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior();
        tracing::debug!(
            source = %from.chain,
            destination = %to.chain,
            %amount,
            "Simulated bridge starting"
        );

        for (name, method) in PROTOCOL_STEPS {
            if behavior.step_delay > Duration::ZERO {
                tokio::time::sleep(behavior.step_delay).await;
            }
            self.emit(method, "pending").await;
            if behavior.fail_step == Some(name) {
                self.emit(method, "error").await;
                let result = build_result(Some(name), &behavior.fail_message);
                return Ok(self.finalize(result, behavior.stringify_result));
            }
            self.emit(method, "success").await;
        }

        let result = build_result(None, "");
        Ok(self.finalize(result, behavior.stringify_result))
    }

    async fn retry(&self, _failed: &Value, _from: Endpoint, _to: Endpoint) -> Result<Value> {
        self.retry_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior();
        match behavior.retry_outcome {
            RetryOutcome::Succeed => {
                self.emit("mint", "pending").await;
                self.emit("mint", "success").await;
                let result = build_result(None, "");
                Ok(self.finalize(result, behavior.stringify_result))
            }
            RetryOutcome::FailAgain => {
                self.emit("mint", "pending").await;
                self.emit("mint", "error").await;
                let result = build_result(Some(StepName::Mint), &behavior.fail_message);
                Ok(self.finalize(result, behavior.stringify_result))
            }
            RetryOutcome::Transport(message) => Err(eyre!(message)),
        }
    }
}

/// Simulated EVM wallet with a togglable switch-rejection prompt.
pub struct SimEvmWallet {
    address: String,
    reject_switch: AtomicBool,
    switches: Mutex<Vec<u64>>,
}

impl SimEvmWallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            reject_switch: AtomicBool::new(false),
            switches: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reject_switch(&self, reject: bool) {
        self.reject_switch.store(reject, Ordering::SeqCst);
    }

    /// Chain ids of every switch request received, in order.
    pub fn switch_requests(&self) -> Vec<u64> {
        self.switches.lock().expect("switches lock").clone()
    }
}

#[async_trait]
impl EvmWallet for SimEvmWallet {
    fn address(&self) -> Option<String> {
        Some(self.address.clone())
    }

    async fn switch_network(&self, chain_id: u64) -> std::result::Result<(), BridgeError> {
        if self.reject_switch.load(Ordering::SeqCst) {
            return Err(BridgeError::UserRejectedSwitch);
        }
        self.switches.lock().expect("switches lock").push(chain_id);
        Ok(())
    }
}

/// Simulated per-family adapter holding a fixed address and balance.
pub struct SimAdapter {
    address: Option<String>,
    balance_raw: Mutex<String>,
}

impl SimAdapter {
    pub fn new(address: impl Into<String>, balance_raw: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            balance_raw: Mutex::new(balance_raw.into()),
        }
    }

    pub fn set_balance(&self, raw: impl Into<String>) {
        *self.balance_raw.lock().expect("balance lock") = raw.into();
    }
}

#[async_trait]
impl ChainAdapter for SimAdapter {
    fn address(&self) -> Option<String> {
        self.address.clone()
    }

    async fn usdc_balance(&self, _chain: &str, _address: &str) -> Result<String> {
        Ok(self.balance_raw.lock().expect("balance lock").clone())
    }
}

/// Testnet chain list matching what the engine reports.
pub fn test_chains() -> Vec<ChainInfo> {
    vec![
        ChainInfo {
            chain: "Ethereum_Sepolia".to_string(),
            name: Some("Ethereum Sepolia".to_string()),
            chain_id: Some(11155111),
            is_testnet: true,
            chain_type: "evm".to_string(),
            explorer_url: Some("https://sepolia.etherscan.io/tx/{hash}".to_string()),
        },
        ChainInfo {
            chain: "Base_Sepolia".to_string(),
            name: Some("Base Sepolia".to_string()),
            chain_id: Some(84532),
            is_testnet: true,
            chain_type: "evm".to_string(),
            explorer_url: Some("https://sepolia.basescan.org/tx/{hash}".to_string()),
        },
        ChainInfo {
            chain: "Avalanche_Fuji".to_string(),
            name: Some("Avalanche Fuji".to_string()),
            chain_id: Some(43113),
            is_testnet: true,
            chain_type: "evm".to_string(),
            explorer_url: Some("https://testnet.snowtrace.io/tx/{hash}".to_string()),
        },
        ChainInfo {
            chain: "Solana_Devnet".to_string(),
            name: Some("Solana Devnet".to_string()),
            chain_id: None,
            is_testnet: true,
            chain_type: "solana".to_string(),
            explorer_url: Some("https://explorer.solana.com/tx/{hash}?cluster=devnet".to_string()),
        },
    ]
}

/// A fully-connected wallet set backed by the simulated adapters.
pub fn connected_wallets(wallet: Arc<SimEvmWallet>) -> Wallets {
    Wallets {
        evm_wallet: Some(wallet),
        evm_adapter: Some(Arc::new(SimAdapter::new(
            "0xdead000000000000000000000000000000000000",
            "250000000",
        ))),
        nonevm_adapter: Some(Arc::new(SimAdapter::new(
            "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin",
            "100000000",
        ))),
    }
}
