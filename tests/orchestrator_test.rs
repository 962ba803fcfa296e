//! End-to-end transfer attempt scenarios against the simulated engine

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bridge_orchestrator::chains::ChainInfo;
use bridge_orchestrator::engine::{
    BridgeEngine, Endpoint, EventHandler, SubscriptionId,
};
use bridge_orchestrator::orchestrator::Orchestrator;
use bridge_orchestrator::progress::StepKey;
use bridge_orchestrator::sim::{
    connected_wallets, test_chains, RetryOutcome, SimBehavior, SimEvmWallet, SimulatedEngine,
};
use bridge_orchestrator::types::StepName;

fn setup() -> (Arc<SimulatedEngine>, Arc<SimEvmWallet>, Orchestrator) {
    let engine = Arc::new(SimulatedEngine::new());
    let wallet = Arc::new(SimEvmWallet::new(
        "0xdead000000000000000000000000000000000000",
    ));
    let orchestrator = Orchestrator::new(
        Arc::clone(&engine) as Arc<dyn BridgeEngine>,
        connected_wallets(Arc::clone(&wallet)),
        test_chains(),
        "Ethereum_Sepolia",
    );
    (engine, wallet, orchestrator)
}

#[tokio::test]
async fn non_positive_amount_is_a_silent_noop() {
    let (engine, _wallet, orchestrator) = setup();
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");

    for amount in ["0", "-5", "", "abc", "NaN"] {
        orchestrator.submit(amount).await;
        let snapshot = orchestrator.snapshot();
        assert!(!snapshot.success, "amount {:?} set success", amount);
        assert!(!snapshot.failed, "amount {:?} set failed", amount);
        assert!(snapshot.log.is_empty(), "amount {:?} wrote logs", amount);
        assert_eq!(snapshot.current_step, StepKey::Approving);
    }
    assert_eq!(engine.bridge_calls(), 0);
}

#[tokio::test]
async fn successful_transfer_to_non_evm_skips_pre_switch() {
    let (engine, wallet, orchestrator) = setup();
    orchestrator.set_route("Ethereum_Sepolia", "Solana_Devnet");

    orchestrator.submit("100").await;

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.success);
    assert!(!snapshot.failed);
    assert_eq!(snapshot.current_step, StepKey::Completed);
    // Non-EVM destination: no network switch requested at all
    assert!(wallet.switch_requests().is_empty());
    // Amount field cleared for the next transfer
    assert_eq!(snapshot.amount, "");
    // Banner details recorded, chains under their display names
    let info = snapshot.success_info.expect("success info");
    assert_eq!(info.amount, "100");
    assert_eq!(info.source_chain, "Ethereum Sepolia");
    assert_eq!(info.destination_chain, "Solana Devnet");
    // Log ends with a completion-style message
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Transfer completed successfully")
    );
    assert_eq!(snapshot.log[0], "Bridge started");
    assert_eq!(snapshot.log[1], "Approving USDC transfer...");
    // Subscription released
    assert_eq!(engine.subscriber_count(), 0);
}

#[tokio::test]
async fn evm_destination_switches_before_and_during_mint() {
    let (_engine, wallet, orchestrator) = setup();
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");

    orchestrator.submit("25").await;

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.success);
    let switches = wallet.switch_requests();
    // Pre-transfer alignment plus the mint-phase drift correction
    assert!(switches.len() >= 2, "switches: {:?}", switches);
    assert!(switches.iter().all(|id| *id == 84532));
}

#[tokio::test]
async fn rejected_pre_switch_aborts_silently() {
    let (engine, wallet, orchestrator) = setup();
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");
    wallet.set_reject_switch(true);

    orchestrator.submit("10").await;

    let snapshot = orchestrator.snapshot();
    assert!(!snapshot.success);
    assert!(!snapshot.failed, "rejected pre-switch is not a failure");
    // Warning entry only, after the two startup log lines
    assert!(snapshot
        .log
        .iter()
        .any(|line| line.starts_with("Warning:")));
    assert!(!snapshot.log.iter().any(|line| line.starts_with("Error:")));
    // Engine never contacted
    assert_eq!(engine.bridge_calls(), 0);
}

#[tokio::test]
async fn missing_adapter_is_reported() {
    let engine = Arc::new(SimulatedEngine::new());
    let wallet = Arc::new(SimEvmWallet::new("0xabc"));
    let mut wallets = connected_wallets(Arc::clone(&wallet));
    wallets.nonevm_adapter = None;
    let orchestrator = Orchestrator::new(
        Arc::clone(&engine) as Arc<dyn BridgeEngine>,
        wallets,
        test_chains(),
        "Ethereum_Sepolia",
    );
    orchestrator.set_route("Ethereum_Sepolia", "Solana_Devnet");

    orchestrator.submit("10").await;

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.failed);
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Error: Wallet adapters not initialized. Please connect both wallets.")
    );
    assert_eq!(engine.bridge_calls(), 0);
}

#[tokio::test]
async fn recoverable_mint_failure_retries_once_and_succeeds() {
    let (engine, _wallet, orchestrator) = setup();
    engine.set_behavior(SimBehavior {
        fail_step: Some(StepName::Mint),
        fail_message: "RPC request timed out".to_string(),
        retry_outcome: RetryOutcome::Succeed,
        ..SimBehavior::default()
    });
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");

    orchestrator.submit("50").await;

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.success, "log: {:?}", snapshot.log);
    assert!(!snapshot.failed);
    assert_eq!(engine.retry_calls(), 1);
    // Both the original failure note and the after-retry completion
    assert!(snapshot
        .log
        .iter()
        .any(|line| line == "mint step failed: RPC request timed out"));
    assert!(snapshot.log.iter().any(|line| line == "Retrying transfer..."));
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Transfer completed successfully after retry")
    );
    assert_eq!(engine.subscriber_count(), 0);
}

#[tokio::test]
async fn exactly_one_retry_even_when_retry_fails_recoverably() {
    let (engine, _wallet, orchestrator) = setup();
    engine.set_behavior(SimBehavior {
        fail_step: Some(StepName::Mint),
        fail_message: "network congestion".to_string(),
        // Retry produces another recoverable-shaped failure
        retry_outcome: RetryOutcome::FailAgain,
        ..SimBehavior::default()
    });
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");

    orchestrator.submit("50").await;

    let snapshot = orchestrator.snapshot();
    assert!(!snapshot.success);
    assert!(snapshot.failed);
    assert_eq!(engine.retry_calls(), 1, "must not retry a second time");
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Error: network congestion")
    );
}

#[tokio::test]
async fn retry_transport_failure_is_logged_and_surfaced() {
    let (engine, _wallet, orchestrator) = setup();
    engine.set_behavior(SimBehavior {
        fail_step: Some(StepName::Mint),
        fail_message: "RPC node unreachable".to_string(),
        retry_outcome: RetryOutcome::Transport("engine offline".to_string()),
        ..SimBehavior::default()
    });
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");

    orchestrator.submit("50").await;

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.failed);
    assert_eq!(engine.retry_calls(), 1);
    assert!(snapshot
        .log
        .iter()
        .any(|line| line == "Retry failed: engine offline"));
    // The original step message is what gets surfaced
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Error: RPC node unreachable")
    );
}

#[tokio::test]
async fn non_recoverable_step_failure_skips_retry() {
    let (engine, _wallet, orchestrator) = setup();
    engine.set_behavior(SimBehavior {
        fail_step: Some(StepName::Burn),
        fail_message: "RPC request timed out".to_string(),
        ..SimBehavior::default()
    });
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");

    orchestrator.submit("50").await;

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.failed);
    // Matching message but wrong step: no retry
    assert_eq!(engine.retry_calls(), 0);
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Error: RPC request timed out")
    );
}

#[tokio::test]
async fn stringified_engine_payload_is_decoded() {
    let (engine, _wallet, orchestrator) = setup();
    engine.set_behavior(SimBehavior {
        stringify_result: true,
        ..SimBehavior::default()
    });
    orchestrator.set_route("Ethereum_Sepolia", "Solana_Devnet");

    orchestrator.submit("7").await;

    assert!(orchestrator.snapshot().success);
}

#[tokio::test]
async fn reset_restores_the_initial_session() {
    let (_engine, _wallet, orchestrator) = setup();
    orchestrator.set_route("Ethereum_Sepolia", "Base_Sepolia");
    orchestrator.submit("3").await;
    assert!(orchestrator.snapshot().success);

    orchestrator.reset();

    let snapshot = orchestrator.snapshot();
    assert!(!snapshot.success);
    assert!(!snapshot.failed);
    assert!(snapshot.success_info.is_none());
    assert!(snapshot.log.is_empty());
    assert_eq!(snapshot.current_step, StepKey::Approving);
    assert_eq!(snapshot.amount, "0");
    assert_eq!(snapshot.source_chain, "Ethereum_Sepolia");
    assert_eq!(snapshot.destination_chain, "");
}

#[tokio::test]
async fn swap_chains_exchanges_the_route() {
    let (_engine, _wallet, orchestrator) = setup();
    orchestrator.set_route("Ethereum_Sepolia", "Solana_Devnet");
    orchestrator.swap_chains();
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.source_chain, "Solana_Devnet");
    assert_eq!(snapshot.destination_chain, "Ethereum_Sepolia");
}

#[tokio::test]
async fn success_refreshes_the_source_balance() {
    let (_engine, _wallet, orchestrator) = setup();
    orchestrator.set_route("Ethereum_Sepolia", "Solana_Devnet");
    orchestrator.submit("1").await;
    let snapshot = orchestrator.snapshot();
    assert!(snapshot.success);
    // connected_wallets seeds the EVM adapter with 250 USDC raw
    assert_eq!(snapshot.balance, "250");
}

// ---------------------------------------------------------------------------
// Engines with result shapes the simulator does not produce
// ---------------------------------------------------------------------------

/// Engine whose transport succeeds and whose overall state claims success,
/// but with a step-level error buried in the result.
struct LyingEngine {
    subscriptions: Mutex<Vec<u64>>,
    unsubscribes: AtomicUsize,
}

impl LyingEngine {
    fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            unsubscribes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BridgeEngine for LyingEngine {
    async fn supported_chains(&self) -> eyre::Result<Vec<ChainInfo>> {
        Ok(test_chains())
    }

    fn subscribe(&self, _handler: EventHandler) -> SubscriptionId {
        let mut subs = self.subscriptions.lock().unwrap();
        let id = subs.len() as u64 + 1;
        subs.push(id);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, _id: SubscriptionId) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }

    async fn bridge(&self, _from: Endpoint, _to: Endpoint, _amount: &str) -> eyre::Result<Value> {
        Ok(json!({
            "state": "success",
            "steps": [
                {"name": "approval", "state": "done"},
                {"name": "burn", "state": "done"},
                {"name": "attestation", "state": "done"},
                {"name": "mint", "state": "error", "errorMessage": "insufficient funds"}
            ]
        }))
    }

    async fn retry(&self, _failed: &Value, _from: Endpoint, _to: Endpoint) -> eyre::Result<Value> {
        panic!("retry must not be called for a non-recoverable failure");
    }
}

#[tokio::test]
async fn transport_ok_with_error_step_classifies_as_failure() {
    let engine = Arc::new(LyingEngine::new());
    let wallet = Arc::new(SimEvmWallet::new("0xabc"));
    let orchestrator = Orchestrator::new(
        Arc::clone(&engine) as Arc<dyn BridgeEngine>,
        connected_wallets(wallet),
        test_chains(),
        "Ethereum_Sepolia",
    );
    orchestrator.set_route("Ethereum_Sepolia", "Solana_Devnet");

    orchestrator.submit("10").await;

    let snapshot = orchestrator.snapshot();
    assert!(!snapshot.success, "overall success flag must not be trusted");
    assert!(snapshot.failed);
    // "insufficient funds" on mint matches no retry trigger
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Error: insufficient funds")
    );
    // Subscription released even on the failure path
    assert_eq!(engine.unsubscribes.load(Ordering::SeqCst), 1);
}

/// Engine whose bridge call itself throws.
struct FailingEngine {
    unsubscribes: AtomicUsize,
}

#[async_trait]
impl BridgeEngine for FailingEngine {
    async fn supported_chains(&self) -> eyre::Result<Vec<ChainInfo>> {
        Ok(test_chains())
    }

    fn subscribe(&self, _handler: EventHandler) -> SubscriptionId {
        SubscriptionId(1)
    }

    fn unsubscribe(&self, _id: SubscriptionId) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }

    async fn bridge(&self, _from: Endpoint, _to: Endpoint, _amount: &str) -> eyre::Result<Value> {
        Err(eyre::eyre!("connection refused"))
    }

    async fn retry(&self, _failed: &Value, _from: Endpoint, _to: Endpoint) -> eyre::Result<Value> {
        Err(eyre::eyre!("connection refused"))
    }
}

#[tokio::test]
async fn thrown_engine_error_is_caught_and_logged() {
    let engine = Arc::new(FailingEngine {
        unsubscribes: AtomicUsize::new(0),
    });
    let wallet = Arc::new(SimEvmWallet::new("0xabc"));
    let orchestrator = Orchestrator::new(
        Arc::clone(&engine) as Arc<dyn BridgeEngine>,
        connected_wallets(wallet),
        test_chains(),
        "Ethereum_Sepolia",
    );
    orchestrator.set_route("Ethereum_Sepolia", "Solana_Devnet");

    orchestrator.submit("10").await;

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.failed);
    assert_eq!(
        snapshot.log.last().map(|s| s.as_str()),
        Some("Error: connection refused")
    );
    assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
    // Unsubscribed on the throw path too
    assert_eq!(engine.unsubscribes.load(Ordering::SeqCst), 1);
}
