//! Transfer orchestrator
//!
//! The top-level coordinator for one transfer attempt: validates input,
//! resets progress state, aligns the wallet network, resolves per-family
//! adapters, drives the execution client, classifies the outcome, and
//! performs at most one condition-gated retry of a failed mint step.
//!
//! No failure escapes [`Orchestrator::submit`]: everything is converted into
//! the failed flag plus a human-readable log line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::balance;
use crate::chains::{self, ChainFamily, ChainInfo};
use crate::client::BridgeClient;
use crate::engine::{BridgeEngine, ChainAdapter, EventHandler, EvmWallet, TransferRequest};
use crate::error::BridgeError;
use crate::metrics;
use crate::progress::{ProgressTracker, StepKey};
use crate::types::{decode_result, normalize_payload, BridgeEvent, ResultState, StepName, TransferStep};

/// Substrings of a step error message that mark it as likely transient.
/// Case-sensitive, checked in order, first match wins.
const RECOVERY_TRIGGERS: [&str; 3] = ["RPC", "timeout", "network"];

/// A step-level failure is recoverable iff it happened on the mint step and
/// its message matches one of the retry triggers. Everything else fails the
/// attempt immediately.
pub fn is_recoverable(step: &TransferStep) -> bool {
    if step.name != StepName::Mint {
        return false;
    }
    let Some(message) = step.error_message.as_deref() else {
        return false;
    };
    RECOVERY_TRIGGERS
        .iter()
        .any(|trigger| message.contains(trigger))
}

/// Connected wallets and adapters, one slot per chain family.
#[derive(Clone, Default)]
pub struct Wallets {
    pub evm_wallet: Option<Arc<dyn EvmWallet>>,
    pub evm_adapter: Option<Arc<dyn ChainAdapter>>,
    pub nonevm_adapter: Option<Arc<dyn ChainAdapter>>,
}

impl Wallets {
    /// Adapter serving the given chain, by family.
    fn adapter_for(&self, chain: &str) -> Option<Arc<dyn ChainAdapter>> {
        match ChainFamily::of(chain) {
            ChainFamily::NonEvm => self.nonevm_adapter.clone(),
            ChainFamily::Evm => self.evm_adapter.clone(),
        }
    }
}

/// Details of a completed transfer, for the success banner. The chain fields
/// carry display names, falling back to the raw identifier for chains the
/// engine list does not name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessInfo {
    pub amount: String,
    pub source_chain: String,
    pub destination_chain: String,
}

/// Observable orchestrator state, serialized for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub current_step: StepKey,
    pub log: Vec<String>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub success: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_info: Option<SuccessInfo>,
    pub source_chain: String,
    pub destination_chain: String,
    pub amount: String,
    pub balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Terminal disposition of an attempt that did not error.
enum AttemptOutcome {
    Success,
    /// Rejected pre-transfer switch: a cancellation, not a failure.
    Aborted,
}

/// Mutable per-session state: selected route, amount field, outcome flags.
struct Session {
    source_chain: String,
    destination_chain: String,
    amount: String,
    success: bool,
    failed: bool,
    success_info: Option<SuccessInfo>,
    balance: String,
    started_at: Option<DateTime<Utc>>,
}

pub struct Orchestrator {
    client: BridgeClient,
    tracker: Arc<Mutex<ProgressTracker>>,
    wallets: RwLock<Wallets>,
    chains: Vec<ChainInfo>,
    session: Mutex<Session>,
    in_flight: AtomicBool,
    default_source_chain: String,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn BridgeEngine>,
        wallets: Wallets,
        chains: Vec<ChainInfo>,
        default_source_chain: impl Into<String>,
    ) -> Self {
        let default_source_chain = default_source_chain.into();
        Self {
            client: BridgeClient::new(engine),
            tracker: Arc::new(Mutex::new(ProgressTracker::new())),
            wallets: RwLock::new(wallets),
            chains,
            session: Mutex::new(Session {
                source_chain: default_source_chain.clone(),
                destination_chain: String::new(),
                amount: "0".to_string(),
                success: false,
                failed: false,
                success_info: None,
                balance: "0".to_string(),
                started_at: None,
            }),
            in_flight: AtomicBool::new(false),
            default_source_chain,
        }
    }

    pub fn chains(&self) -> &[ChainInfo] {
        &self.chains
    }

    /// Whether an attempt is currently in flight. Used by the presentation
    /// boundary to reject concurrent submissions; the core itself does not
    /// enforce mutual exclusion.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Replace the connected wallet set, e.g. after a reconnect.
    pub fn set_wallets(&self, wallets: Wallets) {
        *self.wallets.write().expect("wallets lock") = wallets;
    }

    pub fn set_route(&self, source_chain: impl Into<String>, destination_chain: impl Into<String>) {
        let mut session = self.session.lock().expect("session lock");
        session.source_chain = source_chain.into();
        session.destination_chain = destination_chain.into();
    }

    /// Exchange source and destination.
    pub fn swap_chains(&self) {
        let mut session = self.session.lock().expect("session lock");
        let session = &mut *session;
        std::mem::swap(&mut session.source_chain, &mut session.destination_chain);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let session = self.session.lock().expect("session lock");
        let tracker = self.tracker.lock().expect("progress lock");
        let client = self.client.state();
        StateSnapshot {
            current_step: tracker.current(),
            log: tracker.log().to_vec(),
            is_loading: self.is_in_flight() || client.is_loading,
            error: client.error,
            success: session.success,
            failed: session.failed,
            success_info: session.success_info.clone(),
            source_chain: session.source_chain.clone(),
            destination_chain: session.destination_chain.clone(),
            amount: session.amount.clone(),
            balance: session.balance.clone(),
            started_at: session.started_at,
        }
    }

    /// Reset everything back to the initial session: tracker, client state,
    /// flags, banner, amount, and the default route.
    pub fn reset(&self) {
        self.tracker.lock().expect("progress lock").reset();
        self.client.clear();
        let mut session = self.session.lock().expect("session lock");
        session.source_chain = self.default_source_chain.clone();
        session.destination_chain.clear();
        session.amount = "0".to_string();
        session.success = false;
        session.failed = false;
        session.success_info = None;
        session.started_at = None;
    }

    /// Re-query the source-chain USDC balance and cache it in the session.
    pub async fn refresh_balance(&self) -> String {
        let source_chain = {
            let session = self.session.lock().expect("session lock");
            session.source_chain.clone()
        };
        let adapter = {
            let wallets = self.wallets.read().expect("wallets lock");
            wallets.adapter_for(&source_chain)
        };
        let balance = balance::fetch_balance(adapter.as_ref(), &source_chain).await;
        self.session.lock().expect("session lock").balance = balance.clone();
        balance
    }

    /// Run one transfer attempt for the given amount.
    ///
    /// A non-positive or unparseable amount is a silent no-op: no state
    /// change, no log entry. Every other outcome ends with either the
    /// success flag, the failed flag, or a logged cancellation.
    pub async fn submit(&self, amount: &str) {
        let amount = amount.trim();
        let valid = amount
            .parse::<f64>()
            .map(|v| v.is_finite() && v > 0.0)
            .unwrap_or(false);
        if !valid {
            return;
        }

        let (source_chain, destination_chain) = {
            let mut session = self.session.lock().expect("session lock");
            session.success = false;
            session.failed = false;
            session.success_info = None;
            session.amount = amount.to_string();
            session.started_at = Some(Utc::now());
            (
                session.source_chain.clone(),
                session.destination_chain.clone(),
            )
        };

        {
            let mut tracker = self.tracker.lock().expect("progress lock");
            tracker.reset();
            tracker.set_current_step(StepKey::Approving);
            tracker.add_log("Bridge started");
            tracker.add_log("Approving USDC transfer...");
        }

        tracing::info!(%amount, source = %source_chain, destination = %destination_chain, "Bridge started");
        metrics::record_attempt_started(&source_chain, &destination_chain);
        self.in_flight.store(true, Ordering::SeqCst);
        let started = Instant::now();

        let outcome = self
            .run_attempt(amount, &source_chain, &destination_chain)
            .await;

        self.in_flight.store(false, Ordering::SeqCst);
        metrics::record_attempt_duration(started.elapsed().as_secs_f64());

        match outcome {
            Ok(AttemptOutcome::Success) => {
                tracing::info!(source = %source_chain, destination = %destination_chain, "Bridge completed");
                metrics::record_attempt_succeeded(&source_chain, &destination_chain);
            }
            Ok(AttemptOutcome::Aborted) => {
                metrics::record_attempt_aborted(&source_chain, &destination_chain);
            }
            Err(e) => {
                tracing::error!(error = %e, "Bridge attempt failed");
                metrics::record_attempt_failed(&source_chain, &destination_chain);
                self.session.lock().expect("session lock").failed = true;
                self.tracker
                    .lock()
                    .expect("progress lock")
                    .add_log(format!("Error: {}", e));
            }
        }
    }

    async fn run_attempt(
        &self,
        amount: &str,
        source_chain: &str,
        destination_chain: &str,
    ) -> Result<AttemptOutcome, BridgeError> {
        let destination = self
            .chains
            .iter()
            .find(|c| c.chain == destination_chain)
            .cloned();
        let wallets = self.wallets.read().expect("wallets lock").clone();

        // Pre-transfer network alignment. The destination switch is requested
        // before the engine call, i.e. before the burn even begins; kept as
        // the product defined it (primes the wallet UI for the mint phase).
        if let Some(dest) = &destination {
            if dest.family() == ChainFamily::Evm {
                if let (Some(wallet), Some(chain_id)) = (wallets.evm_wallet.as_ref(), dest.chain_id)
                {
                    if let Err(e) = wallet.switch_network(chain_id).await {
                        metrics::record_network_switch("pre-transfer", false);
                        tracing::warn!(error = %e, chain_id, "Network switch rejected, cancelling attempt");
                        self.tracker
                            .lock()
                            .expect("progress lock")
                            .add_log(format!("Warning: {}", e));
                        return Ok(AttemptOutcome::Aborted);
                    }
                    metrics::record_network_switch("pre-transfer", true);
                }
            }
        }

        let from_adapter = wallets.adapter_for(source_chain);
        let to_adapter = wallets.adapter_for(destination_chain);
        if from_adapter.is_none() || to_adapter.is_none() {
            return Err(BridgeError::MissingAdapter);
        }

        let on_event = self.event_handler(
            wallets.evm_wallet.clone(),
            destination.as_ref().and_then(|d| d.chain_id),
        );

        let request = TransferRequest {
            source_chain: source_chain.to_string(),
            destination_chain: destination_chain.to_string(),
            amount: amount.to_string(),
            from_adapter,
            to_adapter,
        };

        let payload = self.client.bridge(&request, on_event.clone()).await?;
        let payload = normalize_payload(payload).map_err(|e| BridgeError::Transport(e.to_string()))?;
        let result = decode_result(&payload).map_err(|e| BridgeError::Transport(e.to_string()))?;

        // Success needs all three: the transport reported ok (we got here
        // without an error), no step recorded an error, and the overall
        // state is success. The engine can report ok with a failed step.
        if !result.has_error_step() && result.state == ResultState::Success {
            self.finish_success(source_chain, destination_chain, amount)
                .await;
            return Ok(AttemptOutcome::Success);
        }

        let error_step = result.error_step().cloned();

        if let Some(step) = error_step.as_ref().filter(|s| is_recoverable(s)) {
            let message = step.error_message.as_deref().unwrap_or_default();
            {
                let mut tracker = self.tracker.lock().expect("progress lock");
                tracker.add_log(format!("{} step failed: {}", step.name, message));
                tracker.add_log("Retrying transfer...");
            }
            tracing::warn!(step = %step.name, %message, "Recoverable mint failure, retrying once");

            if self
                .run_retry(&payload, amount, source_chain, destination_chain, on_event)
                .await
            {
                return Ok(AttemptOutcome::Success);
            }
            // Exactly one retry: fall through to the failure report.
        }

        Err(match error_step {
            Some(step) => BridgeError::StepFailure(
                step.error_message
                    .unwrap_or_else(|| "Bridge failed".to_string()),
            ),
            None => BridgeError::Failed,
        })
    }

    /// One retry of a failed transfer. Returns true when the retry settled
    /// as a success; logs and returns false otherwise.
    async fn run_retry(
        &self,
        failed_payload: &serde_json::Value,
        amount: &str,
        source_chain: &str,
        destination_chain: &str,
        on_event: EventHandler,
    ) -> bool {
        // Adapters are re-resolved from the current wallet set, not reused
        // from the original attempt; a wallet may have reconnected since.
        let wallets = self.wallets.read().expect("wallets lock").clone();
        let from_adapter = wallets.adapter_for(source_chain);
        let to_adapter = wallets.adapter_for(destination_chain);
        if from_adapter.is_none() || to_adapter.is_none() {
            self.tracker
                .lock()
                .expect("progress lock")
                .add_log("Retry failed: Wallet adapters not available for retry");
            metrics::record_retry(false);
            return false;
        }

        let retry_request = TransferRequest {
            source_chain: source_chain.to_string(),
            destination_chain: destination_chain.to_string(),
            amount: amount.to_string(),
            from_adapter,
            to_adapter,
        };

        let retry_result = match self
            .client
            .retry(failed_payload, &retry_request, on_event)
            .await
        {
            Ok(payload) => normalize_payload(payload).and_then(|v| decode_result(&v)),
            Err(e) => {
                self.tracker
                    .lock()
                    .expect("progress lock")
                    .add_log(format!("Retry failed: {}", e));
                metrics::record_retry(false);
                return false;
            }
        };

        match retry_result {
            Ok(result) if !result.has_error_step() && result.state == ResultState::Success => {
                metrics::record_retry(true);
                self.finish_success(source_chain, destination_chain, amount)
                    .await;
                self.tracker
                    .lock()
                    .expect("progress lock")
                    .add_log("Transfer completed successfully after retry");
                true
            }
            Ok(_) => {
                metrics::record_retry(false);
                false
            }
            Err(e) => {
                self.tracker
                    .lock()
                    .expect("progress lock")
                    .add_log(format!("Retry failed: {}", e));
                metrics::record_retry(false);
                false
            }
        }
    }

    async fn finish_success(&self, source_chain: &str, destination_chain: &str, amount: &str) {
        let names = chains::display_names(&self.chains);
        let display = |chain: &str| {
            names
                .get(chain)
                .cloned()
                .unwrap_or_else(|| chain.to_string())
        };
        {
            let mut session = self.session.lock().expect("session lock");
            session.success = true;
            session.failed = false;
            session.success_info = Some(SuccessInfo {
                amount: amount.to_string(),
                source_chain: display(source_chain),
                destination_chain: display(destination_chain),
            });
            session.amount.clear();
        }
        self.refresh_balance().await;
    }

    /// Build the event relay for one attempt: forwards every event to the
    /// progress tracker and, while the mint step is in progress, re-requests
    /// the destination network switch in case the wallet drifted after the
    /// pre-transfer alignment. Switch failures here only warn; minting can
    /// proceed with a manual switch by the user.
    fn event_handler(
        &self,
        evm_wallet: Option<Arc<dyn EvmWallet>>,
        destination_chain_id: Option<u64>,
    ) -> EventHandler {
        let tracker = Arc::clone(&self.tracker);
        Arc::new(move |evt: BridgeEvent| {
            let tracker = Arc::clone(&tracker);
            let wallet = evm_wallet.clone();
            Box::pin(async move {
                metrics::record_engine_event(&evt.method, &evt.values.state);
                tracker.lock().expect("progress lock").handle_event(&evt);

                let non_terminal =
                    evt.values.state != "success" && evt.values.state != "error";
                if evt.method == "mint" && non_terminal {
                    if let (Some(wallet), Some(chain_id)) = (wallet, destination_chain_id) {
                        match wallet.switch_network(chain_id).await {
                            Ok(()) => metrics::record_network_switch("mint", true),
                            Err(e) => {
                                metrics::record_network_switch("mint", false);
                                tracing::warn!(error = %e, chain_id, "Network switch during mint failed, continuing");
                            }
                        }
                    }
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepState;

    fn step(name: StepName, message: Option<&str>) -> TransferStep {
        TransferStep {
            name,
            state: StepState::Error,
            error_message: message.map(|m| m.to_string()),
        }
    }

    #[test]
    fn test_recoverable_mint_rpc_timeout() {
        assert!(is_recoverable(&step(StepName::Mint, Some("RPC timeout"))));
        assert!(is_recoverable(&step(StepName::Mint, Some("network error"))));
        assert!(is_recoverable(&step(
            StepName::Mint,
            Some("RPC request timed out")
        )));
    }

    #[test]
    fn test_not_recoverable_wrong_step() {
        assert!(!is_recoverable(&step(StepName::Burn, Some("RPC timeout"))));
        assert!(!is_recoverable(&step(
            StepName::Attestation,
            Some("timeout")
        )));
    }

    #[test]
    fn test_not_recoverable_wrong_message() {
        assert!(!is_recoverable(&step(
            StepName::Mint,
            Some("insufficient funds")
        )));
        assert!(!is_recoverable(&step(StepName::Mint, None)));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!is_recoverable(&step(StepName::Mint, Some("rpc down"))));
        assert!(!is_recoverable(&step(StepName::Mint, Some("Timeout"))));
        assert!(is_recoverable(&step(StepName::Mint, Some("Network timeout"))));
    }
}
