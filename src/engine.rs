//! Trait seams for the external collaborators
//!
//! The bridging engine, per-chain wallet adapters, and the EVM wallet are
//! external to this crate: they execute the actual on-chain protocol and sign
//! transactions. The orchestrator only ever talks to them through these
//! traits.

use async_trait::async_trait;
use eyre::Result;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use crate::chains::ChainInfo;
use crate::error::BridgeError;
use crate::types::BridgeEvent;

/// Async callback invoked for every engine progress event.
///
/// The handler may itself suspend (e.g. for a mid-transfer network switch);
/// the engine is not required to wait for that suspension before emitting
/// further events.
pub type EventHandler = Arc<dyn Fn(BridgeEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle for a wildcard event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// One side of a transfer route: a chain identifier plus the adapter that
/// signs on it.
#[derive(Clone)]
pub struct Endpoint {
    pub adapter: Arc<dyn ChainAdapter>,
    pub chain: String,
}

/// The external bridging engine.
///
/// Executes the actual approve/burn/attest/mint protocol and emits wildcard
/// progress events to subscribed handlers for the duration of a call.
#[async_trait]
pub trait BridgeEngine: Send + Sync {
    /// Chain list as the engine knows it.
    async fn supported_chains(&self) -> Result<Vec<ChainInfo>>;

    /// Register a wildcard event handler. Must be paired with
    /// [`BridgeEngine::unsubscribe`]; use [`Subscription`] to bind the pair
    /// to a scope.
    fn subscribe(&self, handler: EventHandler) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Execute a full transfer. The returned payload is the engine's
    /// transfer result, possibly as a serialized string
    /// (see [`crate::types::normalize_payload`]).
    async fn bridge(&self, from: Endpoint, to: Endpoint, amount: &str) -> Result<Value>;

    /// Resume a previously failed transfer from its failed result.
    ///
    /// Takes the *current* endpoints rather than the ones from the original
    /// attempt: a wallet may have reconnected in between.
    async fn retry(&self, failed: &Value, from: Endpoint, to: Endpoint) -> Result<Value>;
}

/// A per-chain wallet adapter: signs and submits transactions for one chain
/// family, and answers balance queries.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Connected address, if any.
    fn address(&self) -> Option<String>;

    /// USDC balance for (chain, address) as a raw integer string,
    /// interpreted at 6 decimal places.
    async fn usdc_balance(&self, chain: &str, address: &str) -> Result<String>;
}

/// The connected EVM wallet, for network switching.
#[async_trait]
pub trait EvmWallet: Send + Sync {
    fn address(&self) -> Option<String>;

    /// Ask the wallet to switch its active network. May fail with
    /// [`BridgeError::UserRejectedSwitch`] when the user denies the prompt.
    async fn switch_network(&self, chain_id: u64) -> std::result::Result<(), BridgeError>;
}

/// Scoped wildcard subscription.
///
/// Unsubscribes on drop, so the subscription's lifetime is bound exactly to
/// the scope that created it, on every exit path.
pub struct Subscription<'a> {
    engine: &'a dyn BridgeEngine,
    id: SubscriptionId,
}

impl<'a> Subscription<'a> {
    pub fn new(engine: &'a dyn BridgeEngine, handler: EventHandler) -> Self {
        let id = engine.subscribe(handler);
        Self { engine, id }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.engine.unsubscribe(self.id);
    }
}

/// A transfer request as submitted to the execution client.
///
/// Immutable once submitted; constructed fresh per attempt. Retry builds a
/// new request with re-resolved adapters rather than reusing this one.
#[derive(Clone)]
pub struct TransferRequest {
    pub source_chain: String,
    pub destination_chain: String,
    pub amount: String,
    pub from_adapter: Option<Arc<dyn ChainAdapter>>,
    pub to_adapter: Option<Arc<dyn ChainAdapter>>,
}
