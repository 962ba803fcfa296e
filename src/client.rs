//! Bridge execution client
//!
//! Thin async wrapper around the bridging engine. Each call opens a wildcard
//! event subscription whose lifetime is bound exactly to the call (dropped on
//! every exit path), and maintains `{is_loading, error, data}` observable
//! state for the presentation layer.

use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::engine::{BridgeEngine, Endpoint, EventHandler, Subscription, TransferRequest};
use crate::error::BridgeError;

/// Observable call state, snapshot-cloned for readers.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub is_loading: bool,
    pub error: Option<String>,
    pub data: Option<Value>,
}

pub struct BridgeClient {
    engine: Arc<dyn BridgeEngine>,
    state: Mutex<ClientState>,
}

impl BridgeClient {
    pub fn new(engine: Arc<dyn BridgeEngine>) -> Self {
        Self {
            engine,
            state: Mutex::new(ClientState::default()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn BridgeEngine> {
        &self.engine
    }

    /// Snapshot of the observable state.
    pub fn state(&self) -> ClientState {
        self.state.lock().expect("client state lock").clone()
    }

    /// Reset error/data/loading. Idempotent; does not affect an in-flight
    /// call's outcome.
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("client state lock");
        state.error = None;
        state.data = None;
        state.is_loading = false;
    }

    /// Execute a transfer through the engine.
    ///
    /// Fails fast with `InvalidInput` when either adapter is missing, without
    /// contacting the engine. Otherwise subscribes `on_event` for the call's
    /// duration, invokes the engine, and updates observable state before
    /// returning on both paths.
    pub async fn bridge(
        &self,
        request: &TransferRequest,
        on_event: EventHandler,
    ) -> Result<Value, BridgeError> {
        self.begin_call();
        let outcome = self.run_bridge(request, on_event).await;
        self.finish_call(&outcome);
        outcome
    }

    /// Resume a failed transfer through the engine's retry operation.
    ///
    /// Same subscription-lifetime guarantee as [`BridgeClient::bridge`]. The
    /// adapters come from `request`, which the caller re-resolves at retry
    /// time rather than caching from the original attempt.
    pub async fn retry(
        &self,
        failed: &Value,
        request: &TransferRequest,
        on_event: EventHandler,
    ) -> Result<Value, BridgeError> {
        self.begin_call();
        let outcome = self.run_retry(failed, request, on_event).await;
        self.finish_call(&outcome);
        outcome
    }

    async fn run_bridge(
        &self,
        request: &TransferRequest,
        on_event: EventHandler,
    ) -> Result<Value, BridgeError> {
        let (from, to) = resolve_endpoints(request)?;

        // Subscription is dropped (and thus unsubscribed) on every exit path.
        let _subscription = Subscription::new(self.engine.as_ref(), on_event);

        self.engine
            .bridge(from, to, &request.amount)
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }

    async fn run_retry(
        &self,
        failed: &Value,
        request: &TransferRequest,
        on_event: EventHandler,
    ) -> Result<Value, BridgeError> {
        let (from, to) = resolve_endpoints(request)?;

        let _subscription = Subscription::new(self.engine.as_ref(), on_event);

        self.engine
            .retry(failed, from, to)
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))
    }

    fn begin_call(&self) {
        let mut state = self.state.lock().expect("client state lock");
        state.is_loading = true;
        state.error = None;
        state.data = None;
    }

    fn finish_call(&self, outcome: &Result<Value, BridgeError>) {
        let mut state = self.state.lock().expect("client state lock");
        state.is_loading = false;
        match outcome {
            Ok(data) => state.data = Some(data.clone()),
            Err(e) => state.error = Some(e.to_string()),
        }
    }
}

fn resolve_endpoints(request: &TransferRequest) -> Result<(Endpoint, Endpoint), BridgeError> {
    let from_adapter = request
        .from_adapter
        .clone()
        .ok_or_else(|| BridgeError::InvalidInput("Missing fromAdapter.".to_string()))?;
    let to_adapter = request
        .to_adapter
        .clone()
        .ok_or_else(|| BridgeError::InvalidInput("Missing toAdapter.".to_string()))?;

    Ok((
        Endpoint {
            adapter: from_adapter,
            chain: request.source_chain.clone(),
        },
        Endpoint {
            adapter: to_adapter,
            chain: request.destination_chain.clone(),
        },
    ))
}
