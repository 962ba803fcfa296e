//! USDC cross-chain transfer orchestration
//!
//! This crate drives an external multi-step bridging protocol
//! (approve → burn-on-source → attestation → mint-on-destination) and
//! surfaces its progress:
//!
//! - **Progress Tracker** - maps engine events onto a current-step pointer
//!   plus an append-only transfer log
//! - **Bridge Execution Client** - call-scoped wrapper around the engine
//!   with observable `{is_loading, error, data}` state
//! - **Transfer Orchestrator** - sequences one attempt end to end: network
//!   alignment, adapter resolution, outcome classification, and a single
//!   condition-gated retry of a failed mint
//!
//! The bridging engine, wallet adapters, and wallets are external
//! collaborators behind the traits in [`engine`]; [`sim`] provides
//! in-process implementations for local runs and tests.

pub mod api;
pub mod balance;
pub mod chains;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod sim;
pub mod types;

pub use chains::{load_testnet_chains, ChainFamily, ChainInfo};
pub use client::{BridgeClient, ClientState};
pub use config::Config;
pub use engine::{BridgeEngine, ChainAdapter, Endpoint, EventHandler, EvmWallet, TransferRequest};
pub use error::BridgeError;
pub use orchestrator::{Orchestrator, StateSnapshot, SuccessInfo, Wallets};
pub use progress::{ProgressTracker, StepBadge, StepKey};
pub use types::{BridgeEvent, ResultState, StepName, StepState, TransferResult, TransferStep};
