//! Failure taxonomy for a transfer attempt
//!
//! Every failure that can surface from one orchestrated attempt is one of
//! these variants. None of them escape the orchestrator boundary: the
//! top-level catch converts them into the failed flag plus a log line.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Request was malformed before the engine was contacted.
    #[error("{0}")]
    InvalidInput(String),

    /// A wallet adapter for a required chain family is not connected.
    #[error("Wallet adapters not initialized. Please connect both wallets.")]
    MissingAdapter,

    /// The user declined a wallet network-switch prompt.
    #[error("User rejected network switch")]
    UserRejectedSwitch,

    /// A protocol step recorded an error in the engine result. Carries the
    /// step's own message verbatim; the step name is logged separately by
    /// the orchestrator.
    #[error("{0}")]
    StepFailure(String),

    /// The engine call itself threw.
    #[error("{0}")]
    Transport(String),

    /// The result did not classify as success and carried no step message.
    #[error("Bridge failed")]
    Failed,
}
