//! Chain metadata and chain-family classification
//!
//! The bridge spans two chain families: account-based EVM chains (numeric
//! chain id, wallet network switching) and a single non-EVM ledger (Solana,
//! no chain-id switching). The family predicate here decides which wallet
//! adapter serves a given chain.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::BridgeEngine;

/// Chain family: EVM vs the non-EVM ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    NonEvm,
}

impl ChainFamily {
    /// Classify a chain identifier by family.
    ///
    /// Total over all supported chain identifiers: any name mentioning the
    /// Solana ledger is non-EVM, everything else is treated as EVM.
    pub fn of(chain: &str) -> ChainFamily {
        if chain.to_lowercase().contains("solana") {
            ChainFamily::NonEvm
        } else {
            ChainFamily::Evm
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFamily::Evm => write!(f, "evm"),
            ChainFamily::NonEvm => write!(f, "non-evm"),
        }
    }
}

/// Chain metadata as reported by the engine's chain list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    /// Opaque chain identifier used in engine calls (e.g. "Ethereum_Sepolia").
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Numeric chain id for wallet network switching; EVM chains only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub is_testnet: bool,
    #[serde(rename = "type", default)]
    pub chain_type: String,
    /// Transaction explorer URL template, e.g.
    /// `https://sepolia.etherscan.io/tx/{hash}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl ChainInfo {
    pub fn family(&self) -> ChainFamily {
        ChainFamily::of(&self.chain)
    }

    /// Human-readable name, falling back to the raw identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.chain)
    }
}

/// Query the engine's supported chains and keep only testnets.
pub async fn load_testnet_chains(engine: &Arc<dyn BridgeEngine>) -> Result<Vec<ChainInfo>> {
    let all = engine.supported_chains().await?;
    let testnets: Vec<ChainInfo> = all.into_iter().filter(|c| c.is_testnet).collect();
    tracing::info!(chains = testnets.len(), "Loaded testnet chain list");
    Ok(testnets)
}

/// Map of chain identifier to display name for the success banner.
pub fn display_names(chains: &[ChainInfo]) -> HashMap<String, String> {
    chains
        .iter()
        .map(|c| (c.chain.clone(), c.display_name().to_string()))
        .collect()
}

/// EVM chains from the engine list; errors when the list has none.
pub fn evm_chains(chains: &[ChainInfo]) -> Result<Vec<ChainInfo>> {
    let evm: Vec<ChainInfo> = chains
        .iter()
        .filter(|c| c.chain_type == "evm")
        .cloned()
        .collect();
    if evm.is_empty() {
        return Err(eyre!("No EVM chains available from the engine"));
    }
    Ok(evm)
}

/// Normalize an explorer URL template to its origin.
///
/// Engine chain lists carry transaction URL templates like
/// `https://sepolia.etherscan.io/tx/{hash}`; the UI only needs the base.
pub fn explorer_base_url(template: &str) -> Option<String> {
    let stripped = template.replace("/tx/{hash}", "/").replace("{hash}", "");
    match url::Url::parse(&stripped) {
        Ok(parsed) => Some(parsed.origin().ascii_serialization()),
        Err(_) => template.split("/tx/").next().map(|s| s.to_string()),
    }
}
