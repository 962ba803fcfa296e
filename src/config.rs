//! Configuration for the orchestrator service
//!
//! Loaded from environment variables, with a `.env` file honored when
//! present. Everything has a sensible default for local runs.

use eyre::{eyre, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub bridge: BridgeSettings,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Sustained requests per second allowed on mutating routes
    #[serde(default = "default_rate_per_second")]
    pub rate_per_second: u64,
    #[serde(default = "default_rate_burst")]
    pub rate_burst: u32,
}

/// Transfer orchestration configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeSettings {
    /// Route preselected on startup and restored by reset
    #[serde(default = "default_source_chain")]
    pub default_source_chain: String,
    /// Pause between protocol steps in the simulated engine
    #[serde(default = "default_sim_step_delay")]
    pub sim_step_delay_ms: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_rate_per_second() -> u64 {
    2
}

fn default_rate_burst() -> u32 {
    5
}

fn default_source_chain() -> String {
    "Ethereum_Sepolia".to_string()
}

fn default_sim_step_delay() -> u64 {
    400
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        if Path::new(".env").exists() {
            dotenvy::from_filename(".env").ok();
        }
        Self::load_from_env()
    }

    fn load_from_env() -> Result<Self> {
        let api = ApiConfig {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| default_bind_address()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_port),
            rate_per_second: env::var("RATE_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_rate_per_second),
            rate_burst: env::var("RATE_BURST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_rate_burst),
        };

        let bridge = BridgeSettings {
            default_source_chain: env::var("DEFAULT_SOURCE_CHAIN")
                .unwrap_or_else(|_| default_source_chain()),
            sim_step_delay_ms: env::var("SIM_STEP_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_sim_step_delay),
        };

        let config = Config { api, bridge };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api.bind_address.is_empty() {
            return Err(eyre!("api.bind_address cannot be empty"));
        }
        if self.api.port == 0 {
            return Err(eyre!("api.port cannot be 0"));
        }
        if self.bridge.default_source_chain.is_empty() {
            return Err(eyre!("bridge.default_source_chain cannot be empty"));
        }
        if self.api.rate_per_second == 0 || self.api.rate_burst == 0 {
            return Err(eyre!("rate limit settings must be non-zero"));
        }
        Ok(())
    }
}
