//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the deployer.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder in `rpc_url` substituted with the API key at startup.
pub const API_KEY_PLACEHOLDER: &str = "{api_key}";

/// Root configuration for the deployer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DeployerConfig {
    /// Node endpoint and transaction policy.
    pub network: NetworkConfig,

    /// Which environment variables hold signer keys.
    pub accounts: AccountsConfig,

    /// Where compiled contract artifacts live.
    pub artifacts: ArtifactsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network and transaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL. May contain `{api_key}`.
    pub rpc_url: String,

    /// Environment variable holding the RPC provider API key.
    pub api_key_env: String,

    /// Failover JSON-RPC endpoint URLs (used for reads only).
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 11155111 for Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required before a receipt counts.
    pub confirmation_blocks: u32,

    /// Upper bound on waiting for a receipt. Exceeding it fails the step.
    pub confirmation_timeout_secs: u64,

    /// First receipt poll delay in milliseconds.
    pub poll_interval_ms: u64,

    /// Cap for the receipt poll backoff in milliseconds.
    pub max_poll_interval_ms: u64,

    /// Gas price multiplier (1.0 = node quote, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: format!("https://eth-sepolia.g.alchemy.com/v2/{}", API_KEY_PLACEHOLDER),
            api_key_env: "ALCHEMY_API_KEY".to_string(),
            failover_urls: Vec::new(),
            chain_id: 11155111,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 300,
            poll_interval_ms: 1000,
            max_poll_interval_ms: 8000,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
        }
    }
}

impl NetworkConfig {
    /// Whether the RPC URL still needs an API key substituted.
    pub fn needs_api_key(&self) -> bool {
        self.rpc_url.contains(API_KEY_PLACEHOLDER)
    }
}

/// Signer accounts configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Name under which the deploying account is referenced in plans.
    pub deployer_name: String,

    /// Environment variable holding the deployer private key.
    pub deployer_key_env: String,

    /// Additional named accounts: name → environment variable with its key.
    pub extra: BTreeMap<String, String>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            deployer_name: "deployer".to_string(),
            deployer_key_env: "PRIVATE_KEY".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Contract artifact configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Root of the Hardhat (`artifacts/contracts`) or Foundry (`out`) output.
    pub dir: String,

    /// Artifact name of the voting token.
    pub token: String,

    /// Artifact name of the tokenized ballot.
    pub ballot: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: "artifacts".to_string(),
            token: "MyToken".to_string(),
            ballot: "TokenizedBallot".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
