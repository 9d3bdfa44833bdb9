//! Command-line surface.
//!
//! # Data Flow
//! ```text
//! argv → Cli (clap)
//!     → DeployerConfig (file, then --rpc-url / --chain-id / --artifacts)
//!     → commands.rs (build plan, connect, run, print report)
//! ```

pub mod commands;

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::config::validation::validate_config;
use crate::config::{load_config, ConfigError, DeployerConfig};
use crate::orchestrator::{OrchestratorError, PlanFailure, PlanFileError};

pub use commands::execute;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "deployer.toml";

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Plan(#[from] PlanFailure),

    #[error(transparent)]
    PlanFile(#[from] PlanFileError),

    #[error("invalid argument: {0}")]
    Usage(String),
}

#[derive(Debug, Parser)]
#[command(name = "ballot-deployer")]
#[command(about = "Deploy and drive a voting token and tokenized ballot", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the RPC endpoint (may contain {api_key})
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    #[arg(long, global = true)]
    pub chain_id: Option<u64>,

    /// Override the artifacts directory
    #[arg(long, global = true)]
    pub artifacts: Option<String>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deploy the token, snapshot the block, deploy the ballot
    Deploy {
        /// Proposal names (at most 32 bytes each)
        proposals: Vec<String>,
    },
    /// Deploy, distribute, delegate, vote and report the winner
    Demo {
        proposals: Vec<String>,

        /// Account name from the config; repeat for several voters
        #[arg(long = "voter")]
        voters: Vec<String>,

        /// Tokens minted to each voter, in base units
        #[arg(long, default_value = "1000000000000000000000")]
        amount: String,
    },
    /// Mint tokens to an address
    Mint {
        #[arg(long)]
        token: Address,
        #[arg(long)]
        to: Address,
        #[arg(long)]
        amount: String,
    },
    /// Transfer tokens
    Transfer {
        #[arg(long)]
        token: Address,
        #[arg(long)]
        to: Address,
        #[arg(long)]
        amount: String,
        /// Signing account name
        #[arg(long)]
        from: Option<String>,
    },
    /// Delegate voting power (to the signer itself by default)
    Delegate {
        #[arg(long)]
        token: Address,
        #[arg(long)]
        to: Option<Address>,
        #[arg(long)]
        from: Option<String>,
    },
    /// Cast a vote on an existing ballot
    Vote {
        #[arg(long)]
        ballot: Address,
        #[arg(long)]
        proposal: u64,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        from: Option<String>,
    },
    /// Show the winner and per-proposal tallies
    Results {
        #[arg(long)]
        ballot: Address,
        /// How many proposals to list
        #[arg(long, default_value_t = 0)]
        proposals: u64,
    },
    /// Execute a TOML plan
    Run {
        #[arg(long)]
        plan: PathBuf,
    },
    /// Validate a TOML plan without touching the chain
    Check {
        #[arg(long)]
        plan: PathBuf,
    },
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides.
    pub fn resolve_config(&self) -> Result<DeployerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                load_config(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => DeployerConfig::default(),
        };
        self.apply_overrides(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut DeployerConfig) {
        if let Some(url) = &self.rpc_url {
            config.network.rpc_url = url.clone();
        }
        if let Some(chain_id) = self.chain_id {
            config.network.chain_id = chain_id;
        }
        if let Some(dir) = &self.artifacts {
            config.artifacts.dir = dir.clone();
        }
        if self.json {
            config.observability.json = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy() {
        let cli = Cli::try_parse_from(["ballot-deployer", "deploy", "Cats", "Dogs"]).unwrap();
        match cli.command {
            Commands::Deploy { proposals } => assert_eq!(proposals, ["Cats", "Dogs"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "ballot-deployer",
            "results",
            "--ballot",
            "0x0000000000000000000000000000000000000001",
            "--rpc-url",
            "http://127.0.0.1:8545",
            "--chain-id",
            "31337",
        ])
        .unwrap();
        let mut config = DeployerConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.network.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.network.chain_id, 31337);
        assert!(!config.network.needs_api_key());
    }

    #[test]
    fn test_bad_address_rejected() {
        let result = Cli::try_parse_from(["ballot-deployer", "mint", "--token", "0x12", "--to", "0x12", "--amount", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_demo_voters() {
        let cli = Cli::try_parse_from([
            "ballot-deployer", "demo", "A", "B", "--voter", "alice", "--voter", "bob",
        ])
        .unwrap();
        match cli.command {
            Commands::Demo { voters, amount, .. } => {
                assert_eq!(voters, ["alice", "bob"]);
                assert_eq!(amount, "1000000000000000000000");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
