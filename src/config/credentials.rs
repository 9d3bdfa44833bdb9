//! Secret material resolved at the process edge.
//!
//! Core logic never reads the environment. The binary loads `.env`, then hands
//! `std::env::var` to [`Credentials::from_lookup`] and passes the result down.

use std::fmt;

use crate::config::loader::ConfigError;
use crate::config::schema::{DeployerConfig, API_KEY_PLACEHOLDER};

/// A named private key. Never printed.
#[derive(Clone)]
pub struct AccountKey {
    pub name: String,
    pub private_key: String,
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKey")
            .field("name", &self.name)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Resolved RPC endpoint plus every signer key the run may use.
#[derive(Clone)]
pub struct Credentials {
    /// RPC URL with the API key substituted.
    pub rpc_url: String,
    /// First entry is always the deployer.
    pub accounts: Vec<AccountKey>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.accounts.iter().map(|a| a.name.as_str()).collect();
        // rpc_url may embed the API key
        f.debug_struct("Credentials")
            .field("rpc_url", &"<redacted>")
            .field("accounts", &names)
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials through `lookup` (an environment-like getter).
    pub fn from_lookup<F>(config: &DeployerConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = &config.network;
        let rpc_url = if network.needs_api_key() {
            let key = non_empty(lookup(&network.api_key_env)).ok_or_else(|| {
                ConfigError::Missing(format!(
                    "environment variable {} (RPC API key)",
                    network.api_key_env
                ))
            })?;
            network.rpc_url.replace(API_KEY_PLACEHOLDER, &key)
        } else {
            network.rpc_url.clone()
        };

        let accounts_config = &config.accounts;
        let mut accounts = Vec::with_capacity(1 + accounts_config.extra.len());
        let deployer_key = non_empty(lookup(&accounts_config.deployer_key_env)).ok_or_else(|| {
            ConfigError::Missing(format!(
                "environment variable {} (deployer private key)",
                accounts_config.deployer_key_env
            ))
        })?;
        accounts.push(AccountKey {
            name: accounts_config.deployer_name.clone(),
            private_key: deployer_key,
        });

        for (name, env_var) in &accounts_config.extra {
            let key = non_empty(lookup(env_var)).ok_or_else(|| {
                ConfigError::Missing(format!(
                    "environment variable {} (private key for account '{}')",
                    env_var, name
                ))
            })?;
            accounts.push(AccountKey {
                name: name.clone(),
                private_key: key,
            });
        }

        Ok(Self { rpc_url, accounts })
    }

    /// Resolve credentials from the process environment.
    pub fn from_env(config: &DeployerConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
