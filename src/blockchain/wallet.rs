//! Wallet management and transaction signing.
//!
//! # Security
//! - Private keys arrive through [`crate::config::Credentials`], never read here
//! - Keys are never logged or serialized
//! - Signing happens inside the provider's wallet filler

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::AccountKey;

/// A named signing account.
#[derive(Debug, Clone)]
pub struct Wallet {
    /// Name plans use to refer to this account (`@name`).
    name: String,
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `name` - Account name used in plans
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(
        name: &str,
        private_key_hex: &str,
        chain_id: u64,
    ) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let mut signer: PrivateKeySigner = key_hex.parse().map_err(|e| {
            BlockchainError::Wallet(format!("Invalid private key format for '{}': {}", name, e))
        })?;
        signer.set_chain_id(Some(chain_id));

        tracing::info!(
            account = name,
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self {
            name: name.to_string(),
            signer,
            chain_id,
        })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// Every signer available to a run. The first wallet is the default sender.
#[derive(Debug, Clone)]
pub struct Keyring {
    wallets: Vec<Wallet>,
}

impl Keyring {
    /// Build a keyring from resolved account keys (deployer first).
    pub fn from_keys(keys: &[AccountKey], chain_id: u64) -> BlockchainResult<Self> {
        if keys.is_empty() {
            return Err(BlockchainError::Wallet("No signer keys supplied".to_string()));
        }
        let wallets = keys
            .iter()
            .map(|k| Wallet::from_private_key(&k.name, &k.private_key, chain_id))
            .collect::<BlockchainResult<Vec<_>>>()?;
        Ok(Self { wallets })
    }

    pub fn default_wallet(&self) -> &Wallet {
        &self.wallets[0]
    }

    pub fn wallets(&self) -> &[Wallet] {
        &self.wallets
    }

    /// Provider-side wallet that signs for every registered address.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        let mut wallet = EthereumWallet::new(self.default_wallet().signer.clone());
        for extra in &self.wallets[1..] {
            wallet.register_signer(extra.signer.clone());
        }
        wallet
    }

    /// Public view for plan resolution: names and addresses only.
    pub fn address_book(&self) -> AccountBook {
        let mut wallets = self.wallets.iter();
        let first = wallets.next().map(|w| (w.name.clone(), w.address()));
        let (name, address) = first.unwrap_or_default();
        let mut book = AccountBook::new(&name, address);
        for wallet in wallets {
            book = book.with(wallet.name(), wallet.address());
        }
        book
    }
}

/// Named account addresses, the only signer information the orchestrator sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBook {
    entries: Vec<(String, Address)>,
}

impl AccountBook {
    /// Create a book whose default sender is `name`.
    pub fn new(name: &str, address: Address) -> Self {
        Self {
            entries: vec![(name.to_string(), address)],
        }
    }

    /// Add another named account. A repeated name replaces the earlier address.
    pub fn with(mut self, name: &str, address: Address) -> Self {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = address,
            None => self.entries.push((name.to_string(), address)),
        }
        self
    }

    /// Name of the default sender.
    pub fn default_name(&self) -> &str {
        &self.entries[0].0
    }

    pub fn default_address(&self) -> Address {
        self.entries[0].1
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| *a)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolve an optional sender name, falling back to the default account.
    pub fn sender(&self, name: Option<&str>) -> Option<Address> {
        match name {
            Some(name) => self.get(name),
            None => Some(self.default_address()),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}
