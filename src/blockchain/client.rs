//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoint(s); the primary carries the signing wallet
//! - Query chain state (block number, nonces, gas price, receipts, eth_call)
//! - Submit signed transactions through the primary provider
//! - Handle timeouts and network errors gracefully

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::TransportResult;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId, NetworkConfig};
use crate::observability::metrics;

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with read failover.
#[derive(Clone)]
pub struct BlockchainClient {
    /// Primary (wallet-bearing) provider followed by read-only failovers.
    providers: Vec<DynProvider>,
    /// Configuration.
    config: NetworkConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// # Arguments
    /// * `config` - Network configuration
    /// * `rpc_url` - Primary endpoint with any API key already substituted
    /// * `wallet` - Signers used for every outgoing transaction
    ///
    /// # Returns
    /// A new client or error if the URL is invalid. An unreachable node is
    /// reported by the first real call, not here.
    pub async fn new(
        config: NetworkConfig,
        rpc_url: &str,
        wallet: EthereumWallet,
    ) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Primary provider, signs with the supplied wallet
        let primary_url: url::Url = rpc_url
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL: {}", e)))?;
        providers.push(Arc::new(ProviderBuilder::new().wallet(wallet).connect_http(primary_url)) as DynProvider);

        // 2. Failover providers for reads
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        // Verify chain ID matches configuration
        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(chain_id = config.chain_id, "Blockchain client initialized");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Run a read against each provider in turn until one answers.
    async fn with_failover<T, F, Fut>(&self, what: &str, op: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, call = what, error = %e, "RPC error, trying next provider");
                    last_error = Some(classify_rpc_error(e.to_string()));
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, call = what, "RPC timeout, trying next provider");
                    last_error = Some(BlockchainError::Timeout(self.config.rpc_timeout_secs));
                }
            }
        }
        match last_error {
            // A revert is an answer, not an outage
            Some(err @ BlockchainError::Reverted(_)) => Err(err),
            Some(BlockchainError::Timeout(secs)) if self.providers.len() == 1 => {
                Err(BlockchainError::Timeout(secs))
            }
            Some(err) => Err(BlockchainError::Rpc(format!(
                "All RPC providers failed to {}: {}",
                what, err
            ))),
            None => Err(BlockchainError::Rpc(format!("All RPC providers failed to {}", what))),
        }
    }

    /// Run a call against the primary provider only.
    async fn on_primary<T, Fut>(&self, what: &str, fut: Fut) -> BlockchainResult<T>
    where
        Fut: IntoFuture<Output = TransportResult<T>>,
    {
        match timeout(self.timeout_duration, fut.into_future()).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(classify_rpc_error(format!("{} failed: {}", what, e))),
            Err(_) => Err(BlockchainError::Timeout(self.config.rpc_timeout_secs)),
        }
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("get chain id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get the pending transaction count (next nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.on_primary(
            "get transaction count",
            self.providers[0].get_transaction_count(address).pending(),
        )
        .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.with_failover("get receipt", |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("get gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    /// Estimate gas for a fully-formed request. Reverts surface here.
    pub async fn estimate_gas(&self, tx: TransactionRequest) -> BlockchainResult<u64> {
        self.on_primary("eth_estimateGas", self.providers[0].estimate_gas(tx))
            .await
    }

    /// Execute a read-only `eth_call`.
    pub async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        self.with_failover("eth_call", |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    /// Sign (via the wallet filler) and broadcast a transaction.
    pub async fn send(&self, tx: TransactionRequest) -> BlockchainResult<TxHash> {
        let pending = self
            .on_primary("send transaction", self.providers[0].send_transaction(tx))
            .await?;
        Ok(*pending.tx_hash())
    }

    /// Check if the blockchain is reachable and healthy.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        metrics::record_rpc_health(healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Get the number of confirmation blocks required.
    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

/// Map an RPC failure message onto the error taxonomy.
pub(crate) fn classify_rpc_error(message: String) -> BlockchainError {
    let lower = message.to_lowercase();
    if lower.contains("revert") {
        BlockchainError::Reverted(message)
    } else {
        BlockchainError::Rpc(message)
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // rpc_url is omitted: it may embed an API key
        f.debug_struct("BlockchainClient")
            .field("providers", &self.providers.len())
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;

    fn test_config() -> NetworkConfig {
        NetworkConfig {
            rpc_url: "http://localhost:1".to_string(),
            chain_id: 31337, // Anvil default
            rpc_timeout_secs: 2,
            ..NetworkConfig::default()
        }
    }

    fn test_wallet() -> EthereumWallet {
        EthereumWallet::new(PrivateKeySigner::random())
    }

    #[tokio::test]
    async fn test_client_creation_tolerates_unreachable_node() {
        let config = test_config();
        let result = BlockchainClient::new(config, "http://localhost:1", test_wallet()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let result = BlockchainClient::new(test_config(), "not a url", test_wallet()).await;
        assert!(matches!(result, Err(BlockchainError::Rpc(_))));
    }

    #[tokio::test]
    async fn test_rpc_failover() {
        let mut config = test_config();
        config.failover_urls.push("http://localhost:2".to_string());

        let client = BlockchainClient::new(config, "http://localhost:1", test_wallet())
            .await
            .unwrap();

        // Both endpoints refuse connections
        let result = client.get_chain_id().await;
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("All RPC providers failed to get chain id: "));
        // The last provider's own error is kept
        assert!(message.matches("RPC").count() >= 2, "{}", message);
        assert!(!client.is_healthy().await);
    }

    #[test]
    fn test_classify_revert() {
        let err = classify_rpc_error("server returned an error response: execution reverted: ERC5805FutureLookup".into());
        assert!(matches!(err, BlockchainError::Reverted(_)));
        let err = classify_rpc_error("connection refused".into());
        assert!(matches!(err, BlockchainError::Rpc(_)));
    }
}
