//! Transaction building, signing, and confirmation monitoring.
//!
//! # Responsibilities
//! - Fill nonce, gas price and gas limit under the configured policy
//! - Broadcast through the wallet-bearing provider
//! - Monitor confirmations with a hard deadline

use std::time::{Duration, Instant};

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::TransactionRequest;
use tokio::time::{sleep, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus, Receipt};
use crate::observability::metrics;
use crate::resilience::PollSchedule;

/// Headroom added on top of `eth_estimateGas`, in percent.
const GAS_LIMIT_HEADROOM_PCT: u64 = 20;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Check a node gas quote against the cap and apply the safety multiplier.
pub fn apply_gas_policy(quote_wei: u128, multiplier: f64, max_gwei: u64) -> BlockchainResult<u128> {
    let quote_gwei = quote_wei / WEI_PER_GWEI;
    if quote_gwei > max_gwei as u128 {
        return Err(BlockchainError::GasPriceTooHigh {
            current_gwei: quote_gwei as u64,
            max_gwei,
        });
    }
    Ok((quote_wei as f64 * multiplier) as u128)
}

/// Add headroom to a gas estimate.
pub fn pad_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_add(estimate.saturating_mul(GAS_LIMIT_HEADROOM_PCT) / 100)
}

/// Transaction builder over a connected client.
pub struct TxBuilder<'a> {
    client: &'a BlockchainClient,
}

impl<'a> TxBuilder<'a> {
    /// Create a new transaction builder.
    pub fn new(client: &'a BlockchainClient) -> Self {
        Self { client }
    }

    /// Complete a request (call or deployment) for sending from `from`.
    ///
    /// Gas estimation simulates the transaction, so a call that would revert
    /// fails here with [`BlockchainError::Reverted`] before anything is signed.
    pub async fn prepare(
        &self,
        from: Address,
        tx: TransactionRequest,
    ) -> BlockchainResult<TransactionRequest> {
        let config = self.client.config();

        let gas_price = apply_gas_policy(
            self.client.get_gas_price().await?,
            config.gas_price_multiplier,
            config.max_gas_price_gwei,
        )?;
        let nonce = self.client.get_transaction_count(from).await?;

        let tx = tx
            .with_from(from)
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_chain_id(config.chain_id);

        let estimate = self.client.estimate_gas(tx.clone()).await?;
        Ok(tx.with_gas_limit(pad_gas_limit(estimate)))
    }

    /// Prepare and broadcast, returning the transaction hash.
    pub async fn submit(&self, from: Address, tx: TransactionRequest) -> BlockchainResult<TxHash> {
        let tx = self.prepare(from, tx).await?;
        let tx_hash = self.client.send(tx).await?;
        tracing::debug!(tx_hash = %tx_hash, from = %from, "Transaction broadcast");
        Ok(tx_hash)
    }

    /// Wait for a transaction to reach the configured confirmation depth.
    ///
    /// Reverted transactions are returned as a receipt with `success == false`;
    /// no receipt within `confirmation_timeout_secs` is an error. Failed polls
    /// are logged and retried until then.
    pub async fn wait_for_confirmation(&self, tx_hash: TxHash) -> BlockchainResult<Receipt> {
        let config = self.client.config();
        let required_confirmations = self.client.confirmation_blocks();
        let timeout_secs = config.confirmation_timeout_secs;
        let mut schedule = PollSchedule::new(config.poll_interval_ms, config.max_poll_interval_ms);
        let started = Instant::now();

        let result: Result<Receipt, _> = timeout(Duration::from_secs(timeout_secs), async {
            loop {
                sleep(schedule.next_delay()).await;

                // Poll errors are retried until the deadline
                let receipt = match self.client.get_transaction_receipt(tx_hash).await {
                    Ok(Some(r)) => Receipt::from(&r),
                    Ok(None) => {
                        tracing::debug!(tx_hash = %tx_hash, status = ?ConfirmationStatus::Pending, "Transaction pending");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed, retrying");
                        continue;
                    }
                };

                if !receipt.success {
                    return receipt;
                }

                let current_block = match self.client.get_block_number().await {
                    Ok(number) => number,
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Block number poll failed, retrying");
                        continue;
                    }
                };
                let tx_block = receipt.block_number.unwrap_or(current_block);
                // The inclusion block itself counts as the first confirmation
                let confirmations = current_block.saturating_sub(tx_block).saturating_add(1) as u32;

                if confirmations >= required_confirmations {
                    return receipt;
                }

                let status = ConfirmationStatus::Confirming {
                    current: confirmations,
                    required: required_confirmations,
                };
                tracing::debug!(tx_hash = %tx_hash, status = ?status, "Waiting for confirmations");
            }
        })
        .await;

        match result {
            Ok(receipt) => {
                metrics::record_confirmation(started.elapsed());
                Ok(receipt)
            }
            Err(_) => Err(BlockchainError::ConfirmationTimeout {
                tx_hash,
                waited_secs: timeout_secs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_policy_applies_multiplier() {
        let price = apply_gas_policy(10 * WEI_PER_GWEI, 1.5, 100).unwrap();
        assert_eq!(price, 15 * WEI_PER_GWEI);
    }

    #[test]
    fn test_gas_policy_rejects_spikes() {
        let err = apply_gas_policy(600 * WEI_PER_GWEI, 1.2, 500).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::GasPriceTooHigh {
                current_gwei: 600,
                max_gwei: 500
            }
        ));
    }

    #[test]
    fn test_gas_limit_headroom() {
        assert_eq!(pad_gas_limit(100_000), 120_000);
        assert_eq!(pad_gas_limit(u64::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_unreachable_node_waits_until_deadline() {
        use alloy::network::EthereumWallet;
        use alloy::signers::local::PrivateKeySigner;

        use crate::blockchain::types::NetworkConfig;

        let config = NetworkConfig {
            rpc_url: "http://localhost:1".to_string(),
            chain_id: 31337,
            rpc_timeout_secs: 1,
            confirmation_timeout_secs: 1,
            poll_interval_ms: 20,
            max_poll_interval_ms: 50,
            ..NetworkConfig::default()
        };
        let wallet = EthereumWallet::new(PrivateKeySigner::random());
        let client = BlockchainClient::new(config, "http://localhost:1", wallet)
            .await
            .unwrap();

        let tx_hash = TxHash::repeat_byte(7);
        let err = TxBuilder::new(&client)
            .wait_for_confirmation(tx_hash)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::ConfirmationTimeout { tx_hash: h, waited_secs: 1 } if h == tx_hash
        ));
    }

    #[test]
    fn test_confirmation_status() {
        let status = ConfirmationStatus::Confirming {
            current: 2,
            required: 3,
        };
        assert!(matches!(status, ConfirmationStatus::Confirming { .. }));
    }
}
