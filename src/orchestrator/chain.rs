//! The chain operations the orchestrator depends on.
//!
//! The orchestrator never talks to a node directly. Anything implementing
//! [`ChainClient`] can drive a plan: the alloy-backed
//! [`BlockchainClient`](crate::blockchain::BlockchainClient) in production, an
//! in-memory chain in tests.

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::Function;
use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;

use crate::artifacts::Artifact;
use crate::blockchain::types::{BlockchainResult, Receipt};

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit a contract creation signed by `from`.
    async fn deploy_contract(
        &self,
        from: Address,
        artifact: &Artifact,
        constructor_args: &[DynSolValue],
    ) -> BlockchainResult<TxHash>;

    /// Read-only call returning the decoded outputs. Never creates a transaction.
    async fn call(
        &self,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> BlockchainResult<Vec<DynSolValue>>;

    /// Submit a state-changing call signed by `from`.
    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> BlockchainResult<TxHash>;

    /// Suspend until the transaction has a receipt (or the wait bound expires).
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Receipt>;

    async fn get_block_number(&self) -> BlockchainResult<u64>;
}
