//! [`ChainClient`] implementation on top of [`BlockchainClient`].
//!
//! ABI encoding and decoding happen here so the orchestrator only deals in
//! typed values.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::artifacts::Artifact;
use crate::blockchain::client::BlockchainClient;
use crate::blockchain::transaction::TxBuilder;
use crate::blockchain::types::{BlockchainError, BlockchainResult, Receipt};
use crate::orchestrator::chain::ChainClient;

/// Creation code followed by the ABI-encoded constructor arguments.
pub fn encode_deployment(artifact: &Artifact, args: &[DynSolValue]) -> BlockchainResult<Bytes> {
    if !artifact.is_deployable() {
        return Err(BlockchainError::Abi(format!(
            "artifact '{}' has no creation bytecode",
            artifact.name
        )));
    }
    let mut code = artifact.bytecode.to_vec();
    match &artifact.abi.constructor {
        Some(constructor) => {
            let encoded = constructor.abi_encode_input(args).map_err(|e| {
                BlockchainError::Abi(format!("{} constructor: {}", artifact.name, e))
            })?;
            code.extend_from_slice(&encoded);
        }
        None if !args.is_empty() => {
            return Err(BlockchainError::Abi(format!(
                "{} has no constructor but {} argument(s) were given",
                artifact.name,
                args.len()
            )));
        }
        None => {}
    }
    Ok(Bytes::from(code))
}

/// Selector plus ABI-encoded arguments.
pub fn encode_call(function: &Function, args: &[DynSolValue]) -> BlockchainResult<Bytes> {
    function
        .abi_encode_input(args)
        .map(Bytes::from)
        .map_err(|e| BlockchainError::Abi(format!("{}: {}", function.signature(), e)))
}

#[async_trait]
impl ChainClient for BlockchainClient {
    async fn deploy_contract(
        &self,
        from: Address,
        artifact: &Artifact,
        constructor_args: &[DynSolValue],
    ) -> BlockchainResult<TxHash> {
        let code = encode_deployment(artifact, constructor_args)?;
        let tx = TransactionRequest::default().with_deploy_code(code);
        TxBuilder::new(self).submit(from, tx).await
    }

    async fn call(
        &self,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> BlockchainResult<Vec<DynSolValue>> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(encode_call(function, args)?);
        let output = BlockchainClient::call(self, tx).await?;
        function
            .abi_decode_output(&output)
            .map_err(|e| BlockchainError::Abi(format!("{} output: {}", function.signature(), e)))
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        function: &Function,
        args: &[DynSolValue],
    ) -> BlockchainResult<TxHash> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(encode_call(function, args)?);
        TxBuilder::new(self).submit(from, tx).await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Receipt> {
        TxBuilder::new(self).wait_for_confirmation(tx_hash).await
    }

    async fn get_block_number(&self) -> BlockchainResult<u64> {
        BlockchainClient::get_block_number(self).await
    }
}
