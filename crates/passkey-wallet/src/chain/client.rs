//! [`ChainClient`] backed by an alloy HTTP provider with the relayer wallet attached.

use std::time::Duration;

use alloy_network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, B256, Bytes};
use alloy_provider::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{TransactionReceipt, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::{ChainClient, ChainError, ChainResult, OperationReceipt};

/// Chain client for one RPC endpoint.
#[derive(Debug, Clone)]
pub struct AlloyChainClient {
    provider: DynProvider,
    relayer: Address,
    endpoint: Url,
}

impl AlloyChainClient {
    /// Connects to `endpoint`, signing transactions with `signer`.
    pub fn new(endpoint: Url, signer: PrivateKeySigner) -> Self {
        let relayer = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(endpoint.clone())
            .erased();
        Self { provider, relayer, endpoint }
    }

    /// Returns the endpoint URL.
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn to_operation_receipt(receipt: &TransactionReceipt) -> OperationReceipt {
    OperationReceipt {
        transaction_hash: ReceiptResponse::transaction_hash(receipt),
        gas_used: ReceiptResponse::gas_used(receipt),
        status: ReceiptResponse::status(receipt),
        block_number: ReceiptResponse::block_number(receipt),
        logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn relayer_address(&self) -> Address {
        self.relayer
    }

    async fn code_at(&self, address: Address) -> ChainResult<Bytes> {
        Ok(self.provider.get_code_at(address).await?)
    }

    async fn call_contract(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        let tx = TransactionRequest::default()
            .with_from(self.relayer)
            .with_to(to)
            .with_input(data);
        Ok(self.provider.call(tx).await?)
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> ChainResult<B256> {
        let tx = TransactionRequest::default()
            .with_from(self.relayer)
            .with_to(to)
            .with_input(data);
        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        info!(target: "passkey::chain", %tx_hash, endpoint = %self.endpoint, "Transaction sent");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        confirmations: u64,
        timeout: Duration,
    ) -> ChainResult<OperationReceipt> {
        let pending = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(confirmations);

        let receipt = tokio::time::timeout(timeout, pending.get_receipt())
            .await
            .map_err(|_| ChainError::Timeout { tx_hash, waited: timeout })?
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        debug!(
            target: "passkey::chain",
            %tx_hash,
            block_number = ?receipt.block_number,
            status = ReceiptResponse::status(&receipt),
            "Receipt received"
        );
        Ok(to_operation_receipt(&receipt))
    }
}
