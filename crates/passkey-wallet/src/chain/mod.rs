//! Blockchain RPC boundary.
//!
//! The wallet core talks to a chain only through [`ChainClient`]. One client handle is
//! created per configured chain at startup and shared by reference with every request.

use std::time::Duration;

use alloy_primitives::{Address, B256, Bytes, Log};
use async_trait::async_trait;

mod client;
mod error;
mod registry;

pub use client::AlloyChainClient;
pub use error::{ChainError, ChainResult};
pub use registry::ChainRegistry;

/// The parts of a mined transaction receipt the wallet core inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationReceipt {
    /// Hash of the bundle transaction.
    pub transaction_hash: B256,
    /// Gas used by the bundle transaction.
    pub gas_used: u64,
    /// Receipt status. True does not imply the operation itself succeeded.
    pub status: bool,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// All logs emitted by the transaction, in order.
    pub logs: Vec<Log>,
}

/// Read and write access to one chain.
#[async_trait]
pub trait ChainClient: Send + Sync + std::fmt::Debug {
    /// Address of the funded account that signs and pays for bundles.
    fn relayer_address(&self) -> Address;

    /// Gets contract code at the given address at the latest block.
    async fn code_at(&self, address: Address) -> ChainResult<Bytes>;

    /// Executes a contract call without creating a transaction.
    async fn call_contract(&self, to: Address, data: Bytes) -> ChainResult<Bytes>;

    /// Signs and broadcasts a transaction from the relayer account.
    async fn send_transaction(&self, to: Address, data: Bytes) -> ChainResult<B256>;

    /// Waits for `confirmations` blocks on top of the transaction, at most `timeout`.
    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        confirmations: u64,
        timeout: Duration,
    ) -> ChainResult<OperationReceipt>;
}
