//! Bundle submission and outcome verification.

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256};
use tracing::{info, warn};

use crate::{
    ChainPhase, WalletError, WalletResult,
    chain::{ChainClient, OperationReceipt},
    contracts::entry_point::encode_handle_ops,
    user_operation::SignedUserOperation,
};

mod outcome;

pub use outcome::verify_outcome;

/// A confirmed bundle and whether the operation inside it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Event-based outcome, see [`verify_outcome`].
    pub success: bool,
    /// Hash of the operation.
    pub user_op_hash: B256,
    /// Receipt of the bundle transaction.
    pub receipt: OperationReceipt,
}

/// Sends signed operations to the EntryPoint from the relayer account.
///
/// Operations for the same sender must not be submitted concurrently; their nonces
/// would collide.
#[derive(Debug, Clone)]
pub struct OperationExecutor {
    chain: Arc<dyn ChainClient>,
    entry_point: Address,
    confirmations: u64,
    confirmation_timeout: Duration,
}

impl OperationExecutor {
    /// Creates an executor waiting `confirmations` blocks for at most `confirmation_timeout`.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        entry_point: Address,
        confirmations: u64,
        confirmation_timeout: Duration,
    ) -> Self {
        Self { chain, entry_point, confirmations, confirmation_timeout }
    }

    /// Submits `op` as a single-element `handleOps` bundle paying `beneficiary`.
    ///
    /// The bundle is dry-run first so that invalid operations fail without spending gas.
    /// Failures after the transaction was broadcast are execution-phase errors; a
    /// confirmation deadline surfaces as [`WalletError::Timeout`] carrying the hash.
    pub async fn submit(
        &self,
        op: &SignedUserOperation,
        beneficiary: Address,
    ) -> WalletResult<ExecutionResult> {
        let user_op_hash = op.hash();
        let sender = op.operation().sender;
        let data = encode_handle_ops(vec![op.operation().clone().into()], beneficiary);

        self.chain
            .call_contract(self.entry_point, data.clone())
            .await
            .map_err(|e| WalletError::chain(ChainPhase::Simulation, e))?;

        let tx_hash = self
            .chain
            .send_transaction(self.entry_point, data)
            .await
            .map_err(|e| WalletError::chain(ChainPhase::Execution, e))?;
        info!(target: "passkey::executor", %tx_hash, %sender, %user_op_hash, "Submitted bundle");

        let receipt = self
            .chain
            .wait_for_receipt(tx_hash, self.confirmations, self.confirmation_timeout)
            .await
            .map_err(|e| WalletError::chain(ChainPhase::Execution, e))?;

        let success = verify_outcome(&receipt, self.entry_point, op.operation(), user_op_hash);
        if success {
            info!(
                target: "passkey::executor",
                %tx_hash,
                gas_used = receipt.gas_used,
                block = ?receipt.block_number,
                "Operation executed"
            );
        } else {
            warn!(
                target: "passkey::executor",
                %tx_hash,
                %user_op_hash,
                tx_status = receipt.status,
                "Operation did not succeed"
            );
        }

        Ok(ExecutionResult { success, user_op_hash, receipt })
    }
}
