//! Response shapes of the request pipelines.

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::{
    contracts::smart_wallet::Call, executor::ExecutionResult, user_operation::UserOperation,
    webauthn::PublicKeyCredentialRequestOptions,
};

/// A passkey and the wallet it controls at `nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddressResponse {
    /// Credential id of the passkey.
    #[serde(rename = "passkeyID")]
    pub passkey_id: String,
    /// Wallet nonce the address was derived for.
    pub nonce: u64,
    /// Counterfactual wallet address.
    pub address: Address,
}

/// An operation ready to be signed and the challenge to sign it with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationHashOptionsResponse {
    /// Request options whose challenge is the operation hash.
    pub options: PublicKeyCredentialRequestOptions,
    /// The completed operation, to be sent back unchanged for execution.
    pub user_op: UserOperation,
    /// The operation hash.
    pub user_op_hash: B256,
}

/// Status of the bundle transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    /// The transaction did not revert.
    Success,
    /// The transaction reverted.
    Reverted,
}

/// Summary of the bundle transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    /// Transaction hash.
    pub transaction: B256,
    /// Gas used by the transaction.
    pub gas_used: u64,
    /// Transaction status. Does not reflect the operation's own outcome.
    pub status: ReceiptStatus,
}

/// Result of executing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteUserOperationResponse {
    /// Whether the EntryPoint reports the operation as successful.
    pub success: bool,
    /// Bundle transaction receipt.
    pub receipt: ReceiptSummary,
}

impl From<ExecutionResult> for ExecuteUserOperationResponse {
    fn from(result: ExecutionResult) -> Self {
        let status =
            if result.receipt.status { ReceiptStatus::Success } else { ReceiptStatus::Reverted };
        Self {
            success: result.success,
            receipt: ReceiptSummary {
                transaction: result.receipt.transaction_hash,
                gas_used: result.receipt.gas_used,
                status,
            },
        }
    }
}

/// One call of a wallet batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCall {
    /// Call target.
    pub target: Address,
    /// Wei sent with the call.
    #[serde(default)]
    pub value: U256,
    /// Calldata.
    #[serde(default)]
    pub data: Bytes,
}

impl From<BatchCall> for Call {
    fn from(call: BatchCall) -> Self {
        Self { target: call.target, value: call.value, data: call.data }
    }
}
