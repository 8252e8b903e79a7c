//! Event-based outcome of a mined operation.
//!
//! A bundle transaction succeeds even when the operation inside it reverts, so the
//! receipt status alone says nothing about the operation.

use alloy_primitives::{Address, B256};
use alloy_sol_types::SolEvent;
use tracing::{debug, warn};

use crate::{
    chain::OperationReceipt,
    contracts::entry_point::{UserOperationEvent, UserOperationRevertReason},
    user_operation::UserOperation,
};

/// Returns true iff the EntryPoint reports `op` as executed successfully.
///
/// Only logs emitted by `entry_point` are considered. Any `UserOperationRevertReason`
/// fails the outcome. Otherwise at least one `UserOperationEvent` for
/// `(op.sender, op_hash)` must exist and all such events must report success.
pub fn verify_outcome(
    receipt: &OperationReceipt,
    entry_point: Address,
    op: &UserOperation,
    op_hash: B256,
) -> bool {
    let mut matched = 0usize;

    for log in receipt.logs.iter().filter(|log| log.address == entry_point) {
        let topic0 = log.topics().first().copied();
        if topic0 == Some(UserOperationRevertReason::SIGNATURE_HASH) {
            warn!(
                target: "passkey::executor",
                tx_hash = %receipt.transaction_hash,
                "EntryPoint reported a reverted operation"
            );
            return false;
        }
        if topic0 != Some(UserOperationEvent::SIGNATURE_HASH) {
            continue;
        }

        let Ok(event) = UserOperationEvent::decode_log(log) else {
            debug!(target: "passkey::executor", "Skipping undecodable UserOperationEvent");
            continue;
        };
        if event.sender != op.sender || event.userOpHash != op_hash {
            continue;
        }
        if !event.success {
            return false;
        }
        matched += 1;
    }

    matched > 0
}
