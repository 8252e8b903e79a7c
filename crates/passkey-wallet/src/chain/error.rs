//! Chain client errors.

use std::time::Duration;

use alloy_primitives::B256;
use alloy_transport::TransportError;
use thiserror::Error;

/// Errors returned by a [`ChainClient`](super::ChainClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The node could not be reached or answered with garbage.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node rejected the call, carrying its revert message.
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// Return data did not decode to the expected ABI type.
    #[error("failed to decode return data: {0}")]
    Decode(String),

    /// The transaction did not reach the required confirmations in time.
    #[error("transaction {tx_hash} not confirmed after {waited:?}")]
    Timeout {
        /// Hash of the pending transaction.
        tx_hash: B256,
        /// Deadline that elapsed.
        waited: Duration,
    },
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::Reverted(payload.message.to_string()),
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<alloy_sol_types::Error> for ChainError {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use alloy_sol_types::SolValue;

    use super::*;

    #[test]
    fn test_decode_error_conversion() {
        let err = Address::abi_decode(&[0u8; 4]).unwrap_err();
        assert!(matches!(ChainError::from(err), ChainError::Decode(_)));
    }
}
