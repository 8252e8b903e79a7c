//! Error types for the wallet core.

use std::time::Duration;

use alloy_primitives::{Address, B256};
use thiserror::Error;

use crate::{chain::ChainError, store::StoreError};

/// Failures decoding keys, signatures or client data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The DER signature does not follow the SEQUENCE-of-two-INTEGERs layout.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The COSE public key is not a usable EC2 key.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The client data text is not what an authenticator produces.
    #[error("invalid client data: {0}")]
    InvalidClientData(String),
}

/// Where in the request a chain failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPhase {
    /// Before anything was written on-chain (reads, hash and address computation, dry runs).
    Simulation,
    /// While sending or confirming a transaction. Chain state may have changed.
    Execution,
}

impl std::fmt::Display for ChainPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulation => f.write_str("simulation"),
            Self::Execution => f.write_str("execution"),
        }
    }
}

/// Main error type for wallet requests.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Malformed request, negative nonce, missing challenge.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown passkey, challenge or options.
    #[error("not found: {0}")]
    NotFound(String),

    /// The WebAuthn ceremony did not verify.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Key, signature or client data decoding failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The operation sender is not the wallet derived from the passkey.
    #[error("sender mismatch: expected {expected}, got {actual}")]
    SenderMismatch {
        /// Address derived from the passkey and wallet nonce.
        expected: Address,
        /// Address supplied as the operation sender.
        actual: Address,
    },

    /// A contract call or transaction failed.
    #[error("chain error during {phase}: {source}")]
    Chain {
        /// Request phase in which the failure happened.
        phase: ChainPhase,
        /// Underlying chain failure.
        #[source]
        source: ChainError,
    },

    /// A submitted transaction was not confirmed before the deadline.
    #[error("transaction {tx_hash} not confirmed after {waited:?}")]
    Timeout {
        /// Hash of the pending transaction.
        tx_hash: B256,
        /// How long the confirmation was awaited.
        waited: Duration,
    },

    /// The datastore failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Creates a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Wraps a chain failure, lifting confirmation timeouts into [`WalletError::Timeout`].
    pub fn chain(phase: ChainPhase, source: ChainError) -> Self {
        match source {
            ChainError::Timeout { tx_hash, waited } => Self::Timeout { tx_hash, waited },
            source => Self::Chain { phase, source },
        }
    }

    /// Returns true if the caller's request was at fault and must not be retried as-is.
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::NotFound(_)
            | Self::Authentication(_)
            | Self::Crypto(_)
            | Self::SenderMismatch { .. } => true,
            Self::Chain { phase, .. } => matches!(phase, ChainPhase::Simulation),
            Self::Timeout { .. } | Self::Store(_) | Self::Internal(_) => false,
        }
    }

    /// Returns true if the failure happened after submission and may succeed on retry.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Chain { phase, .. } => matches!(phase, ChainPhase::Execution),
            _ => false,
        }
    }
}

/// Result type alias for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::validation(WalletError::validation("nonce must be non-negative"), true, false)]
    #[case::not_found(WalletError::not_found("passkey"), true, false)]
    #[case::authentication(WalletError::authentication("bad signature"), true, false)]
    #[case::crypto(CryptoError::InvalidKey("kty".into()).into(), true, false)]
    #[case::sender_mismatch(
        WalletError::SenderMismatch { expected: Address::ZERO, actual: Address::repeat_byte(1) },
        true,
        false
    )]
    #[case::simulation(
        WalletError::chain(ChainPhase::Simulation, ChainError::Reverted("AA23".into())),
        true,
        false
    )]
    #[case::execution(
        WalletError::chain(ChainPhase::Execution, ChainError::Transport("reset".into())),
        false,
        true
    )]
    #[case::internal(WalletError::Internal("boom".into()), false, false)]
    fn test_classification(
        #[case] err: WalletError,
        #[case] client_error: bool,
        #[case] retryable: bool,
    ) {
        assert_eq!(err.is_client_error(), client_error);
        assert_eq!(err.is_retryable(), retryable);
    }

    #[test]
    fn test_chain_timeout_is_lifted() {
        let tx_hash = B256::repeat_byte(0xab);
        let err = WalletError::chain(
            ChainPhase::Execution,
            ChainError::Timeout { tx_hash, waited: Duration::from_secs(30) },
        );
        assert!(matches!(err, WalletError::Timeout { tx_hash: h, .. } if h == tx_hash));
        assert!(err.is_retryable());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_display_includes_phase() {
        let err = WalletError::chain(ChainPhase::Simulation, ChainError::Reverted("AA10".into()));
        assert_eq!(err.to_string(), "chain error during simulation: execution reverted: AA10");
    }
}
