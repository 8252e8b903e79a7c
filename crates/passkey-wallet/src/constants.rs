//! Protocol constants.

use std::time::Duration;

use alloy_primitives::{Address, U256, address};

/// Canonical EntryPoint v0.6 deployment, hardcoded in Coinbase Smart Wallet.
pub const ENTRY_POINT_V06: Address = address!("0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// Order `N` of the NIST P-256 group.
pub const P256_N: U256 = U256::from_limbs([
    0xf3b9cac2fc632551,
    0xbce6faada7179e84,
    0xffffffffffffffff,
    0xffffffff00000000,
]);

/// `N / 2` (floor) for the NIST P-256 group. Signatures with `s` above this are high-S.
pub const P256_N_DIV_2: U256 = U256::from_limbs([
    0x79dce5617e3192a8,
    0xde737d56d38bcf42,
    0x7fffffffffffffff,
    0x7fffffff80000000,
]);

/// Owner slot used when signing with the passkey that created the wallet.
pub const DEFAULT_OWNER_INDEX: u64 = 0;

/// Length of each affine coordinate of a P-256 public key.
pub const COORDINATE_LENGTH: usize = 32;

/// Length of an on-chain owner (`x || y`).
pub const OWNER_LENGTH: usize = 2 * COORDINATE_LENGTH;

/// Length of randomly generated WebAuthn challenges.
pub const CHALLENGE_LENGTH: usize = 32;

/// Lifetime of pending registration and authentication options.
pub const DEFAULT_OPTIONS_TTL: Duration = Duration::from_secs(300);

/// Deadline for a submitted bundle to reach the required confirmations.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Confirmations required before a submitted bundle is inspected.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Ceremony timeout advertised to the client, in milliseconds.
pub const CEREMONY_TIMEOUT_MS: u32 = 60_000;

/// COSE algorithm identifier for ES256.
pub const COSE_ALG_ES256: i64 = -7;

/// Relying party display name used when none is configured.
pub const DEFAULT_RP_NAME: &str = "AccountAbstraction demo with WebAuthn";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_order_is_exact_floor() {
        assert_eq!(P256_N_DIV_2, P256_N >> 1);
        assert_eq!(P256_N_DIV_2 * U256::from(2) + U256::from(1), P256_N);
    }

    #[test]
    fn test_curve_order_matches_published_value() {
        let expected: U256 =
            "0xffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551".parse().unwrap();
        assert_eq!(P256_N, expected);
    }
}
