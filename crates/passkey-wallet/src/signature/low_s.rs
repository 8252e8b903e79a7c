use alloy_primitives::U256;

use crate::{P256_N, P256_N_DIV_2};

/// Returns true if `s <= N/2`.
pub fn is_low_s(s: U256) -> bool {
    s <= P256_N_DIV_2
}

/// Folds `s` into the lower half of the P-256 order: `N - s` when `s > N/2`, else `s`.
///
/// The wallet's verifier rejects high-S signatures, so every `s` must pass through here
/// before it is encoded. Idempotent on `[1, N-1]`.
pub fn normalize_low_s(s: U256) -> U256 {
    if is_low_s(s) { s } else { P256_N.saturating_sub(s) }
}
