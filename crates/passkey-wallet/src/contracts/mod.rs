//! ABI bindings and calldata helpers for the contracts the wallet core talks to.

pub mod entry_point;
pub mod factory;
pub mod smart_wallet;
