//! Coinbase Smart Wallet factory bindings.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue, sol};

sol! {
    /// Deterministic account factory. `createAccount` returns the existing account
    /// without side effects when it is already deployed.
    #[allow(missing_docs)]
    interface ICoinbaseSmartWalletFactory {
        function createAccount(bytes[] calldata owners, uint256 nonce)
            external
            payable
            returns (address account);
    }
}

/// Calldata for `createAccount(owners, nonce)`.
pub fn encode_create_account(owners: Vec<Bytes>, nonce: U256) -> Bytes {
    ICoinbaseSmartWalletFactory::createAccountCall { owners, nonce }.abi_encode().into()
}

/// Decodes the `address` returned by `createAccount`.
pub fn decode_account_address(data: &[u8]) -> Result<Address, alloy_sol_types::Error> {
    Address::abi_decode(data)
}

/// `initCode` deploying a wallet: the factory address packed with the `createAccount` calldata.
pub fn create_account_init_code(factory: Address, owners: Vec<Bytes>, nonce: U256) -> Bytes {
    let call = encode_create_account(owners, nonce);
    let mut init_code = Vec::with_capacity(20 + call.len());
    init_code.extend_from_slice(factory.as_slice());
    init_code.extend_from_slice(&call);
    init_code.into()
}
