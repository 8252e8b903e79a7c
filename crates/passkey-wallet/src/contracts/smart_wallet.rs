//! Coinbase Smart Wallet bindings: batched calls and the WebAuthn signature envelope.

use alloy_primitives::Bytes;
use alloy_sol_types::{SolCall, sol};

sol! {
    /// A single call made by the wallet.
    #[allow(missing_docs)]
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Call {
        address target;
        uint256 value;
        bytes data;
    }

    /// Assertion fields the wallet's WebAuthn verifier decodes. The two indices are
    /// byte offsets of `"challenge"` and `"type"` inside `clientDataJSON`.
    #[allow(missing_docs)]
    #[derive(Debug, Default, PartialEq, Eq)]
    struct WebAuthnAuth {
        bytes authenticatorData;
        string clientDataJSON;
        uint256 challengeIndex;
        uint256 typeIndex;
        uint256 r;
        uint256 s;
    }

    /// Outer envelope binding `signatureData` to an owner slot.
    #[allow(missing_docs)]
    #[derive(Debug, Default, PartialEq, Eq)]
    struct SignatureWrapper {
        uint256 ownerIndex;
        bytes signatureData;
    }

    #[allow(missing_docs)]
    interface ICoinbaseSmartWallet {
        function executeBatch(Call[] calldata calls) external payable;
    }
}

/// Calldata for `executeBatch(calls)`.
pub fn encode_execute_batch(calls: Vec<Call>) -> Bytes {
    ICoinbaseSmartWallet::executeBatchCall { calls }.abi_encode().into()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256, hex};

    use super::*;

    #[test]
    fn test_execute_batch_selector() {
        assert_eq!(ICoinbaseSmartWallet::executeBatchCall::SELECTOR, hex!("34fcd5be"));
    }

    #[test]
    fn test_execute_batch_round_trip() {
        let calls = vec![Call {
            target: Address::repeat_byte(0xaa),
            value: U256::from(1_000),
            data: Bytes::from_static(&[0xde, 0xad]),
        }];
        let data = encode_execute_batch(calls.clone());
        let decoded = ICoinbaseSmartWallet::executeBatchCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.calls, calls);
    }
}
