//! ERC-4337 v0.6 user operations and the Draft, HashChallengeIssued, Signed state
//! machine.
//!
//! Clients exchange operations as [`UserOperation`], the v0.6 JSON model from
//! `alloy-rpc-types-eth`. It is converted to the `sol!` struct only at the EntryPoint
//! calldata boundary.

use crate::contracts::entry_point;

mod builder;

pub use alloy_rpc_types_eth::erc4337::UserOperation;
pub use builder::{
    HashedUserOperation, IssuedChallenge, SignedUserOperation, UserOperationBuilder,
    UserOperationDraft,
};

impl From<UserOperation> for entry_point::UserOperation {
    fn from(op: UserOperation) -> Self {
        Self {
            sender: op.sender,
            nonce: op.nonce,
            initCode: op.init_code,
            callData: op.call_data,
            callGasLimit: op.call_gas_limit,
            verificationGasLimit: op.verification_gas_limit,
            preVerificationGas: op.pre_verification_gas,
            maxFeePerGas: op.max_fee_per_gas,
            maxPriorityFeePerGas: op.max_priority_fee_per_gas,
            paymasterAndData: op.paymaster_and_data,
            signature: op.signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, Bytes, U256, address};

    use super::*;

    #[test]
    fn test_deserialize_client_json() {
        let json = r#"{
            "sender": "0x1306b01bc3e4ad202612d3843387e94737673f53",
            "nonce": "0x0",
            "initCode": "0x",
            "callData": "0xb61d27f6",
            "callGasLimit": "0x30d40",
            "verificationGasLimit": "0x7a120",
            "preVerificationGas": "0xc350",
            "maxFeePerGas": "0x3b9aca00",
            "maxPriorityFeePerGas": "0x3b9aca00",
            "paymasterAndData": "0x",
            "signature": "0x"
        }"#;
        let op: UserOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.sender, address!("0x1306b01bc3e4ad202612d3843387e94737673f53"));
        assert_eq!(op.call_gas_limit, U256::from(200_000));
        assert_eq!(op.verification_gas_limit, U256::from(500_000));
        assert!(op.init_code.is_empty());
    }

    #[test]
    fn test_abi_conversion_preserves_field_order() {
        let op = UserOperation {
            sender: Address::repeat_byte(1),
            nonce: U256::from(2),
            init_code: Bytes::from_static(&[3]),
            call_data: Bytes::from_static(&[4]),
            call_gas_limit: U256::from(5),
            verification_gas_limit: U256::from(6),
            pre_verification_gas: U256::from(7),
            max_fee_per_gas: U256::from(8),
            max_priority_fee_per_gas: U256::from(9),
            paymaster_and_data: Bytes::from_static(&[10]),
            signature: Bytes::from_static(&[11]),
        };
        let abi = entry_point::UserOperation::from(op);
        assert_eq!(abi.sender, Address::repeat_byte(1));
        assert_eq!(abi.initCode.as_ref(), &[3]);
        assert_eq!(abi.callData.as_ref(), &[4]);
        assert_eq!(abi.callGasLimit, U256::from(5));
        assert_eq!(abi.verificationGasLimit, U256::from(6));
        assert_eq!(abi.preVerificationGas, U256::from(7));
        assert_eq!(abi.maxFeePerGas, U256::from(8));
        assert_eq!(abi.maxPriorityFeePerGas, U256::from(9));
        assert_eq!(abi.paymasterAndData.as_ref(), &[10]);
        assert_eq!(abi.signature.as_ref(), &[11]);
    }
}
