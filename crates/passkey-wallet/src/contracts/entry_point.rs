//! EntryPoint v0.6 bindings.

use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_types::{SolCall, SolValue, sol};

sol! {
    /// ERC-4337 v0.6 user operation as laid out in EntryPoint calldata.
    #[allow(missing_docs)]
    #[derive(Debug, Default, PartialEq, Eq)]
    struct UserOperation {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        uint256 callGasLimit;
        uint256 verificationGasLimit;
        uint256 preVerificationGas;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        bytes paymasterAndData;
        bytes signature;
    }

    /// EntryPoint v0.6 functions used by the relayer.
    #[allow(missing_docs)]
    interface IEntryPoint {
        function getUserOpHash(UserOperation calldata userOp) external view returns (bytes32);
        function handleOps(UserOperation[] calldata ops, address payable beneficiary) external;
    }

    /// Emitted before the first operation of a bundle is executed.
    #[derive(Debug)]
    event BeforeExecution();

    /// Emitted by the EntryPoint after each operation is executed.
    #[derive(Debug)]
    event UserOperationEvent(
        bytes32 indexed userOpHash,
        address indexed sender,
        address indexed paymaster,
        uint256 nonce,
        bool success,
        uint256 actualGasCost,
        uint256 actualGasUsed
    );

    /// Emitted when the operation's call into the wallet reverts.
    #[derive(Debug)]
    event UserOperationRevertReason(
        bytes32 indexed userOpHash,
        address indexed sender,
        uint256 nonce,
        bytes revertReason
    );
}

/// Calldata for `getUserOpHash(op)`.
pub fn encode_get_user_op_hash(op: UserOperation) -> Bytes {
    IEntryPoint::getUserOpHashCall { userOp: op }.abi_encode().into()
}

/// Decodes the `bytes32` returned by `getUserOpHash`.
pub fn decode_user_op_hash(data: &[u8]) -> Result<B256, alloy_sol_types::Error> {
    B256::abi_decode(data)
}

/// Calldata for `handleOps(ops, beneficiary)`.
pub fn encode_handle_ops(ops: Vec<UserOperation>, beneficiary: Address) -> Bytes {
    IEntryPoint::handleOpsCall { ops, beneficiary }.abi_encode().into()
}
