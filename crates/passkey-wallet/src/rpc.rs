//! JSON-RPC surface of the relayer.

use alloy_primitives::Bytes;
use jsonrpsee::{
    core::{RpcResult, async_trait},
    proc_macros::rpc,
    types::{ErrorCode, ErrorObjectOwned},
};
use tracing::{debug, warn};

use crate::{
    ChainPhase, WalletError,
    service::{
        BatchCall, ExecuteUserOperationResponse, PasskeyWalletService,
        UserOperationHashOptionsResponse, WalletAddressResponse,
    },
    user_operation::UserOperation,
    webauthn::{
        AuthenticatedPublicKeyCredential, CreatedPublicKeyCredential,
        PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions,
    },
};

/// Error code for unknown passkeys, challenges and options.
pub const NOT_FOUND_CODE: i32 = -32001;

/// Error code for WebAuthn ceremonies that did not verify.
pub const AUTHENTICATION_FAILED_CODE: i32 = -32002;

/// Error code for chain failures after submission. The bundle may have landed.
pub const EXECUTION_FAILED_CODE: i32 = -32010;

/// Error code for bundles not confirmed before the deadline.
pub const CONFIRMATION_TIMEOUT_CODE: i32 = -32011;

/// RPC API for passkey wallets
#[rpc(server, namespace = "passkey")]
pub trait PasskeyApi {
    /// Issues creation options for a new passkey.
    #[method(name = "generateRegistrationOptions")]
    async fn generate_registration_options(
        &self,
        key_name: String,
    ) -> RpcResult<PublicKeyCredentialCreationOptions>;

    /// Verifies a registration and returns the nonce-0 wallet.
    #[method(name = "verifyRegistration")]
    async fn verify_registration(
        &self,
        response: CreatedPublicKeyCredential,
        chain: String,
    ) -> RpcResult<WalletAddressResponse>;

    /// Issues sign-in options.
    #[method(name = "generateAuthenticationOptions")]
    async fn generate_authentication_options(&self) -> RpcResult<PublicKeyCredentialRequestOptions>;

    /// Verifies a sign-in and returns the wallet for `nonce`.
    #[method(name = "computeWalletAddress")]
    async fn compute_wallet_address(
        &self,
        response: AuthenticatedPublicKeyCredential,
        chain: String,
        nonce: i64,
    ) -> RpcResult<WalletAddressResponse>;

    /// Completes and hashes an operation and issues its signing challenge.
    #[method(name = "generateUserOperationHashOptions")]
    async fn generate_user_operation_hash_options(
        &self,
        passkey_id: String,
        chain: String,
        user_op: UserOperation,
        wallet_nonce: i64,
        use_paymaster: bool,
    ) -> RpcResult<UserOperationHashOptionsResponse>;

    /// Signs an operation with the assertion and submits it.
    #[method(name = "executeUserOperation")]
    async fn execute_user_operation(
        &self,
        response: AuthenticatedPublicKeyCredential,
        chain: String,
        user_op: UserOperation,
    ) -> RpcResult<ExecuteUserOperationResponse>;

    /// Encodes `executeBatch` calldata for the wallet.
    #[method(name = "encodeExecuteBatch")]
    async fn encode_execute_batch(&self, calls: Vec<BatchCall>) -> RpcResult<Bytes>;
}

/// Implementation of [`PasskeyApiServer`] over a [`PasskeyWalletService`].
#[derive(Debug, Clone)]
pub struct PasskeyRpc {
    service: PasskeyWalletService,
}

impl PasskeyRpc {
    /// Creates the RPC handler.
    pub const fn new(service: PasskeyWalletService) -> Self {
        Self { service }
    }
}

/// Maps a wallet error to its JSON-RPC error object.
pub fn rpc_error(err: WalletError) -> ErrorObjectOwned {
    let message = err.to_string();
    match err {
        WalletError::NotFound(_) => ErrorObjectOwned::owned(NOT_FOUND_CODE, message, None::<()>),
        WalletError::Authentication(_) => {
            ErrorObjectOwned::owned(AUTHENTICATION_FAILED_CODE, message, None::<()>)
        }
        WalletError::Timeout { tx_hash, .. } => {
            ErrorObjectOwned::owned(CONFIRMATION_TIMEOUT_CODE, message, Some(tx_hash))
        }
        WalletError::Chain { phase: ChainPhase::Execution, .. } => {
            ErrorObjectOwned::owned(EXECUTION_FAILED_CODE, message, None::<()>)
        }
        err if err.is_client_error() => {
            ErrorObjectOwned::owned(ErrorCode::InvalidParams.code(), message, None::<()>)
        }
        _ => {
            warn!(target: "passkey::rpc", error = %message, "Internal error");
            ErrorObjectOwned::owned(ErrorCode::InternalError.code(), message, None::<()>)
        }
    }
}

#[async_trait]
impl PasskeyApiServer for PasskeyRpc {
    async fn generate_registration_options(
        &self,
        key_name: String,
    ) -> RpcResult<PublicKeyCredentialCreationOptions> {
        debug!(target: "passkey::rpc", key_name = %key_name, "generateRegistrationOptions");
        self.service.generate_registration_options(&key_name).await.map_err(rpc_error)
    }

    async fn verify_registration(
        &self,
        response: CreatedPublicKeyCredential,
        chain: String,
    ) -> RpcResult<WalletAddressResponse> {
        debug!(
            target: "passkey::rpc",
            passkey = %response.id,
            chain = %chain,
            "verifyRegistration"
        );
        self.service.verify_registration(response, &chain).await.map_err(rpc_error)
    }

    async fn generate_authentication_options(
        &self,
    ) -> RpcResult<PublicKeyCredentialRequestOptions> {
        debug!(target: "passkey::rpc", "generateAuthenticationOptions");
        self.service.generate_authentication_options().await.map_err(rpc_error)
    }

    async fn compute_wallet_address(
        &self,
        response: AuthenticatedPublicKeyCredential,
        chain: String,
        nonce: i64,
    ) -> RpcResult<WalletAddressResponse> {
        debug!(
            target: "passkey::rpc",
            passkey = %response.id,
            chain = %chain,
            nonce,
            "computeWalletAddress"
        );
        self.service.compute_wallet_address(response, &chain, nonce).await.map_err(rpc_error)
    }

    async fn generate_user_operation_hash_options(
        &self,
        passkey_id: String,
        chain: String,
        user_op: UserOperation,
        wallet_nonce: i64,
        use_paymaster: bool,
    ) -> RpcResult<UserOperationHashOptionsResponse> {
        debug!(
            target: "passkey::rpc",
            passkey = %passkey_id,
            chain = %chain,
            sender = %user_op.sender,
            wallet_nonce,
            use_paymaster,
            "generateUserOperationHashOptions"
        );
        self.service
            .generate_user_operation_hash_options(
                &passkey_id,
                &chain,
                user_op,
                wallet_nonce,
                use_paymaster,
            )
            .await
            .map_err(rpc_error)
    }

    async fn execute_user_operation(
        &self,
        response: AuthenticatedPublicKeyCredential,
        chain: String,
        user_op: UserOperation,
    ) -> RpcResult<ExecuteUserOperationResponse> {
        debug!(
            target: "passkey::rpc",
            passkey = %response.id,
            chain = %chain,
            sender = %user_op.sender,
            "executeUserOperation"
        );
        self.service.execute_user_operation(response, &chain, user_op).await.map_err(rpc_error)
    }

    async fn encode_execute_batch(&self, calls: Vec<BatchCall>) -> RpcResult<Bytes> {
        Ok(self.service.encode_execute_batch(calls))
    }
}
