//! Two-phase operation assembly.
//!
//! `Draft → HashChallengeIssued → Signed → Submitted`. The first request fills in
//! deployment and sponsorship data, hashes the operation and issues the hash as a
//! WebAuthn challenge. The second request redeems the challenge, re-binds the returned
//! operation to the signed hash and attaches the signature. Only
//! `challenge ↦ options` is persisted between the two.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, U256};
use tracing::{debug, info};

use super::UserOperation;
use crate::{
    ChainPhase, WalletError, WalletResult,
    address::WalletAddressDeriver,
    chain::{ChainClient, ChainError},
    contracts::entry_point::{decode_user_op_hash, encode_get_user_op_hash},
    store::{ChallengeKind, Datastore},
    webauthn::{
        Passkey, PendingCeremony, PublicKeyCredentialRequestOptions, RelyingParty, descriptor,
        generate_authentication_options,
    },
};

fn simulation(err: ChainError) -> WalletError {
    WalletError::chain(ChainPhase::Simulation, err)
}

/// An operation whose deployment and sponsorship fields are still being filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOperationDraft {
    op: UserOperation,
}

impl UserOperationDraft {
    /// Starts a draft from a client operation. Any signature is discarded.
    pub fn new(mut op: UserOperation) -> Self {
        op.signature = Bytes::new();
        Self { op }
    }

    /// Returns the operation as drafted so far.
    pub const fn operation(&self) -> &UserOperation {
        &self.op
    }
}

/// An operation frozen by its canonical hash. No field other than the signature can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedUserOperation {
    op: UserOperation,
    hash: B256,
}

impl HashedUserOperation {
    /// Returns the frozen operation.
    pub const fn operation(&self) -> &UserOperation {
        &self.op
    }

    /// Returns the hash the signature must cover.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// Attaches the encoded wallet signature.
    pub fn sign(self, signature: Bytes) -> SignedUserOperation {
        let Self { mut op, hash } = self;
        op.signature = signature;
        SignedUserOperation { op, hash }
    }
}

/// An operation ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUserOperation {
    op: UserOperation,
    hash: B256,
}

impl SignedUserOperation {
    /// Returns the signed operation.
    pub const fn operation(&self) -> &UserOperation {
        &self.op
    }

    /// Returns the operation hash.
    pub const fn hash(&self) -> B256 {
        self.hash
    }
}

/// Result of issuing an operation hash as a WebAuthn challenge.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    /// Request options restricted to the wallet's passkey, challenge = hash.
    pub options: PublicKeyCredentialRequestOptions,
    /// The completed operation the client must send back unchanged.
    pub operation: UserOperation,
    /// The operation hash.
    pub hash: B256,
}

/// Drives operations through the challenge state machine on one chain.
#[derive(Debug, Clone)]
pub struct UserOperationBuilder {
    chain: Arc<dyn ChainClient>,
    deriver: WalletAddressDeriver,
    entry_point: Address,
    paymaster: Option<Address>,
}

impl UserOperationBuilder {
    /// Creates a builder. `paymaster` is required only for sponsored operations.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        deriver: WalletAddressDeriver,
        entry_point: Address,
        paymaster: Option<Address>,
    ) -> Self {
        Self { chain, deriver, entry_point, paymaster }
    }

    /// Sets `initCode` to deploy the sender when it has no code yet.
    ///
    /// The sender must be the wallet the factory derives from `public_key` and
    /// `wallet_nonce`, otherwise [`WalletError::SenderMismatch`]. A deployed sender gets
    /// an empty `initCode`.
    pub async fn prepare_init_code(
        &self,
        draft: &mut UserOperationDraft,
        public_key: &[u8],
        wallet_nonce: U256,
    ) -> WalletResult<()> {
        let sender = draft.op.sender;
        let code = self.chain.code_at(sender).await.map_err(simulation)?;
        if !code.is_empty() {
            debug!(target: "passkey::builder", %sender, "Wallet already deployed");
            draft.op.init_code = Bytes::new();
            return Ok(());
        }

        let owner = self.deriver.derive_owner(public_key)?;
        let expected =
            self.deriver.compute_wallet_address(self.chain.as_ref(), &owner, wallet_nonce).await?;
        if expected != sender {
            return Err(WalletError::SenderMismatch { expected, actual: sender });
        }
        draft.op.init_code = self.deriver.init_code(&owner, wallet_nonce);
        debug!(target: "passkey::builder", %sender, %wallet_nonce, "Attached wallet deployment");
        Ok(())
    }

    /// Sets `paymasterAndData` to the configured paymaster when `sponsored`.
    pub fn attach_paymaster_data(
        &self,
        draft: &mut UserOperationDraft,
        sponsored: bool,
    ) -> WalletResult<()> {
        if !sponsored {
            return Ok(());
        }
        let paymaster = self.paymaster.ok_or_else(|| {
            WalletError::validation("sponsorship requested but no paymaster is configured")
        })?;
        draft.op.paymaster_and_data = Bytes::copy_from_slice(paymaster.as_slice());
        Ok(())
    }

    /// Asks the EntryPoint for the canonical hash of `op`.
    pub async fn compute_operation_hash(&self, op: &UserOperation) -> WalletResult<B256> {
        let data = encode_get_user_op_hash(op.clone().into());
        let output = self.chain.call_contract(self.entry_point, data).await.map_err(simulation)?;
        decode_user_op_hash(&output).map_err(|e| simulation(e.into()))
    }

    /// Freezes the draft under its canonical hash.
    pub async fn hash(&self, draft: UserOperationDraft) -> WalletResult<HashedUserOperation> {
        let hash = self.compute_operation_hash(&draft.op).await?;
        Ok(HashedUserOperation { op: draft.op, hash })
    }

    /// Issues the operation hash as a challenge only `passkey` may answer and persists
    /// it as a pending operation ceremony. Sign-in requests cannot redeem it.
    pub async fn issue_challenge(
        &self,
        hashed: HashedUserOperation,
        passkey: &Passkey,
        rp: &RelyingParty,
        datastore: &Datastore,
    ) -> WalletResult<IssuedChallenge> {
        let allowed = descriptor(passkey).map_err(|e| {
            WalletError::Internal(format!("stored credential id {} is corrupt: {e}", passkey.id))
        })?;
        let options = generate_authentication_options(rp, hashed.hash.as_slice(), vec![allowed]);
        datastore.store_pending(ChallengeKind::Operation, &PendingCeremony::from(&options)).await?;
        info!(
            target: "passkey::builder",
            sender = %hashed.op.sender,
            hash = %hashed.hash,
            passkey = %passkey.id,
            "Issued operation challenge"
        );
        Ok(IssuedChallenge { options, operation: hashed.op, hash: hashed.hash })
    }

    /// Re-binds an operation sent back by the client to the hash it was challenged with.
    ///
    /// Any change to a hashed field since the challenge was issued is rejected here
    /// rather than surfacing as an unverifiable signature on-chain.
    pub async fn resume(
        &self,
        op: UserOperation,
        challenge_hash: B256,
    ) -> WalletResult<HashedUserOperation> {
        let UserOperationDraft { op } = UserOperationDraft::new(op);
        let hash = self.compute_operation_hash(&op).await?;
        if hash != challenge_hash {
            return Err(WalletError::validation(format!(
                "user operation hash {hash} does not match the signed challenge {challenge_hash}"
            )));
        }
        Ok(HashedUserOperation { op, hash })
    }
}
