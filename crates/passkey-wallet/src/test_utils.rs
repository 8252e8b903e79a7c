//! Shared test utilities: an in-process chain and a software passkey authenticator.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use alloy_primitives::{Address, B256, Bytes, Log, U256, address, keccak256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use ciborium::Value;
use p256::ecdsa::{Signature, SigningKey, signature::Signer};
use parking_lot::Mutex;
use passkey_types::ctap2::Flags;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::{
    ENTRY_POINT_V06,
    chain::{ChainClient, ChainError, ChainResult, OperationReceipt},
    contracts::{
        entry_point::{
            self, BeforeExecution, IEntryPoint, UserOperationEvent, UserOperationRevertReason,
        },
        factory::ICoinbaseSmartWalletFactory,
    },
    cose::{self, Owner},
    user_operation::UserOperation,
    webauthn::{
        AuthenticatedPublicKeyCredential, AuthenticatorTransport, CreatedPublicKeyCredential,
        CredentialDeviceType, Passkey, RelyingParty, base64url,
    },
};

/// Coinbase Smart Wallet factory address used by [`MockChain`].
pub const TEST_FACTORY: Address = address!("0BA5ED0c6AA8c49038F819E587E2633c4A9F428a");

/// Chain id used by [`MockChain`] when hashing operations.
pub const TEST_CHAIN_ID: u64 = 1337;

/// Relying party id and origin [`SoftwareAuthenticator`] signs for by default.
pub const TEST_RP_ID: &str = "localhost";

/// Origin [`SoftwareAuthenticator`] reports by default.
pub const TEST_ORIGIN: &str = "http://localhost:3000";

/// How [`MockChain`] mines submitted bundles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceiptBehavior {
    /// Every operation executes successfully.
    #[default]
    Success,
    /// The transaction succeeds but each operation reports `success = false`.
    OperationFailed,
    /// As `OperationFailed`, with a `UserOperationRevertReason` first.
    OperationReverted,
    /// No receipt arrives before the deadline.
    Timeout,
}

#[derive(Debug, Default)]
struct MockState {
    code: HashMap<Address, Bytes>,
    network_calls: usize,
    call_error: Option<ChainError>,
    send_error: Option<ChainError>,
    receipt_behavior: ReceiptBehavior,
    sent: Vec<(Address, Bytes)>,
    pending: HashMap<B256, Bytes>,
}

/// In-process [`ChainClient`] emulating the factory and EntryPoint v0.6.
///
/// `createAccount` maps `(owners, nonce)` to an address by hashing, `getUserOpHash`
/// answers [`MockChain::operation_hash`], `handleOps` dry runs succeed and mined bundles emit
/// EntryPoint events according to [`ReceiptBehavior`]. Successful bundles deploy
/// senders that carried `initCode`.
#[derive(Debug)]
pub struct MockChain {
    /// EntryPoint address.
    pub entry_point: Address,
    /// Factory address.
    pub factory: Address,
    /// Chain id.
    pub chain_id: u64,
    /// Relayer account.
    pub relayer: Address,
    state: Mutex<MockState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            entry_point: ENTRY_POINT_V06,
            factory: TEST_FACTORY,
            chain_id: TEST_CHAIN_ID,
            relayer: Address::repeat_byte(0x4e),
            state: Mutex::new(MockState::default()),
        }
    }
}

impl MockChain {
    /// Returns the number of chain requests served so far.
    pub fn network_calls(&self) -> usize {
        self.state.lock().network_calls
    }

    /// Makes every subsequent `call_contract` fail with `err`.
    pub fn fail_calls(&self, err: ChainError) {
        self.state.lock().call_error = Some(err);
    }

    /// Makes every subsequent `send_transaction` fail with `err`.
    pub fn fail_sends(&self, err: ChainError) {
        self.state.lock().send_error = Some(err);
    }

    /// Sets how bundles are mined.
    pub fn set_receipt_behavior(&self, behavior: ReceiptBehavior) {
        self.state.lock().receipt_behavior = behavior;
    }

    /// Places `code` at `address`.
    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state.lock().code.insert(address, code);
    }

    /// Returns `(to, data)` of every transaction sent.
    pub fn sent_transactions(&self) -> Vec<(Address, Bytes)> {
        self.state.lock().sent.clone()
    }

    /// The address `createAccount(owners, nonce)` returns.
    pub fn account_address(owners: &[Bytes], nonce: U256) -> Address {
        Address::from_word(keccak256((owners.to_vec(), nonce).abi_encode()))
    }

    /// The hash `getUserOpHash` returns for `op`.
    ///
    /// Binds every field but the signature, the EntryPoint and the chain id. It is a
    /// stand-in for the EntryPoint's packing, not a reimplementation of it.
    pub fn operation_hash(&self, op: entry_point::UserOperation) -> B256 {
        let unsigned = entry_point::UserOperation { signature: Bytes::new(), ..op };
        keccak256((unsigned, self.entry_point, U256::from(self.chain_id)).abi_encode())
    }

    fn entry_point_call(&self, data: &[u8]) -> ChainResult<Bytes> {
        if let Ok(call) = IEntryPoint::getUserOpHashCall::abi_decode(data) {
            return Ok(self.operation_hash(call.userOp).abi_encode().into());
        }
        if IEntryPoint::handleOpsCall::abi_decode(data).is_ok() {
            return Ok(Bytes::new());
        }
        Err(ChainError::Reverted("unknown EntryPoint call".into()))
    }

    fn mine(
        &self,
        state: &mut MockState,
        tx_hash: B256,
        data: &[u8],
    ) -> ChainResult<OperationReceipt> {
        let call = IEntryPoint::handleOpsCall::abi_decode(data)?;
        let success = state.receipt_behavior == ReceiptBehavior::Success;

        let before = Log { address: self.entry_point, data: BeforeExecution {}.encode_log_data() };
        let mut logs = vec![before];
        for op in call.ops {
            let hash = self.operation_hash(op.clone());
            if state.receipt_behavior == ReceiptBehavior::OperationReverted {
                let reason = UserOperationRevertReason {
                    userOpHash: hash,
                    sender: op.sender,
                    nonce: op.nonce,
                    revertReason: Bytes::from_static(b"reverted"),
                };
                logs.push(Log { address: self.entry_point, data: reason.encode_log_data() });
            }
            let event = UserOperationEvent {
                userOpHash: hash,
                sender: op.sender,
                paymaster: Address::ZERO,
                nonce: op.nonce,
                success,
                actualGasCost: U256::from(21_000),
                actualGasUsed: U256::from(21_000),
            };
            logs.push(Log { address: self.entry_point, data: event.encode_log_data() });

            if success && !op.initCode.is_empty() {
                state.code.insert(op.sender, Bytes::from_static(&[0x60, 0x80]));
            }
        }

        Ok(OperationReceipt {
            transaction_hash: tx_hash,
            gas_used: 100_000,
            status: true,
            block_number: Some(1),
            logs,
        })
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn relayer_address(&self) -> Address {
        self.relayer
    }

    async fn code_at(&self, address: Address) -> ChainResult<Bytes> {
        let mut state = self.state.lock();
        state.network_calls += 1;
        Ok(state.code.get(&address).cloned().unwrap_or_default())
    }

    async fn call_contract(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        let mut state = self.state.lock();
        state.network_calls += 1;
        if let Some(err) = state.call_error.clone() {
            return Err(err);
        }
        drop(state);

        if to == self.factory {
            let call = ICoinbaseSmartWalletFactory::createAccountCall::abi_decode(&data)?;
            return Ok(Self::account_address(&call.owners, call.nonce).abi_encode().into());
        }
        if to == self.entry_point {
            return self.entry_point_call(&data);
        }
        Err(ChainError::Reverted(format!("no contract at {to}")))
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> ChainResult<B256> {
        let mut state = self.state.lock();
        state.network_calls += 1;
        if let Some(err) = state.send_error.clone() {
            return Err(err);
        }
        let nonce = state.sent.len() as u64;
        let tx_hash = keccak256((data.clone(), U256::from(nonce)).abi_encode());
        state.sent.push((to, data.clone()));
        state.pending.insert(tx_hash, data);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        _confirmations: u64,
        timeout: Duration,
    ) -> ChainResult<OperationReceipt> {
        let mut state = self.state.lock();
        state.network_calls += 1;
        if state.receipt_behavior == ReceiptBehavior::Timeout {
            return Err(ChainError::Timeout { tx_hash, waited: timeout });
        }
        let data = state
            .pending
            .remove(&tx_hash)
            .ok_or_else(|| ChainError::Transport(format!("unknown transaction {tx_hash}")))?;
        self.mine(&mut state, tx_hash, &data)
    }
}

/// A platform authenticator holding one P-256 credential in memory.
#[derive(Debug)]
pub struct SoftwareAuthenticator {
    signing_key: SigningKey,
    credential_id: Vec<u8>,
    rp_id: String,
    origin: String,
    user_verified: bool,
    counter: AtomicU32,
}

impl SoftwareAuthenticator {
    /// Creates an authenticator whose key and credential id are derived from `seed`.
    pub fn new(seed: u8) -> Self {
        let signing_key =
            SigningKey::from_bytes(&[seed.max(1); 32].into()).expect("seed is a valid scalar");
        Self {
            signing_key,
            credential_id: vec![seed; 16],
            rp_id: TEST_RP_ID.to_string(),
            origin: TEST_ORIGIN.to_string(),
            user_verified: true,
            counter: AtomicU32::new(0),
        }
    }

    /// Signs for `rp_id` instead of the default.
    pub fn with_rp_id(mut self, rp_id: impl Into<String>) -> Self {
        self.rp_id = rp_id.into();
        self
    }

    /// Reports `origin` in client data instead of the default.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Clears the user-verified flag in every response.
    pub fn without_user_verification(mut self) -> Self {
        self.user_verified = false;
        self
    }

    /// Returns the base64url credential id.
    pub fn credential_id(&self) -> String {
        base64url::encode(&self.credential_id)
    }

    /// Returns the credential public key as a COSE key.
    pub fn cose_key(&self) -> Vec<u8> {
        cose::encode_p256_key(self.signing_key.verifying_key()).expect("valid key")
    }

    /// Returns the wallet owner of this credential.
    pub fn owner(&self) -> Owner {
        cose::derive_owner(&self.cose_key()).expect("valid key")
    }

    /// Returns the signature counter of the last assertion.
    pub fn counter(&self) -> u32 {
        self.counter.load(Ordering::SeqCst)
    }

    fn client_data(&self, ceremony: &str, challenge: &str) -> String {
        json!({
            "type": ceremony,
            "challenge": challenge,
            "origin": self.origin,
            "crossOrigin": false,
        })
        .to_string()
    }

    fn flags(&self) -> Flags {
        if self.user_verified { Flags::UP | Flags::UV } else { Flags::UP }
    }

    fn authenticator_data(&self, flags: Flags, counter: u32) -> Vec<u8> {
        let mut data = Sha256::digest(self.rp_id.as_bytes()).to_vec();
        data.push(flags.bits());
        data.extend_from_slice(&counter.to_be_bytes());
        data
    }

    /// Signs `authenticator_data || SHA-256(client_data)` and returns the DER signature.
    pub fn sign(&self, authenticator_data: &[u8], client_data: &[u8]) -> Vec<u8> {
        let mut message = authenticator_data.to_vec();
        message.extend_from_slice(&Sha256::digest(client_data));
        let signature: Signature = self.signing_key.sign(&message);
        signature.to_der().as_bytes().to_vec()
    }

    fn attestation(&self, challenge: &str, packed: bool) -> CreatedPublicKeyCredential {
        let client_data = self.client_data("webauthn.create", challenge);

        let mut auth_data = self.authenticator_data(self.flags() | Flags::AT, 0);
        auth_data.extend_from_slice(&[0u8; 16]);
        auth_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&self.credential_id);
        auth_data.extend_from_slice(&self.cose_key());

        let (fmt, att_stmt) = if packed {
            let sig = self.sign(&auth_data, client_data.as_bytes());
            let stmt = vec![
                (Value::from("alg"), Value::from(crate::COSE_ALG_ES256)),
                (Value::from("sig"), Value::Bytes(sig)),
            ];
            ("packed", stmt)
        } else {
            ("none", Vec::new())
        };
        let object = Value::Map(vec![
            (Value::from("fmt"), Value::from(fmt)),
            (Value::from("attStmt"), Value::Map(att_stmt)),
            (Value::from("authData"), Value::Bytes(auth_data.clone())),
        ]);
        let mut attestation_object = Vec::new();
        ciborium::ser::into_writer(&object, &mut attestation_object).expect("CBOR encodes");

        serde_json::from_value(json!({
            "id": self.credential_id(),
            "rawId": self.credential_id(),
            "type": "public-key",
            "response": {
                "clientDataJSON": base64url::encode(client_data),
                "authenticatorData": base64url::encode(auth_data),
                "publicKeyAlgorithm": crate::COSE_ALG_ES256,
                "attestationObject": base64url::encode(attestation_object),
                "transports": ["internal", "hybrid"],
            },
            "authenticatorAttachment": "platform",
            "clientExtensionResults": {},
        }))
        .expect("valid attestation credential")
    }

    /// Answers base64url registration `challenge` with a `none` attestation.
    pub fn register(&self, challenge: &str) -> CreatedPublicKeyCredential {
        self.attestation(challenge, false)
    }

    /// Answers base64url registration `challenge` with a `packed` self attestation.
    pub fn register_packed(&self, challenge: &str) -> CreatedPublicKeyCredential {
        self.attestation(challenge, true)
    }

    /// Answers base64url authentication `challenge`, incrementing the signature counter.
    pub fn assert(&self, challenge: &str) -> AuthenticatedPublicKeyCredential {
        let counter = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let client_data = self.client_data("webauthn.get", challenge);
        let auth_data = self.authenticator_data(self.flags(), counter);
        let signature = self.sign(&auth_data, client_data.as_bytes());

        serde_json::from_value(json!({
            "id": self.credential_id(),
            "rawId": self.credential_id(),
            "type": "public-key",
            "response": {
                "clientDataJSON": base64url::encode(client_data),
                "authenticatorData": base64url::encode(auth_data),
                "signature": base64url::encode(signature),
            },
            "authenticatorAttachment": "platform",
            "clientExtensionResults": {},
        }))
        .expect("valid assertion credential")
    }
}

/// Relying party matching [`SoftwareAuthenticator`]'s defaults.
pub fn test_rp() -> RelyingParty {
    RelyingParty {
        id: TEST_RP_ID.to_string(),
        name: crate::DEFAULT_RP_NAME.to_string(),
        origin: TEST_ORIGIN.to_string(),
    }
}

/// A stored passkey for `authenticator` with counter 0.
pub fn test_passkey(authenticator: &SoftwareAuthenticator) -> Passkey {
    Passkey {
        id: authenticator.credential_id(),
        public_key: authenticator.cose_key().into(),
        web_authn_user_id: base64url::encode(b"test-user"),
        counter: 0,
        device_type: CredentialDeviceType::SingleDevice,
        backed_up: false,
        transports: vec![AuthenticatorTransport::Internal],
    }
}

/// An operation from `sender` with every other field zeroed or empty.
pub fn user_operation(sender: Address) -> UserOperation {
    UserOperation {
        sender,
        nonce: U256::ZERO,
        init_code: Bytes::new(),
        call_data: Bytes::new(),
        call_gas_limit: U256::ZERO,
        verification_gas_limit: U256::ZERO,
        pre_verification_gas: U256::ZERO,
        max_fee_per_gas: U256::ZERO,
        max_priority_fee_per_gas: U256::ZERO,
        paymaster_and_data: Bytes::new(),
        signature: Bytes::new(),
    }
}
