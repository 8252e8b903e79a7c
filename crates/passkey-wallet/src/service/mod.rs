//! The request pipelines of the relayer.
//!
//! Every request runs as an independent sequential pipeline over shared read-only
//! configuration, the per-chain client handles and the datastore. The only state
//! carried between requests is a pending ceremony keyed by its kind and challenge,
//! redeemed at most once.

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256, Bytes, U256};
use tracing::{info, warn};

use crate::{
    DEFAULT_OWNER_INDEX, WalletError, WalletResult,
    address::WalletAddressDeriver,
    chain::{ChainClient, ChainRegistry},
    contracts::smart_wallet,
    executor::OperationExecutor,
    metrics,
    signature::signature_from_assertion,
    store::{ChallengeKind, Datastore},
    user_operation::{UserOperation, UserOperationBuilder, UserOperationDraft},
    webauthn::{
        AuthenticatedPublicKeyCredential, CeremonyVerifier, CreatedPublicKeyCredential,
        ExpectedCeremony, Passkey, PendingCeremony, PublicKeyCredentialCreationOptions,
        PublicKeyCredentialRequestOptions, RelyingParty, generate_authentication_options,
        generate_registration_options, parse_client_data, random_challenge,
    },
};

mod types;

pub use types::{
    BatchCall, ExecuteUserOperationResponse, ReceiptStatus, ReceiptSummary,
    UserOperationHashOptionsResponse, WalletAddressResponse,
};


/// Deployment-wide settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSettings {
    /// Relying party ceremonies are bound to.
    pub rp: RelyingParty,
    /// EntryPoint v0.6 address.
    pub entry_point: Address,
    /// Smart wallet factory address.
    pub factory: Address,
    /// Paymaster used for sponsored operations.
    pub paymaster: Option<Address>,
    /// Confirmations awaited after submission.
    pub confirmations: u64,
    /// Deadline for the confirmations.
    pub confirmation_timeout: Duration,
    /// Reject assertions without the user-verified flag.
    pub require_user_verification: bool,
}

/// Registration, sign-in and operation execution for passkey wallets.
#[derive(Debug, Clone)]
pub struct PasskeyWalletService {
    chains: ChainRegistry,
    datastore: Datastore,
    verifier: Arc<dyn CeremonyVerifier>,
    settings: WalletSettings,
}

fn parse_nonce(nonce: i64) -> WalletResult<u64> {
    u64::try_from(nonce).map_err(|_| WalletError::validation("nonce must be non-negative"))
}

fn challenge_of(client_data_json: &[u8]) -> WalletResult<String> {
    Ok(parse_client_data(client_data_json)?.challenge)
}

impl PasskeyWalletService {
    /// Creates the service.
    pub fn new(
        chains: ChainRegistry,
        datastore: Datastore,
        verifier: Arc<dyn CeremonyVerifier>,
        settings: WalletSettings,
    ) -> Self {
        Self { chains, datastore, verifier, settings }
    }

    /// Returns the shared settings.
    pub const fn settings(&self) -> &WalletSettings {
        &self.settings
    }

    const fn deriver(&self) -> WalletAddressDeriver {
        WalletAddressDeriver::new(self.settings.factory)
    }

    fn expected<'a>(&'a self, challenge: &'a str) -> ExpectedCeremony<'a> {
        ExpectedCeremony {
            challenge,
            origin: &self.settings.rp.origin,
            rp_id: &self.settings.rp.id,
            require_user_verification: self.settings.require_user_verification,
        }
    }

    async fn wallet_address(
        &self,
        chain: &dyn ChainClient,
        passkey: &Passkey,
        nonce: u64,
    ) -> WalletResult<Address> {
        let deriver = self.deriver();
        let owner = deriver.derive_owner(&passkey.public_key)?;
        deriver.compute_wallet_address(chain, &owner, U256::from(nonce)).await
    }

    /// Issues creation options for a new passkey named `key_name`.
    pub async fn generate_registration_options(
        &self,
        key_name: &str,
    ) -> WalletResult<PublicKeyCredentialCreationOptions> {
        let key_name = key_name.trim();
        if key_name.is_empty() {
            return Err(WalletError::validation("key name must not be empty"));
        }
        let options =
            generate_registration_options(&self.settings.rp, key_name, &random_challenge());
        let kind = ChallengeKind::Registration;
        self.datastore.store_pending(kind, &PendingCeremony::from(&options)).await?;
        metrics::record_challenge_issued(kind.label());
        Ok(options)
    }

    /// Verifies a registration and stores the new passkey.
    ///
    /// The key is validated and the nonce-0 wallet address computed before anything is
    /// persisted.
    pub async fn verify_registration(
        &self,
        response: CreatedPublicKeyCredential,
        chain: &str,
    ) -> WalletResult<WalletAddressResponse> {
        let kind = ChallengeKind::Registration;
        let client = self.chains.get(chain)?;
        let challenge = challenge_of(&response.response.client_data_json)?;
        let pending = self
            .datastore
            .take_pending(kind, &challenge)
            .await?
            .ok_or_else(|| WalletError::not_found("no pending registration for this challenge"))?;
        let user_id = pending
            .user_id
            .clone()
            .ok_or_else(|| WalletError::Internal("pending registration has no user id".into()))?;

        let credential = self
            .verifier
            .verify_registration(&response, &self.expected(&pending.challenge))
            .inspect_err(|_| metrics::record_verification_failure(kind.label()))?;
        if self.datastore.get_passkey(&credential.id).await?.is_some() {
            return Err(WalletError::validation("passkey already exists"));
        }

        let passkey = Passkey {
            id: credential.id,
            public_key: credential.public_key.into(),
            web_authn_user_id: user_id,
            counter: credential.counter,
            device_type: credential.device_type,
            backed_up: credential.backed_up,
            transports: credential.transports,
        };
        let address = self.wallet_address(client.as_ref(), &passkey, 0).await?;
        self.datastore.store_passkey(&passkey).await?;

        metrics::record_registration();
        info!(
            target: "passkey::service",
            passkey = %passkey.id,
            %address,
            fmt = %credential.fmt,
            "Registered passkey"
        );
        Ok(WalletAddressResponse { passkey_id: passkey.id, nonce: 0, address })
    }

    /// Issues sign-in options for any stored passkey.
    pub async fn generate_authentication_options(
        &self,
    ) -> WalletResult<PublicKeyCredentialRequestOptions> {
        let options =
            generate_authentication_options(&self.settings.rp, &random_challenge(), Vec::new());
        let kind = ChallengeKind::Authentication;
        self.datastore.store_pending(kind, &PendingCeremony::from(&options)).await?;
        metrics::record_challenge_issued(kind.label());
        Ok(options)
    }

    /// Redeems the `kind` challenge of `response`, verifies it and advances the passkey
    /// counter.
    ///
    /// Returns the passkey and the redeemed ceremony. A challenge issued for another
    /// kind is not found.
    async fn authenticate(
        &self,
        response: &AuthenticatedPublicKeyCredential,
        kind: ChallengeKind,
    ) -> WalletResult<(Passkey, PendingCeremony)> {
        let challenge = challenge_of(&response.response.client_data_json)?;
        let pending = self
            .datastore
            .take_pending(kind, &challenge)
            .await?
            .ok_or_else(|| WalletError::not_found("no pending authentication for this challenge"))?;
        if !pending.allows(&response.id) {
            metrics::record_verification_failure(kind.label());
            return Err(WalletError::authentication("credential is not allowed for this challenge"));
        }

        let mut passkey = self
            .datastore
            .get_passkey(&response.id)
            .await?
            .ok_or_else(|| WalletError::not_found(format!("passkey {}", response.id)))?;
        let outcome = self
            .verifier
            .verify_authentication(response, &self.expected(&pending.challenge), &passkey)
            .inspect_err(|_| metrics::record_verification_failure(kind.label()))?;
        if !outcome.verified {
            metrics::record_verification_failure(kind.label());
            return Err(WalletError::authentication("verification failed"));
        }

        passkey.counter = outcome.new_counter;
        self.datastore.store_passkey(&passkey).await?;
        Ok((passkey, pending))
    }

    /// Signs in with a passkey and returns its wallet at `nonce`.
    ///
    /// Only sign-in challenges are accepted. Operation challenges stay pending.
    pub async fn compute_wallet_address(
        &self,
        response: AuthenticatedPublicKeyCredential,
        chain: &str,
        nonce: i64,
    ) -> WalletResult<WalletAddressResponse> {
        let nonce = parse_nonce(nonce)?;
        let client = self.chains.get(chain)?;
        let (passkey, _) = self.authenticate(&response, ChallengeKind::Authentication).await?;
        let address = self.wallet_address(client.as_ref(), &passkey, nonce).await?;
        Ok(WalletAddressResponse { passkey_id: passkey.id, nonce, address })
    }

    fn builder(&self, chain: Arc<dyn ChainClient>) -> UserOperationBuilder {
        UserOperationBuilder::new(
            chain,
            self.deriver(),
            self.settings.entry_point,
            self.settings.paymaster,
        )
    }

    /// Completes `user_op` for the wallet of `passkey_id` at `wallet_nonce` and issues its
    /// hash as a challenge only that passkey can answer.
    pub async fn generate_user_operation_hash_options(
        &self,
        passkey_id: &str,
        chain: &str,
        user_op: UserOperation,
        wallet_nonce: i64,
        use_paymaster: bool,
    ) -> WalletResult<UserOperationHashOptionsResponse> {
        let wallet_nonce = parse_nonce(wallet_nonce)?;
        let client = self.chains.get(chain)?;
        let passkey = self
            .datastore
            .get_passkey(passkey_id)
            .await?
            .ok_or_else(|| WalletError::not_found(format!("passkey {passkey_id}")))?;

        let builder = self.builder(client);
        let mut draft = UserOperationDraft::new(user_op);
        builder.prepare_init_code(&mut draft, &passkey.public_key, U256::from(wallet_nonce)).await?;
        builder.attach_paymaster_data(&mut draft, use_paymaster)?;
        let hashed = builder.hash(draft).await?;
        let issued =
            builder.issue_challenge(hashed, &passkey, &self.settings.rp, &self.datastore).await?;
        metrics::record_challenge_issued(ChallengeKind::Operation.label());

        Ok(UserOperationHashOptionsResponse {
            options: issued.options,
            user_op: issued.operation,
            user_op_hash: issued.hash,
        })
    }

    /// Redeems an operation challenge, signs `user_op` with the assertion and submits it.
    ///
    /// The assertion is decoded into the wallet signature before any state is touched.
    /// `user_op` must be the operation returned with the challenge; any change to it is
    /// rejected.
    pub async fn execute_user_operation(
        &self,
        response: AuthenticatedPublicKeyCredential,
        chain: &str,
        user_op: UserOperation,
    ) -> WalletResult<ExecuteUserOperationResponse> {
        let client = self.chains.get(chain)?;
        let signature =
            signature_from_assertion(U256::from(DEFAULT_OWNER_INDEX), &response.response)?;

        let (passkey, pending) = self.authenticate(&response, ChallengeKind::Operation).await?;
        let challenge_hash = pending
            .challenge_bytes()
            .ok()
            .filter(|bytes| bytes.len() == 32)
            .map(|bytes| B256::from_slice(&bytes))
            .ok_or_else(|| WalletError::validation("challenge is not an operation hash"))?;

        let hashed = self.builder(client.clone()).resume(user_op, challenge_hash).await?;
        let signed = hashed.sign(signature);
        let executor = OperationExecutor::new(
            client.clone(),
            self.settings.entry_point,
            self.settings.confirmations,
            self.settings.confirmation_timeout,
        );

        let result = executor.submit(&signed, client.relayer_address()).await;
        match &result {
            Ok(result) => {
                metrics::record_operation_submitted(chain);
                metrics::record_operation_outcome(chain, result.success);
            }
            Err(err) if err.is_retryable() => {
                metrics::record_operation_submitted(chain);
                warn!(
                    target: "passkey::service",
                    passkey = %passkey.id,
                    error = %err,
                    "Submitted operation unresolved"
                );
            }
            Err(_) => {}
        }
        Ok(result?.into())
    }

    /// Encodes `calls` as the wallet's `executeBatch` calldata.
    pub fn encode_execute_batch(&self, calls: Vec<BatchCall>) -> Bytes {
        smart_wallet::encode_execute_batch(calls.into_iter().map(Into::into).collect())
    }
}
