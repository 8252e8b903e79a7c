//! WebAuthn ceremony verification.
//!
//! Verification of an assertion:
//! 1. Check `clientDataJSON` type, challenge and origin
//! 2. Check the rpId hash and user-presence flags in authenticator data
//! 3. Verify the P-256 signature over `authenticatorData || SHA-256(clientDataJSON)`
//!
//! Registration runs the same client-data and authenticator-data checks on the
//! attestation, extracts the new credential and checks `packed` self attestation.
//! Attestation trust chains are not evaluated.

use ciborium::Value;
use coset::CborSerializable;
use p256::ecdsa::{DerSignature, signature::Verifier as _};
use passkey_types::ctap2::{AuthenticatorData, Flags};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    AuthenticatedPublicKeyCredential, AuthenticatorTransport, ClientDataType,
    CreatedPublicKeyCredential, CredentialDeviceType, Passkey, base64url, parse_client_data,
};
use crate::{COSE_ALG_ES256, CryptoError, WalletError, cose};

/// Errors from WebAuthn ceremony verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Client data could not be decoded.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The client data type is not the expected ceremony.
    #[error("unexpected ceremony type {found}, expected {expected}")]
    CeremonyType {
        /// Expected ceremony type.
        expected: &'static str,
        /// Ceremony type found in client data.
        found: String,
    },

    /// The signed challenge is not the issued one.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The ceremony ran on another origin.
    #[error("unexpected origin {found}, expected {expected}")]
    OriginMismatch {
        /// Expected origin.
        expected: String,
        /// Origin found in client data.
        found: String,
    },

    /// The authenticator scoped the credential to another relying party.
    #[error("rpId hash mismatch")]
    RpIdMismatch,

    /// The user-present flag is not set.
    #[error("user not present")]
    UserNotPresent,

    /// User verification was required but not performed.
    #[error("user not verified")]
    UserNotVerified,

    /// The authenticator data is malformed.
    #[error("invalid authenticator data: {0}")]
    InvalidAuthenticatorData(String),

    /// The attestation object or statement is malformed.
    #[error("invalid attestation: {0}")]
    InvalidAttestation(String),

    /// The response belongs to another credential.
    #[error("credential id mismatch")]
    CredentialMismatch,

    /// The ECDSA signature does not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

impl From<VerificationError> for WalletError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Crypto(err) => Self::Crypto(err),
            err => Self::Authentication(err.to_string()),
        }
    }
}

/// What the relying party expects a ceremony to be bound to.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedCeremony<'a> {
    /// Base64url challenge issued with the options.
    pub challenge: &'a str,
    /// Exact origin of the relying party page, without trailing slash.
    pub origin: &'a str,
    /// Relying party id.
    pub rp_id: &'a str,
    /// Reject assertions without the user-verified flag.
    pub require_user_verification: bool,
}

/// Result of an authentication ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationOutcome {
    /// Whether the assertion verified.
    pub verified: bool,
    /// Signature counter to persist for the credential.
    pub new_counter: u32,
}

/// Credential extracted from a verified registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCredential {
    /// Base64url credential id.
    pub id: String,
    /// CBOR-encoded COSE public key.
    pub public_key: Vec<u8>,
    /// Initial signature counter.
    pub counter: u32,
    /// Device binding.
    pub device_type: CredentialDeviceType,
    /// Backup state.
    pub backed_up: bool,
    /// Transport hints.
    pub transports: Vec<AuthenticatorTransport>,
    /// Attestation statement format.
    pub fmt: String,
}

/// Verifies WebAuthn registration and authentication responses.
pub trait CeremonyVerifier: Send + Sync + std::fmt::Debug {
    /// Verifies a registration response and extracts the new credential.
    fn verify_registration(
        &self,
        response: &CreatedPublicKeyCredential,
        expected: &ExpectedCeremony<'_>,
    ) -> Result<RegisteredCredential, VerificationError>;

    /// Verifies an authentication response against a stored credential.
    fn verify_authentication(
        &self,
        response: &AuthenticatedPublicKeyCredential,
        expected: &ExpectedCeremony<'_>,
        credential: &Passkey,
    ) -> Result<AuthenticationOutcome, VerificationError>;
}

/// The CBOR map `{fmt, attStmt, authData}` of a registration response.
#[derive(Debug)]
struct AttestationObject {
    fmt: String,
    att_stmt: Vec<(Value, Value)>,
    auth_data: Vec<u8>,
}

impl AttestationObject {
    fn parse(bytes: &[u8]) -> Result<Self, VerificationError> {
        let bad = |msg: &str| VerificationError::InvalidAttestation(msg.to_string());
        let value: Value = ciborium::de::from_reader(bytes)
            .map_err(|e| VerificationError::InvalidAttestation(e.to_string()))?;
        let Value::Map(entries) = value else {
            return Err(bad("attestation object is not a map"));
        };

        let (mut fmt, mut att_stmt, mut auth_data) = (None, None, None);
        for (key, value) in entries {
            match (key.as_text(), value) {
                (Some("fmt"), Value::Text(v)) => fmt = Some(v),
                (Some("attStmt"), Value::Map(v)) => att_stmt = Some(v),
                (Some("authData"), Value::Bytes(v)) => auth_data = Some(v),
                _ => {}
            }
        }

        Ok(Self {
            fmt: fmt.ok_or_else(|| bad("missing fmt"))?,
            att_stmt: att_stmt.ok_or_else(|| bad("missing attStmt"))?,
            auth_data: auth_data.ok_or_else(|| bad("missing authData"))?,
        })
    }

    fn statement(&self, name: &str) -> Option<&Value> {
        self.att_stmt.iter().find(|(key, _)| key.as_text() == Some(name)).map(|(_, value)| value)
    }
}

fn parse_authenticator_data(bytes: &[u8]) -> Result<AuthenticatorData, VerificationError> {
    AuthenticatorData::from_slice(bytes)
        .map_err(|e| VerificationError::InvalidAuthenticatorData(e.to_string()))
}

/// [`CeremonyVerifier`] for ES256 (P-256) credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct P256CeremonyVerifier;

impl P256CeremonyVerifier {
    fn check_client_data(
        client_data_json: &[u8],
        ceremony: ClientDataType,
        ceremony_name: &'static str,
        expected: &ExpectedCeremony<'_>,
    ) -> Result<(), VerificationError> {
        let client_data = parse_client_data(client_data_json)?;
        if client_data.ty != ceremony {
            return Err(VerificationError::CeremonyType {
                expected: ceremony_name,
                found: format!("{:?}", client_data.ty),
            });
        }
        if client_data.challenge != expected.challenge {
            return Err(VerificationError::ChallengeMismatch);
        }
        if client_data.origin != expected.origin {
            return Err(VerificationError::OriginMismatch {
                expected: expected.origin.to_string(),
                found: client_data.origin,
            });
        }
        Ok(())
    }

    fn check_authenticator_data(
        auth_data: &AuthenticatorData,
        expected: &ExpectedCeremony<'_>,
    ) -> Result<(), VerificationError> {
        if auth_data.rp_id_hash() != Sha256::digest(expected.rp_id.as_bytes()).as_slice() {
            return Err(VerificationError::RpIdMismatch);
        }
        if !auth_data.flags.contains(Flags::UP) {
            return Err(VerificationError::UserNotPresent);
        }
        if expected.require_user_verification && !auth_data.flags.contains(Flags::UV) {
            return Err(VerificationError::UserNotVerified);
        }
        Ok(())
    }

    fn verify_signature(
        public_key: &[u8],
        auth_data: &[u8],
        client_data_json: &[u8],
        signature: &[u8],
    ) -> Result<(), VerificationError> {
        let key = cose::derive_owner(public_key)?.verifying_key()?;
        let signature = DerSignature::from_bytes(signature)
            .map_err(|e| VerificationError::InvalidSignature(e.to_string()))?;

        let mut signed_data = Vec::with_capacity(auth_data.len() + 32);
        signed_data.extend_from_slice(auth_data);
        signed_data.extend_from_slice(&Sha256::digest(client_data_json));

        key.verify(&signed_data, &signature)
            .map_err(|e| VerificationError::InvalidSignature(e.to_string()))
    }

    fn check_attestation_statement(
        attestation: &AttestationObject,
        public_key: &[u8],
        client_data_json: &[u8],
    ) -> Result<(), VerificationError> {
        match attestation.fmt.as_str() {
            "none" => Ok(()),
            "packed" if attestation.statement("x5c").is_none() => {
                let alg = attestation
                    .statement("alg")
                    .and_then(Value::as_integer)
                    .map(i128::from)
                    .ok_or_else(|| VerificationError::InvalidAttestation("missing alg".into()))?;
                if alg != i128::from(COSE_ALG_ES256) {
                    return Err(VerificationError::InvalidAttestation(format!(
                        "unsupported self attestation alg {alg}"
                    )));
                }
                let sig = attestation
                    .statement("sig")
                    .and_then(Value::as_bytes)
                    .ok_or_else(|| VerificationError::InvalidAttestation("missing sig".into()))?;
                Self::verify_signature(public_key, &attestation.auth_data, client_data_json, sig)
            }
            fmt => {
                debug!(target: "passkey::webauthn", fmt, "Attestation statement not evaluated");
                Ok(())
            }
        }
    }
}

impl CeremonyVerifier for P256CeremonyVerifier {
    fn verify_registration(
        &self,
        response: &CreatedPublicKeyCredential,
        expected: &ExpectedCeremony<'_>,
    ) -> Result<RegisteredCredential, VerificationError> {
        let client_data = response.response.client_data_json.as_slice();
        Self::check_client_data(client_data, ClientDataType::Create, "webauthn.create", expected)?;

        let attestation = AttestationObject::parse(&response.response.attestation_object)?;
        let auth_data = parse_authenticator_data(&attestation.auth_data)?;
        Self::check_authenticator_data(&auth_data, expected)?;

        let credential = auth_data.attested_credential_data.as_ref().ok_or_else(|| {
            VerificationError::InvalidAuthenticatorData("missing attested credential data".into())
        })?;
        if credential.credential_id() != response.raw_id.as_slice()
            || base64url::encode(response.raw_id.as_slice()) != response.id
        {
            return Err(VerificationError::CredentialMismatch);
        }

        let public_key = credential
            .key
            .clone()
            .to_vec()
            .map_err(|e| VerificationError::InvalidAuthenticatorData(e.to_string()))?;
        Self::check_attestation_statement(&attestation, &public_key, client_data)?;

        let device_type = if auth_data.flags.contains(Flags::BE) {
            CredentialDeviceType::MultiDevice
        } else {
            CredentialDeviceType::SingleDevice
        };

        Ok(RegisteredCredential {
            id: response.id.clone(),
            public_key,
            counter: auth_data.counter.unwrap_or_default(),
            device_type,
            backed_up: auth_data.flags.contains(Flags::BS),
            transports: response.response.transports.clone().unwrap_or_default(),
            fmt: attestation.fmt,
        })
    }

    fn verify_authentication(
        &self,
        response: &AuthenticatedPublicKeyCredential,
        expected: &ExpectedCeremony<'_>,
        credential: &Passkey,
    ) -> Result<AuthenticationOutcome, VerificationError> {
        if response.id != credential.id {
            return Err(VerificationError::CredentialMismatch);
        }
        let client_data = response.response.client_data_json.as_slice();
        Self::check_client_data(client_data, ClientDataType::Get, "webauthn.get", expected)?;

        let raw_auth_data = response.response.authenticator_data.as_slice();
        let auth_data = parse_authenticator_data(raw_auth_data)?;
        Self::check_authenticator_data(&auth_data, expected)?;

        Self::verify_signature(
            &credential.public_key,
            raw_auth_data,
            client_data,
            &response.response.signature,
        )?;

        let new_counter = auth_data.counter.unwrap_or_default();
        if (new_counter != 0 || credential.counter != 0) && new_counter <= credential.counter {
            warn!(
                target: "passkey::webauthn",
                credential = %credential.id,
                stored = credential.counter,
                received = new_counter,
                "Signature counter did not increase"
            );
        }

        Ok(AuthenticationOutcome { verified: true, new_counter })
    }
}
