//! Registration and authentication options.

use coset::iana;
use passkey_types::webauthn::{
    AttestationConveyancePreference, AuthenticatorAttachment, AuthenticatorSelectionCriteria,
    PublicKeyCredentialParameters, PublicKeyCredentialRpEntity, PublicKeyCredentialType,
    PublicKeyCredentialUserEntity, ResidentKeyRequirement, UserVerificationRequirement,
};

use super::{
    Passkey, PublicKeyCredentialCreationOptions, PublicKeyCredentialDescriptor,
    PublicKeyCredentialRequestOptions, base64url,
};
use crate::{CEREMONY_TIMEOUT_MS, CHALLENGE_LENGTH};

/// Relying party settings shared by every ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    /// Relying party id (effective domain).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Exact origin ceremonies must run on.
    pub origin: String,
}

/// Returns a fresh random challenge.
pub fn random_challenge() -> [u8; CHALLENGE_LENGTH] {
    rand::random()
}

/// Describes `passkey` for an allow list.
///
/// Fails if the stored credential id is not base64url.
pub fn descriptor(
    passkey: &Passkey,
) -> Result<PublicKeyCredentialDescriptor, base64::DecodeError> {
    Ok(PublicKeyCredentialDescriptor {
        ty: PublicKeyCredentialType::PublicKey,
        id: base64url::decode(&passkey.id)?.into(),
        transports: (!passkey.transports.is_empty()).then(|| passkey.transports.clone()),
    })
}

/// Builds creation options for a new platform passkey named `key_name`.
pub fn generate_registration_options(
    rp: &RelyingParty,
    key_name: &str,
    challenge: &[u8],
) -> PublicKeyCredentialCreationOptions {
    let user_id: [u8; 32] = rand::random();
    PublicKeyCredentialCreationOptions {
        rp: PublicKeyCredentialRpEntity { id: Some(rp.id.clone()), name: rp.name.clone() },
        user: PublicKeyCredentialUserEntity {
            id: user_id.to_vec().into(),
            display_name: key_name.to_string(),
            name: key_name.to_string(),
        },
        challenge: challenge.to_vec().into(),
        pub_key_cred_params: vec![PublicKeyCredentialParameters {
            ty: PublicKeyCredentialType::PublicKey,
            alg: iana::Algorithm::ES256,
        }],
        timeout: Some(CEREMONY_TIMEOUT_MS),
        exclude_credentials: None,
        authenticator_selection: Some(AuthenticatorSelectionCriteria {
            authenticator_attachment: Some(AuthenticatorAttachment::Platform),
            resident_key: Some(ResidentKeyRequirement::Preferred),
            require_resident_key: false,
            user_verification: UserVerificationRequirement::Preferred,
        }),
        hints: None,
        attestation: AttestationConveyancePreference::None,
        attestation_formats: None,
        extensions: None,
    }
}

/// Builds request options for `challenge`, restricted to `allow_credentials` unless empty.
pub fn generate_authentication_options(
    rp: &RelyingParty,
    challenge: &[u8],
    allow_credentials: Vec<PublicKeyCredentialDescriptor>,
) -> PublicKeyCredentialRequestOptions {
    PublicKeyCredentialRequestOptions {
        challenge: challenge.to_vec().into(),
        timeout: Some(CEREMONY_TIMEOUT_MS),
        rp_id: Some(rp.id.clone()),
        allow_credentials: (!allow_credentials.is_empty()).then_some(allow_credentials),
        user_verification: UserVerificationRequirement::Preferred,
        attestation: Default::default(),
        attestation_formats: None,
        extensions: None,
        hints: None,
    }
}
