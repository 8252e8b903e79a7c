use alloy_primitives::{Bytes, U256};
use alloy_sol_types::SolValue;
use passkey_types::webauthn::AuthenticatorAssertionResponse;

use super::webauthn_auth_from_assertion;
use crate::{
    CryptoError,
    contracts::smart_wallet::{SignatureWrapper, WebAuthnAuth},
};

/// Encodes `abi.encode(SignatureWrapper(ownerIndex, abi.encode(auth)))`.
///
/// Both levels are encoded as a single dynamic tuple, exactly as the wallet's
/// `abi.decode(signature, (SignatureWrapper))` and `abi.decode(data, (WebAuthnAuth))`
/// expect them. A layout deviation does not fail decoding on-chain, it yields a
/// signature that never verifies.
pub fn encode_signature(owner_index: U256, auth: &WebAuthnAuth) -> Bytes {
    let wrapper =
        SignatureWrapper { ownerIndex: owner_index, signatureData: auth.abi_encode().into() };
    wrapper.abi_encode().into()
}

/// Builds `UserOperation.signature` from a device assertion.
pub fn signature_from_assertion(
    owner_index: U256,
    assertion: &AuthenticatorAssertionResponse,
) -> Result<Bytes, CryptoError> {
    let auth = webauthn_auth_from_assertion(assertion)?;
    Ok(encode_signature(owner_index, &auth))
}
