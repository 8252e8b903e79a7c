use alloy_primitives::{Bytes, U256};
use passkey_types::webauthn::AuthenticatorAssertionResponse;

use super::{EcdsaSignature, decode_der_signature, normalize_low_s};
use crate::{CryptoError, contracts::smart_wallet::WebAuthnAuth};

const CHALLENGE_KEY: &str = "\"challenge\"";
const TYPE_KEY: &str = "\"type\"";

/// Packages a WebAuthn assertion into the struct the wallet verifies on-chain.
///
/// The challenge and type indices are byte offsets of the quoted keys inside
/// `client_data_json`; `s` is low-S normalized.
pub fn build_webauthn_auth(
    authenticator_data: &[u8],
    client_data_json: &str,
    der_signature: &[u8],
) -> Result<WebAuthnAuth, CryptoError> {
    let challenge_index = client_data_json
        .find(CHALLENGE_KEY)
        .ok_or_else(|| CryptoError::InvalidClientData(format!("missing {CHALLENGE_KEY} key")))?;
    let type_index = client_data_json
        .find(TYPE_KEY)
        .ok_or_else(|| CryptoError::InvalidClientData(format!("missing {TYPE_KEY} key")))?;

    let EcdsaSignature { r, s } = decode_der_signature(der_signature)?;

    Ok(WebAuthnAuth {
        authenticatorData: Bytes::copy_from_slice(authenticator_data),
        clientDataJSON: client_data_json.to_owned(),
        challengeIndex: U256::from(challenge_index),
        typeIndex: U256::from(type_index),
        r,
        s: normalize_low_s(s),
    })
}

/// Builds the [`WebAuthnAuth`] of an assertion response.
pub fn webauthn_auth_from_assertion(
    assertion: &AuthenticatorAssertionResponse,
) -> Result<WebAuthnAuth, CryptoError> {
    let client_data_json = std::str::from_utf8(&assertion.client_data_json)
        .map_err(|e| CryptoError::InvalidClientData(format!("clientDataJSON: {e}")))?;
    build_webauthn_auth(&assertion.authenticator_data, client_data_json, &assertion.signature)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::hex;

    use super::*;
    use crate::{P256_N, P256_N_DIV_2, test_utils::SoftwareAuthenticator};

    const CLIENT_DATA: &str =
        r#"{"type":"webauthn.get","challenge":"3q2-7w","origin":"http://localhost:3000"}"#;

    fn der(r: U256, s: U256) -> Vec<u8> {
        let (r, s) = (r.to_be_bytes::<32>(), s.to_be_bytes::<32>());
        let mut out = vec![0x30, 4 + 33 + 33, 0x02, 33, 0x00];
        out.extend_from_slice(&r);
        out.extend_from_slice(&[0x02, 33, 0x00]);
        out.extend_from_slice(&s);
        out
    }

    #[test]
    fn test_offsets_point_at_quoted_keys() {
        let auth = build_webauthn_auth(
            &[0xaa; 37],
            CLIENT_DATA,
            &der(U256::from(1), U256::from(2)),
        )
        .unwrap();

        assert_eq!(auth.typeIndex, U256::from(1));
        assert_eq!(auth.challengeIndex, U256::from(23));
        let challenge_index = auth.challengeIndex.to::<usize>();
        assert!(CLIENT_DATA[challenge_index..].starts_with("\"challenge\""));
        assert_eq!(auth.clientDataJSON, CLIENT_DATA);
        assert_eq!(auth.authenticatorData.as_ref(), &[0xaa; 37]);
    }

    #[test]
    fn test_high_s_is_normalized() {
        let high_s = P256_N_DIV_2 + U256::from(5);
        let auth = build_webauthn_auth(&[], CLIENT_DATA, &der(U256::from(9), high_s)).unwrap();
        assert_eq!(auth.r, U256::from(9));
        assert_eq!(auth.s, P256_N - high_s);
        assert!(auth.s <= P256_N_DIV_2);
    }

    #[test]
    fn test_missing_challenge_key() {
        let err = build_webauthn_auth(
            &[],
            r#"{"type":"webauthn.get"}"#,
            &der(U256::from(1), U256::from(2)),
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidClientData(_)));
    }

    #[test]
    fn test_missing_type_key() {
        let err = build_webauthn_auth(
            &[],
            r#"{"challenge":"abc"}"#,
            &der(U256::from(1), U256::from(2)),
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidClientData(_)));
    }

    #[test]
    fn test_bad_signature_propagates() {
        let err = build_webauthn_auth(&[], CLIENT_DATA, &hex!("3106020101020101")).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedSignature(_)));
    }

    #[test]
    fn test_from_assertion() {
        let authenticator = SoftwareAuthenticator::new(1);
        let credential = authenticator.assert("3q2-7w");
        let auth = webauthn_auth_from_assertion(&credential.response).unwrap();

        let response = &credential.response;
        assert_eq!(auth.authenticatorData.as_ref(), response.authenticator_data.as_slice());
        assert_eq!(auth.clientDataJSON.as_bytes(), response.client_data_json.as_slice());
        assert!(auth.s <= P256_N_DIV_2);

        let mut bad = credential.response;
        bad.client_data_json = vec![0xff, 0xfe].into();
        assert!(matches!(
            webauthn_auth_from_assertion(&bad),
            Err(CryptoError::InvalidClientData(_))
        ));
    }
}
