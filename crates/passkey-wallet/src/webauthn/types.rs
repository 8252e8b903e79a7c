//! The stored passkey record and pending ceremony state.
//!
//! Credential responses and options use the `passkey-types` models, which carry
//! binary fields as base64url in JSON.

use alloy_primitives::Bytes;
pub use passkey_types::webauthn::{
    AuthenticatedPublicKeyCredential, AuthenticatorTransport, ClientDataType,
    CollectedClientData, CreatedPublicKeyCredential, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialDescriptor, PublicKeyCredentialRequestOptions,
};
use serde::{Deserialize, Serialize};

use super::base64url;
use crate::CryptoError;

/// Whether a credential is bound to one device or synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialDeviceType {
    /// Not eligible for backup.
    SingleDevice,
    /// Backup eligible, may be synced across devices.
    MultiDevice,
}

/// A registered WebAuthn credential, persisted indefinitely under its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passkey {
    /// Base64url credential id.
    pub id: String,
    /// CBOR-encoded COSE public key.
    pub public_key: Bytes,
    /// Base64url user handle issued with the registration options.
    #[serde(rename = "webAuthnUserID")]
    pub web_authn_user_id: String,
    /// Last signature counter reported by the authenticator.
    pub counter: u32,
    /// Device binding of the credential.
    pub device_type: CredentialDeviceType,
    /// Whether the credential is currently backed up.
    pub backed_up: bool,
    /// Transport hints reported at registration.
    #[serde(default)]
    pub transports: Vec<AuthenticatorTransport>,
}

/// What is kept of issued options until their challenge is answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingCeremony {
    /// Base64url challenge, as echoed in `clientDataJSON`.
    pub challenge: String,
    /// Base64url user handle of a pending registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Base64url ids of the credentials allowed to answer. Empty allows any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<String>,
}

impl PendingCeremony {
    /// Returns true if `credential_id` may answer this challenge.
    pub fn allows(&self, credential_id: &str) -> bool {
        self.allow_credentials.is_empty()
            || self.allow_credentials.iter().any(|id| id == credential_id)
    }

    /// Decodes the challenge bytes.
    pub fn challenge_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64url::decode(&self.challenge)
    }
}

impl From<&PublicKeyCredentialCreationOptions> for PendingCeremony {
    fn from(options: &PublicKeyCredentialCreationOptions) -> Self {
        Self {
            challenge: base64url::encode(options.challenge.as_slice()),
            user_id: Some(base64url::encode(options.user.id.as_slice())),
            allow_credentials: Vec::new(),
        }
    }
}

impl From<&PublicKeyCredentialRequestOptions> for PendingCeremony {
    fn from(options: &PublicKeyCredentialRequestOptions) -> Self {
        let allow_credentials = options
            .allow_credentials
            .iter()
            .flatten()
            .map(|descriptor| base64url::encode(descriptor.id.as_slice()))
            .collect();
        Self {
            challenge: base64url::encode(options.challenge.as_slice()),
            user_id: None,
            allow_credentials,
        }
    }
}

/// Parses raw `clientDataJSON` bytes.
pub fn parse_client_data(client_data_json: &[u8]) -> Result<CollectedClientData, CryptoError> {
    serde_json::from_slice(client_data_json)
        .map_err(|e| CryptoError::InvalidClientData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_assertion_from_browser_json() {
        let credential: AuthenticatedPublicKeyCredential = serde_json::from_value(json!({
            "id": "Y3JlZA",
            "rawId": "Y3JlZA",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AAAA",
                "signature": "MEQ",
                "userHandle": "dXNlcg"
            },
            "authenticatorAttachment": "platform",
            "clientExtensionResults": {}
        }))
        .unwrap();
        assert_eq!(credential.id, "Y3JlZA");
        assert_eq!(credential.raw_id.as_slice(), b"cred");
        assert_eq!(credential.response.client_data_json.as_slice(), b"{}");
        let user_handle = credential.response.user_handle.as_ref().map(|handle| handle.to_vec());
        assert_eq!(user_handle, Some(b"user".to_vec()));
    }

    #[test]
    fn test_passkey_field_names() {
        let passkey = Passkey {
            id: "abc".into(),
            public_key: Bytes::from_static(&[1, 2]),
            web_authn_user_id: "dXNlcg".into(),
            counter: 4,
            device_type: CredentialDeviceType::MultiDevice,
            backed_up: true,
            transports: vec![AuthenticatorTransport::Internal],
        };
        let value = serde_json::to_value(&passkey).unwrap();
        assert_eq!(value["webAuthnUserID"], "dXNlcg");
        assert_eq!(value["deviceType"], "multiDevice");
        assert_eq!(value["backedUp"], true);
        assert_eq!(value["transports"], json!(["internal"]));
        assert_eq!(serde_json::from_value::<Passkey>(value).unwrap(), passkey);
    }

    #[test]
    fn test_pending_ceremony_allow_list() {
        let open =
            PendingCeremony { challenge: "AA".into(), user_id: None, allow_credentials: vec![] };
        assert!(open.allows("anything"));

        let restricted = PendingCeremony { allow_credentials: vec!["Y3JlZA".into()], ..open };
        assert!(restricted.allows("Y3JlZA"));
        assert!(!restricted.allows("b3RoZXI"));
        assert_eq!(restricted.challenge_bytes().unwrap(), vec![0]);
    }

    #[test]
    fn test_parse_client_data() {
        let raw = br#"{"type":"webauthn.get","challenge":"abc","origin":"http://localhost:3000"}"#;
        let client_data = parse_client_data(raw).unwrap();
        assert_eq!(client_data.ty, ClientDataType::Get);
        assert_eq!(client_data.challenge, "abc");
        assert_eq!(client_data.origin, "http://localhost:3000");

        assert!(matches!(parse_client_data(b"[]"), Err(CryptoError::InvalidClientData(_))));
    }
}
