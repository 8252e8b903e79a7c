//! COSE public keys and the on-chain owner identity derived from them.

use alloy_primitives::Bytes;
use coset::{CborSerializable, CoseKey, CoseKeyBuilder, KeyType, Label, cbor::value::Value, iana};
use p256::{EncodedPoint, FieldBytes, ecdsa::VerifyingKey};

use crate::{COORDINATE_LENGTH, CryptoError, OWNER_LENGTH};

/// The wallet's on-chain signer identity: the 64-byte concatenation `x || y`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner([u8; OWNER_LENGTH]);

impl Owner {
    /// Builds an owner from its affine coordinates.
    pub fn from_coordinates(x: &[u8; COORDINATE_LENGTH], y: &[u8; COORDINATE_LENGTH]) -> Self {
        let mut owner = [0u8; OWNER_LENGTH];
        owner[..COORDINATE_LENGTH].copy_from_slice(x);
        owner[COORDINATE_LENGTH..].copy_from_slice(y);
        Self(owner)
    }

    /// Returns the raw 64 bytes.
    pub const fn as_bytes(&self) -> &[u8; OWNER_LENGTH] {
        &self.0
    }

    /// Returns the owner as ABI `bytes`, the form the factory expects in `owners`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }

    /// Returns the P-256 verifying key for this owner.
    pub fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        let (x, y) = self.0.split_at(COORDINATE_LENGTH);
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(x),
            FieldBytes::from_slice(y),
            false,
        );
        VerifyingKey::from_encoded_point(&point)
            .map_err(|_| CryptoError::InvalidKey("point is not on the P-256 curve".into()))
    }
}

impl std::fmt::Debug for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Owner({})", alloy_primitives::hex::encode_prefixed(self.0))
    }
}

fn parameter(key: &CoseKey, label: iana::Ec2KeyParameter) -> Option<&Value> {
    let label = Label::Int(label as i64);
    key.params.iter().find(|(key_label, _)| *key_label == label).map(|(_, value)| value)
}

fn coordinate(
    key: &CoseKey,
    label: iana::Ec2KeyParameter,
    name: &str,
) -> Result<[u8; COORDINATE_LENGTH], CryptoError> {
    let bytes = parameter(key, label)
        .and_then(Value::as_bytes)
        .ok_or_else(|| CryptoError::InvalidKey(format!("missing {name} coordinate")))?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidKey(format!(
            "{name} coordinate is {} bytes, expected {COORDINATE_LENGTH}",
            bytes.len()
        ))
    })
}

/// Derives the wallet owner from a CBOR-encoded COSE public key.
///
/// Fails with [`CryptoError::InvalidKey`] unless the key is EC2 on P-256 with both
/// coordinates present and exactly 32 bytes long.
pub fn derive_owner(cose_key: &[u8]) -> Result<Owner, CryptoError> {
    let key = CoseKey::from_slice(cose_key)
        .map_err(|e| CryptoError::InvalidKey(format!("not a COSE key: {e}")))?;

    if key.kty != KeyType::Assigned(iana::KeyType::EC2) {
        return Err(CryptoError::InvalidKey(format!("key type {:?} is not EC2", key.kty)));
    }
    let p256 = iana::EllipticCurve::P_256 as i128;
    let curve = parameter(&key, iana::Ec2KeyParameter::Crv).and_then(Value::as_integer);
    if let Some(crv) = curve.map(i128::from).filter(|crv| *crv != p256) {
        return Err(CryptoError::InvalidKey(format!("curve {crv} is not P-256")));
    }

    let x = coordinate(&key, iana::Ec2KeyParameter::X, "x")?;
    let y = coordinate(&key, iana::Ec2KeyParameter::Y, "y")?;
    Ok(Owner::from_coordinates(&x, &y))
}

/// Encodes a P-256 verifying key as an ES256 COSE key.
pub fn encode_p256_key(key: &VerifyingKey) -> Result<Vec<u8>, CryptoError> {
    let point = key.to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(CryptoError::InvalidKey("identity point has no coordinates".into()));
    };
    CoseKeyBuilder::new_ec2_pub_key(iana::EllipticCurve::P_256, x.to_vec(), y.to_vec())
        .algorithm(iana::Algorithm::ES256)
        .build()
        .to_vec()
        .map_err(|e| CryptoError::InvalidKey(format!("failed to encode COSE key: {e}")))
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::SigningKey;

    use super::*;

    fn encode(entries: Vec<(i64, Value)>) -> Vec<u8> {
        let map = Value::Map(entries.into_iter().map(|(k, v)| (Value::from(k), v)).collect());
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&map, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_owner_is_x_then_y() {
        let key = encode(vec![
            (1, Value::from(2)),
            (3, Value::from(-7)),
            (-1, Value::from(1)),
            (-2, Value::Bytes(vec![0x11; 32])),
            (-3, Value::Bytes(vec![0x22; 32])),
        ]);
        let owner = derive_owner(&key).unwrap();
        assert_eq!(&owner.as_bytes()[..32], &[0x11; 32]);
        assert_eq!(&owner.as_bytes()[32..], &[0x22; 32]);
        assert_eq!(derive_owner(&key).unwrap(), owner);
    }

    #[test]
    fn test_round_trip_through_verifying_key() {
        let signing_key = SigningKey::from_bytes(&[42u8; 32].into()).unwrap();
        let verifying_key = *signing_key.verifying_key();
        let cose = encode_p256_key(&verifying_key).unwrap();

        let owner = derive_owner(&cose).unwrap();
        assert_eq!(owner.verifying_key().unwrap(), verifying_key);
        assert_eq!(&owner.as_bytes()[..], &verifying_key.to_encoded_point(false).as_bytes()[1..]);
    }

    #[test]
    fn test_rejects_okp_key() {
        let key = encode(vec![(1, Value::from(1)), (-2, Value::Bytes(vec![0x11; 32]))]);
        assert!(matches!(derive_owner(&key), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_rejects_missing_y() {
        let key = encode(vec![(1, Value::from(2)), (-2, Value::Bytes(vec![0x11; 32]))]);
        let err = derive_owner(&key).unwrap_err();
        assert_eq!(err, CryptoError::InvalidKey("missing y coordinate".into()));
    }

    #[test]
    fn test_rejects_short_coordinate() {
        let key = encode(vec![
            (1, Value::from(2)),
            (-2, Value::Bytes(vec![0x11; 31])),
            (-3, Value::Bytes(vec![0x22; 32])),
        ]);
        assert!(matches!(derive_owner(&key), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_rejects_other_curve() {
        let key = encode(vec![
            (1, Value::from(2)),
            (-1, Value::from(2)),
            (-2, Value::Bytes(vec![0x11; 32])),
            (-3, Value::Bytes(vec![0x22; 32])),
        ]);
        assert!(matches!(derive_owner(&key), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(derive_owner(&[0xff, 0x00]), Err(CryptoError::InvalidKey(_))));
        assert!(matches!(derive_owner(&encode_text()), Err(CryptoError::InvalidKey(_))));
    }

    fn encode_text() -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Value::Text("key".into()), &mut buf).unwrap();
        buf
    }
}
