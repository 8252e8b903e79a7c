use alloy_primitives::U256;

use crate::{CryptoError, P256_N};

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

/// An ECDSA signature split into its scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignature {
    /// The `r` scalar.
    pub r: U256,
    /// The `s` scalar, as found in the encoding (not normalized).
    pub s: U256,
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn byte(&mut self, what: &str) -> Result<u8, CryptoError> {
        let b = *self.buf.get(self.pos).ok_or_else(|| truncated(what))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], CryptoError> {
        let bytes = self.buf.get(self.pos..self.pos + len).ok_or_else(|| truncated(what))?;
        self.pos += len;
        Ok(bytes)
    }

    fn expect_tag(&mut self, tag: u8, what: &str) -> Result<(), CryptoError> {
        match self.byte(what)? {
            found if found == tag => Ok(()),
            found => Err(malformed(format!("expected {what} tag {tag:#04x}, found {found:#04x}"))),
        }
    }

    fn length(&mut self, what: &str) -> Result<usize, CryptoError> {
        let len = self.byte(what)?;
        if len & 0x80 != 0 {
            return Err(malformed(format!("{what} uses a long-form length")));
        }
        Ok(len as usize)
    }

    fn integer(&mut self, what: &str) -> Result<U256, CryptoError> {
        self.expect_tag(TAG_INTEGER, what)?;
        let len = self.length(what)?;
        if len == 0 {
            return Err(malformed(format!("{what} is empty")));
        }
        let bytes = self.take(len, what)?;
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        U256::try_from_be_slice(&bytes[start..])
            .ok_or_else(|| malformed(format!("{what} is wider than 256 bits")))
    }
}

fn malformed(msg: String) -> CryptoError {
    CryptoError::MalformedSignature(msg)
}

fn truncated(what: &str) -> CryptoError {
    malformed(format!("buffer truncated reading {what}"))
}

/// Decodes a DER `SEQUENCE { INTEGER r, INTEGER s }` ECDSA signature.
///
/// Leading zero padding of either integer is stripped. Any tag or length mismatch,
/// truncation, trailing data, or a scalar outside `[1, N-1]` fails with
/// [`CryptoError::MalformedSignature`].
pub fn decode_der_signature(bytes: &[u8]) -> Result<EcdsaSignature, CryptoError> {
    let mut reader = Reader::new(bytes);
    reader.expect_tag(TAG_SEQUENCE, "SEQUENCE")?;
    let total = reader.length("SEQUENCE")?;
    if total != reader.remaining() {
        return Err(malformed(format!(
            "SEQUENCE length {total} does not match {} remaining bytes",
            reader.remaining()
        )));
    }

    let r = reader.integer("r")?;
    let s = reader.integer("s")?;
    if reader.remaining() != 0 {
        return Err(malformed(format!("{} trailing bytes", reader.remaining())));
    }

    for (name, scalar) in [("r", r), ("s", s)] {
        if scalar.is_zero() || scalar >= P256_N {
            return Err(malformed(format!("{name} is outside the curve order")));
        }
    }
    Ok(EcdsaSignature { r, s })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::hex;
    use p256::ecdsa::{DerSignature, SigningKey, signature::Signer as _};
    use rstest::rstest;

    use super::*;

    fn der(r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut out = vec![TAG_SEQUENCE, (4 + r.len() + s.len()) as u8];
        out.extend_from_slice(&[TAG_INTEGER, r.len() as u8]);
        out.extend_from_slice(r);
        out.extend_from_slice(&[TAG_INTEGER, s.len() as u8]);
        out.extend_from_slice(s);
        out
    }

    #[test]
    fn test_decodes_padded_integers() {
        let mut r = vec![0x00];
        r.extend_from_slice(&[0x80; 32]);
        let sig = decode_der_signature(&der(&r, &[0x01, 0x02])).unwrap();
        assert_eq!(sig.r, U256::from_be_slice(&[0x80; 32]));
        assert_eq!(sig.s, U256::from(0x0102));
    }

    #[test]
    fn test_matches_p256_encoding() {
        let key = SigningKey::from_bytes(&[7u8; 32].into()).unwrap();
        let sig: DerSignature = key.sign(b"webauthn payload");
        let fixed = p256::ecdsa::Signature::from_der(sig.as_bytes()).unwrap().to_bytes();

        let decoded = decode_der_signature(sig.as_bytes()).unwrap();
        assert_eq!(decoded.r, U256::from_be_slice(&fixed[..32]));
        assert_eq!(decoded.s, U256::from_be_slice(&fixed[32..]));
    }

    #[rstest]
    #[case::wrong_sequence_tag(hex!("3106020101020101").to_vec())]
    #[case::wrong_integer_tag(hex!("3006030101020101").to_vec())]
    #[case::total_length_too_long(hex!("3007020101020101").to_vec())]
    #[case::total_length_too_short(hex!("3005020101020101").to_vec())]
    #[case::r_overruns(hex!("3006020501020101").to_vec())]
    #[case::s_truncated(hex!("30060201010202").to_vec())]
    #[case::missing_s(hex!("3003020101").to_vec())]
    #[case::trailing_data(hex!("300702010102010100").to_vec())]
    #[case::empty_integer(hex!("30050200020101").to_vec())]
    #[case::zero_r(hex!("3006020100020101").to_vec())]
    #[case::long_form_length(hex!("308106020101020101").to_vec())]
    #[case::empty(Vec::new())]
    fn test_rejects_malformed(#[case] bytes: Vec<u8>) {
        assert!(matches!(
            decode_der_signature(&bytes),
            Err(CryptoError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_rejects_scalar_at_order() {
        let n = P256_N.to_be_bytes::<32>();
        let mut padded = vec![0x00];
        padded.extend_from_slice(&n);
        assert!(matches!(
            decode_der_signature(&der(&[0x01], &padded)),
            Err(CryptoError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_integer() {
        let wide = [0x01; 33];
        assert!(matches!(
            decode_der_signature(&der(&wide, &[0x01])),
            Err(CryptoError::MalformedSignature(_))
        ));
    }
}
