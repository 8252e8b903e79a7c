//! Signature decoding, normalization and encoding for the wallet's WebAuthn verifier.
//!
//! A device assertion flows through this module in three steps:
//! 1. [`decode_der_signature`] splits the authenticator's DER signature into `(r, s)`
//! 2. [`normalize_low_s`] folds `s` into the lower half of the curve order
//! 3. [`build_webauthn_auth`] and [`encode_signature`] produce the exact bytes placed
//!    in `UserOperation.signature`

mod der;
mod low_s;
mod webauthn_auth;
mod wrapper;

pub use der::{EcdsaSignature, decode_der_signature};
pub use low_s::{is_low_s, normalize_low_s};
pub use webauthn_auth::{build_webauthn_auth, webauthn_auth_from_assertion};
pub use wrapper::{encode_signature, signature_from_assertion};
