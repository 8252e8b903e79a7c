//! WebAuthn plumbing: options, pending ceremony state and ceremony verification
//! over the `passkey-types` credential models.

pub mod base64url;
mod options;
mod types;
mod verifier;

pub use options::{
    RelyingParty, descriptor, generate_authentication_options, generate_registration_options,
    random_challenge,
};
pub use types::*;
pub use verifier::{
    AuthenticationOutcome, CeremonyVerifier, ExpectedCeremony, P256CeremonyVerifier,
    RegisteredCredential, VerificationError,
};
