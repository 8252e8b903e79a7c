//! Core of a passkey-controlled ERC-4337 smart wallet.
//!
//! This crate turns WebAuthn device assertions into validated, submitted
//! user operations for Coinbase Smart Wallet accounts behind an EntryPoint v0.6:
//! - Owner and wallet address derivation from COSE public keys
//! - DER signature decoding, low-S normalization and on-chain signature encoding
//! - User operation assembly, hashing and challenge issuance
//! - Operation submission and event-based outcome verification
//! - The request pipelines, datastore, ceremony verification and JSON-RPC surface
//!   that drive them

#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![deny(unused_must_use)]
#![deny(rust_2018_idioms)]

pub mod address;
pub mod chain;
pub mod cli;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod cose;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod rpc;
pub mod service;
pub mod signature;
pub mod store;
pub mod user_operation;
pub mod webauthn;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cli::Cli;
pub use config::{ChainEndpoint, ConfigError, MetricsConfig, RelayerConfig};
pub use constants::*;
pub use error::*;
pub use rpc::{PasskeyApiServer, PasskeyRpc};
