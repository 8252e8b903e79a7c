//! Key-value datastore boundary.
//!
//! The options store is the only state shared between concurrent requests. Its
//! [`KeyValueStore::take`] is the single point of at-most-once challenge redemption.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod datastore;
mod memory;

pub use datastore::{ChallengeKind, Datastore};
pub use memory::InMemoryStore;

/// Errors returned by a [`KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A byte-valued key-value store with optional per-entry TTL.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Stores `value` under `key`, replacing any previous value. Entries with a
    /// `ttl` disappear once it elapses.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()>;

    /// Returns the live value under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Atomically returns and removes the live value under `key`. Of any number of
    /// concurrent callers, at most one receives the value.
    async fn take(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
}
