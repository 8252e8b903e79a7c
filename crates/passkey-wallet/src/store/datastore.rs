use std::{sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::{KeyValueStore, StoreResult};
use crate::{
    metrics,
    webauthn::{Passkey, PendingCeremony},
};

const PASSKEYS: &str = "Passkeys";

/// The ceremony a pending challenge was issued for.
///
/// Each kind has its own namespace, so a challenge can only be redeemed by the
/// request type it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    /// Passkey creation.
    Registration,
    /// Sign-in with any stored passkey.
    Authentication,
    /// Signing an operation hash with one passkey.
    Operation,
}

impl ChallengeKind {
    /// Store namespace of pending challenges of this kind.
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Registration => "RegistrationOptions",
            Self::Authentication => "AuthenticationOptions",
            Self::Operation => "OperationOptions",
        }
    }

    /// `kind` metrics label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Registration => metrics::KIND_REGISTRATION,
            Self::Authentication => metrics::KIND_AUTHENTICATION,
            Self::Operation => metrics::KIND_OPERATION,
        }
    }
}

/// Typed namespaces over a [`KeyValueStore`].
///
/// Passkeys live under `Passkeys:<credential id>` with no expiry. Pending ceremonies
/// live under `<kind namespace>:<challenge>` for the options TTL and are redeemed
/// with `take`.
#[derive(Debug, Clone)]
pub struct Datastore {
    store: Arc<dyn KeyValueStore>,
    options_ttl: Duration,
}

fn key(namespace: &str, id: &str) -> String {
    format!("{namespace}:{id}")
}

impl Datastore {
    /// Creates a datastore over `store`, expiring pending ceremonies after `options_ttl`.
    pub fn new(store: Arc<dyn KeyValueStore>, options_ttl: Duration) -> Self {
        Self { store, options_ttl }
    }

    async fn put<T: Serialize>(
        &self,
        namespace: &str,
        id: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(&key(namespace, id), bytes, ttl).await
    }

    fn decode<T: DeserializeOwned>(bytes: Option<Vec<u8>>) -> StoreResult<Option<T>> {
        bytes.map(|bytes| serde_json::from_slice(&bytes)).transpose().map_err(Into::into)
    }

    /// Persists `passkey`, replacing any previous record with the same id.
    pub async fn store_passkey(&self, passkey: &Passkey) -> StoreResult<()> {
        debug!(
            target: "passkey::store",
            id = %passkey.id,
            counter = passkey.counter,
            "Storing passkey"
        );
        self.put(PASSKEYS, &passkey.id, passkey, None).await
    }

    /// Loads the passkey with credential id `id`.
    pub async fn get_passkey(&self, id: &str) -> StoreResult<Option<Passkey>> {
        Self::decode(self.store.get(&key(PASSKEYS, id)).await?)
    }

    /// Stores a pending ceremony of `kind` under its challenge.
    pub async fn store_pending(
        &self,
        kind: ChallengeKind,
        pending: &PendingCeremony,
    ) -> StoreResult<()> {
        self.put(kind.namespace(), &pending.challenge, pending, Some(self.options_ttl)).await
    }

    /// Redeems the pending ceremony of `kind` issued with `challenge`. Later calls,
    /// and calls for another kind, return `None`.
    pub async fn take_pending(
        &self,
        kind: ChallengeKind,
        challenge: &str,
    ) -> StoreResult<Option<PendingCeremony>> {
        Self::decode(self.store.take(&key(kind.namespace(), challenge)).await?)
    }
}
