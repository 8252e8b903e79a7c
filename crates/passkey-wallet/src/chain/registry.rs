//! Named chain clients shared across requests.

use std::{collections::HashMap, sync::Arc};

use alloy_signer_local::PrivateKeySigner;
use tracing::info;

use super::{AlloyChainClient, ChainClient};
use crate::{WalletError, WalletResult, config::ChainEndpoint};

/// Maps request chain ids to client handles created once at startup.
#[derive(Debug, Default, Clone)]
pub struct ChainRegistry {
    chains: HashMap<String, Arc<dyn ChainClient>>,
}

impl ChainRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects one [`AlloyChainClient`] per endpoint, all signing with `signer`.
    pub fn connect(endpoints: &[ChainEndpoint], signer: &PrivateKeySigner) -> Self {
        let mut registry = Self::new();
        for endpoint in endpoints {
            info!(
                target: "passkey::chain",
                chain = %endpoint.id,
                rpc_url = %endpoint.rpc_url,
                relayer = %signer.address(),
                "Connecting chain client"
            );
            let client = AlloyChainClient::new(endpoint.rpc_url.clone(), signer.clone());
            registry.insert(endpoint.id.clone(), Arc::new(client));
        }
        registry
    }

    /// Registers `client` under `id`, replacing any previous handle.
    pub fn insert(&mut self, id: impl Into<String>, client: Arc<dyn ChainClient>) {
        self.chains.insert(id.into(), client);
    }

    /// Looks up the client for `id`.
    pub fn get(&self, id: &str) -> WalletResult<Arc<dyn ChainClient>> {
        self.chains
            .get(id)
            .cloned()
            .ok_or_else(|| WalletError::validation(format!("unsupported chain: {id}")))
    }

    /// Returns the registered chain ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.chains.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of registered chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Returns true if no chain is registered.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockChain;

    #[test]
    fn test_lookup() {
        let mut registry = ChainRegistry::new();
        registry.insert("localhost", Arc::new(MockChain::default()));
        registry.insert("base_sepolia", Arc::new(MockChain::default()));

        assert!(registry.get("localhost").is_ok());
        assert_eq!(registry.ids(), vec!["base_sepolia", "localhost"]);
        assert!(matches!(registry.get("mainnet"), Err(WalletError::Validation(_))));
    }

    #[test]
    fn test_shared_handle() {
        let mut registry = ChainRegistry::new();
        registry.insert("localhost", Arc::new(MockChain::default()));

        let a = registry.get("localhost").unwrap();
        let b = registry.get("localhost").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
