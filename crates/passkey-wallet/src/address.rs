//! Owner and wallet address derivation.

use alloy_primitives::{Address, Bytes, U256};
use tracing::debug;

use crate::{
    ChainPhase, CryptoError, WalletError, WalletResult,
    chain::ChainClient,
    contracts::factory::{create_account_init_code, decode_account_address, encode_create_account},
    cose::{self, Owner},
};

/// Derives owners from COSE keys and counterfactual wallet addresses from owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletAddressDeriver {
    factory: Address,
}

impl WalletAddressDeriver {
    /// Creates a deriver for wallets deployed by `factory`.
    pub const fn new(factory: Address) -> Self {
        Self { factory }
    }

    /// Returns the factory address.
    pub const fn factory(&self) -> Address {
        self.factory
    }

    /// Decodes a COSE key into the 64-byte owner `x || y`.
    pub fn derive_owner(&self, cose_key: &[u8]) -> Result<Owner, CryptoError> {
        cose::derive_owner(cose_key)
    }

    /// Asks the factory which wallet `[owner]` and `wallet_nonce` map to.
    ///
    /// Runs `createAccount` as an `eth_call`, which is side-effect free and returns the
    /// same address for the same inputs whether or not the wallet is deployed.
    pub async fn compute_wallet_address(
        &self,
        chain: &dyn ChainClient,
        owner: &Owner,
        wallet_nonce: U256,
    ) -> WalletResult<Address> {
        let data = encode_create_account(vec![owner.to_bytes()], wallet_nonce);
        let output = chain
            .call_contract(self.factory, data)
            .await
            .map_err(|e| WalletError::chain(ChainPhase::Simulation, e))?;
        let address = decode_account_address(&output)
            .map_err(|e| WalletError::chain(ChainPhase::Simulation, e.into()))?;
        debug!(
            target: "passkey::address",
            %address,
            %wallet_nonce,
            factory = %self.factory,
            "Computed wallet address"
        );
        Ok(address)
    }

    /// `initCode` deploying the wallet for `[owner]` and `wallet_nonce`.
    pub fn init_code(&self, owner: &Owner, wallet_nonce: U256) -> Bytes {
        create_account_init_code(self.factory, vec![owner.to_bytes()], wallet_nonce)
    }
}
