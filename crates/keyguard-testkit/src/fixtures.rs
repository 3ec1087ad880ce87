//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use bytes::Bytes;
use keyguard::{KeyManager, KeyManagerConfig};
use keyguard_core::allowed::{encode_allowed_calls, encode_allowed_data_keys};
use keyguard_core::keys::{self, ADDRESS_PERMISSIONS_ARRAY};
use keyguard_core::{
    Address, AllowedCall, AllowedDataKey, CredentialId, DataKey, FixedClock, Keypair, Payload,
    Permissions,
};
use keyguard_perms::MasterOverrideResolver;
use keyguard_relay::{RelayDomain, RelayNonce, RelayRequest, ValidityWindow};
use keyguard_store::{MemoryAccount, MemoryNonceStore, MemoryOwnership};

/// Address of the fixture's account.
pub const ACCOUNT: Address = Address::from_bytes([0xaa; 20]);

/// Address of the fixture's key manager.
pub const ENGINE: Address = Address::from_bytes([0xee; 20]);

/// Chain id relay requests are bound to.
pub const CHAIN_ID: u64 = 4201;

/// The master credential.
pub const MASTER_CREDENTIAL: CredentialId = CredentialId::from_bytes([0x4d; 32]);

/// Initial fixture time, in seconds.
pub const START_TIME: u64 = 1_000;

/// A 20-byte address filled with `byte`.
pub fn address(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

/// A deterministic keypair.
pub fn keypair(seed: u8) -> Keypair {
    Keypair::from_seed(&[seed; 32])
}

/// An in-memory account plus everything a key manager needs around it.
pub struct TestFixture {
    pub account: Arc<MemoryAccount>,
    pub ownership: Arc<MemoryOwnership>,
    pub nonces: Arc<MemoryNonceStore>,
    pub clock: Arc<FixedClock>,
    pub config: KeyManagerConfig,
}

impl TestFixture {
    /// Create a fixture with an empty account owned by the engine.
    pub fn new() -> Self {
        Self {
            account: Arc::new(MemoryAccount::new(ACCOUNT, ENGINE)),
            ownership: Arc::new(MemoryOwnership::new()),
            nonces: Arc::new(MemoryNonceStore::new()),
            clock: Arc::new(FixedClock::new(START_TIME)),
            config: KeyManagerConfig {
                chain_id: CHAIN_ID,
                engine_address: ENGINE,
                reentrancy_enabled: true,
            },
        }
    }

    /// A key manager over this fixture's account and stores.
    pub fn manager(&self) -> KeyManager {
        let master = MasterOverrideResolver::new(MASTER_CREDENTIAL, self.ownership.clone());
        KeyManager::new(
            self.config.clone(),
            self.account.clone(),
            master,
            self.nonces.clone(),
        )
        .with_clock(self.clock.clone())
    }

    /// The domain relay requests for [`manager`](Self::manager) are bound to.
    pub fn relay_domain(&self) -> RelayDomain {
        RelayDomain {
            chain_id: self.config.chain_id,
            engine: self.config.engine_address,
        }
    }

    /// Set a controller's permissions without touching the controller array.
    pub fn grant(&self, controller: &Address, permissions: Permissions) {
        self.account.provision(
            keys::permissions_key(controller),
            permissions.to_bytes().to_vec(),
        );
    }

    /// Append a controller to the controller array and set its permissions.
    pub fn register_controller(&self, controller: &Address, permissions: Permissions) {
        let count = self.controller_count();
        self.account.provision(
            keys::address_permissions_index_key(count),
            controller.0.to_vec(),
        );
        self.account.provision(
            DataKey::from_bytes(ADDRESS_PERMISSIONS_ARRAY),
            (count + 1).to_be_bytes().to_vec(),
        );
        self.grant(controller, permissions);
    }

    /// Number of entries in the controller array.
    pub fn controller_count(&self) -> u128 {
        let raw = self.account.get(&DataKey::from_bytes(ADDRESS_PERMISSIONS_ARRAY));
        <[u8; 16]>::try_from(raw.as_ref())
            .map(u128::from_be_bytes)
            .unwrap_or(0)
    }

    /// Controllers in array order.
    pub fn controllers(&self) -> Vec<Address> {
        (0..self.controller_count())
            .filter_map(|index| {
                let raw = self.account.get(&keys::address_permissions_index_key(index));
                Address::try_from(raw.as_ref()).ok()
            })
            .collect()
    }

    /// Store a controller's AllowedCalls list.
    pub fn allow_calls(&self, controller: &Address, entries: &[AllowedCall]) {
        let encoded = encode_allowed_calls(entries).expect("allowed calls encode");
        self.account
            .provision(keys::allowed_calls_key(controller), encoded);
    }

    /// Store a controller's AllowedERC725YDataKeys list.
    pub fn allow_data_keys(&self, controller: &Address, entries: &[AllowedDataKey]) {
        let encoded = encode_allowed_data_keys(entries).expect("allowed data keys encode");
        self.account
            .provision(keys::allowed_data_keys_key(controller), encoded);
    }

    /// Store raw bytes under a controller's AllowedCalls key.
    pub fn allow_calls_raw(&self, controller: &Address, raw: impl Into<Bytes>) {
        self.account
            .provision(keys::allowed_calls_key(controller), raw);
    }

    /// Hand the master credential to `holder`.
    pub fn give_master(&self, holder: Address) {
        self.ownership.mint(MASTER_CREDENTIAL, holder);
    }

    /// Sign a relay request for this fixture's key manager.
    pub fn sign_relay(
        &self,
        signer: &Keypair,
        nonce: RelayNonce,
        window: ValidityWindow,
        payload: Payload,
    ) -> RelayRequest {
        RelayRequest::sign(signer, &self.relay_domain(), nonce, window, payload)
            .expect("relay request signs")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
