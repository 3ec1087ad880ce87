//! # KeyGuard
//!
//! A key manager for a controlled resource: an account holding value and
//! key-value state. Every operation on the resource goes through the key
//! manager, which decides whether the requesting principal holds enough
//! delegated permission and forwards the request unchanged if so.
//!
//! ## Overview
//!
//! - **Permissions**: A bitmask per controller, stored in the resource itself
//! - **Allow-lists**: Restrict calls by type, target, standard and selector,
//!   and data writes by key or key prefix
//! - **Relay requests**: Signed off-chain, submitted by anyone, replay
//!   protected by per-channel nonces
//! - **Master credential**: Whoever holds it is allowed everything
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use keyguard::{KeyManager, KeyManagerConfig};
//! use keyguard::core::{keys, Address, CredentialId, ExecuteCall, Payload, Permissions};
//! use keyguard::perms::MasterOverrideResolver;
//! use keyguard::store::{MemoryAccount, MemoryNonceStore, MemoryOwnership};
//!
//! let controller = Address::from_bytes([1; 20]);
//! let callee = Address::from_bytes([9; 20]);
//!
//! let account = Arc::new(MemoryAccount::new(Address::from_bytes([0xaa; 20]), controller));
//! account.provision(
//!     keys::permissions_key(&controller),
//!     Permissions::SUPER_CALL.to_bytes().to_vec(),
//! );
//!
//! let master = MasterOverrideResolver::new(
//!     CredentialId::from_u64(1),
//!     Arc::new(MemoryOwnership::new()),
//! );
//! let km = KeyManager::new(
//!     KeyManagerConfig::default(),
//!     account.clone(),
//!     master,
//!     Arc::new(MemoryNonceStore::new()),
//! );
//!
//! km.execute(&controller, Payload::Execute(ExecuteCall::call(callee, vec![0xde, 0xad, 0xbe, 0xef])))
//!     .unwrap();
//! assert_eq!(account.calls().len(), 1);
//!
//! let stranger = Address::from_bytes([2; 20]);
//! assert!(km.execute(&stranger, Payload::Execute(ExecuteCall::call(callee, vec![0x01]))).is_err());
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `keyguard::core` - Addresses, permission flags, allow-lists, payloads
//! - `keyguard::store` - Resource, ownership and nonce store abstractions
//! - `keyguard::perms` - Permission evaluation and the master credential
//! - `keyguard::relay` - Relay request envelopes and verification

pub mod config;
pub mod error;
mod guard;
pub mod interface;
pub mod manager;

// Re-export component crates
pub use keyguard_core as core;
pub use keyguard_perms as perms;
pub use keyguard_relay as relay;
pub use keyguard_store as store;

// Re-export main types for convenience
pub use config::KeyManagerConfig;
pub use error::{KeyGuardError, Result};
pub use manager::{decode_batch_output, KeyManager, VerifiedCall, FAIL_VALUE, MAGIC_VALUE};

// Re-export commonly used types
pub use keyguard_core::{Address, ExecuteCall, Keypair, Operation, Payload, Permissions};
pub use keyguard_perms::Denial;
pub use keyguard_relay::{RelayNonce, RelayRequest, ValidityWindow};
