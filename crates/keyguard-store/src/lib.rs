//! # KeyGuard Store
//!
//! The interfaces a key manager consumes, with in-memory and SQLite
//! implementations.
//!
//! ## Key Types
//!
//! - [`Resource`] - The controlled account: key-value state plus call forwarding
//! - [`OwnershipLookup`] - Resolves the holder of the master credential
//! - [`NonceStore`] - Relay nonce counters per (principal, channel)
//! - [`MemoryAccount`] / [`MemoryOwnership`] / [`MemoryNonceStore`] - For tests
//! - [`SqliteNonceStore`] - Persistent nonce counters
//!
//! ## Usage
//!
//! ```rust
//! use keyguard_core::Address;
//! use keyguard_store::{NonceStore, SqliteNonceStore};
//!
//! let store = SqliteNonceStore::open_memory().unwrap();
//! let signer = Address::from_bytes([1; 20]);
//! assert!(store.compare_and_increment(&signer, 0, 0).unwrap());
//! assert_eq!(store.get(&signer, 0).unwrap(), 1);
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{ResourceError, Result, StoreError};
pub use memory::{CallHandler, ForwardedCall, MemoryAccount, MemoryNonceStore, MemoryOwnership};
pub use sqlite::SqliteNonceStore;
pub use traits::{NonceStore, OwnershipLookup, Resource};
