//! # KeyGuard Core
//!
//! Pure primitives for KeyGuard: identities, permission bitmasks, allow-lists
//! and the payloads a key manager forwards to the resource it guards.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! the data the resource persists.
//!
//! ## Key Types
//!
//! - [`Address`] - 20-byte identity of principals and targets
//! - [`DataKey`] - 32-byte key in the resource's key-value store
//! - [`Permissions`] - Bitmask of delegated permissions
//! - [`AllowedCall`] / [`AllowedDataKey`] - Allow-list entries
//! - [`Payload`] - Request forwarded to the resource
//!
//! ## Persisted layout
//!
//! Permission data lives in the resource under well-known keys. See [`keys`]
//! for the layout and [`compact`] for the list encoding.

pub mod allowed;
pub mod clock;
pub mod compact;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod payload;
pub mod permissions;
pub mod types;

pub use allowed::{AllowedCall, AllowedDataKey, CallTypes, Filter};
pub use clock::{Clock, FixedClock, SystemClock};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair, PrincipalSignature};
pub use error::{CoreError, Result};
pub use keys::KeyKind;
pub use payload::{ExecuteCall, Operation, Payload};
pub use permissions::Permissions;
pub use types::{Address, CredentialId, DataKey, InterfaceId, Selector};
