//! # KeyGuard Permissions
//!
//! Decides whether a principal may perform an action on the resource.
//!
//! ## Overview
//!
//! Permissions are not held by the engine. They live in the resource's own
//! key-value store, under the layout in [`keyguard_core::keys`], and are read
//! fresh on every evaluation. Changing them is itself a gated data write.
//!
//! ## Key Types
//!
//! - [`PermissionStore`] - Reads bitmasks and allow-lists from the resource
//! - [`MasterOverrideResolver`] - Whether a principal holds the master credential
//! - [`PermissionEvaluator`] - Applies the rules to an [`Action`]
//! - [`Denial`] - Why an action was refused
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use keyguard_core::{keys, Address, CredentialId, ExecuteCall, Permissions};
//! use keyguard_perms::{Action, Denial, MasterOverrideResolver, PermissionEvaluator};
//! use keyguard_store::{MemoryAccount, MemoryOwnership};
//!
//! let account = MemoryAccount::new(Address::from_bytes([1; 20]), Address::from_bytes([2; 20]));
//! let ownership = Arc::new(MemoryOwnership::new());
//! let master = MasterOverrideResolver::new(CredentialId::from_u64(1), ownership);
//! let alice = Address::from_bytes([3; 20]);
//! account.provision(keys::permissions_key(&alice), Permissions::CALL.to_bytes().to_vec());
//!
//! let eval = PermissionEvaluator::new(&account, &master);
//! let call = Action::Execute(ExecuteCall::call(Address::from_bytes([9; 20]), vec![1, 2, 3, 4]));
//!
//! // CALL alone admits nothing until an AllowedCalls entry matches.
//! assert!(matches!(eval.evaluate(&alice, &call), Err(Denial::NotAllowedCall { .. })));
//! ```

pub mod action;
pub mod error;
pub mod evaluator;
pub mod master;
pub mod store;

pub use action::{actions_for, Action};
pub use error::{Denial, Result};
pub use evaluator::PermissionEvaluator;
pub use master::MasterOverrideResolver;
pub use store::{PermissionSnapshot, PermissionStore};
