//! Error types for the key manager.

use keyguard_core::{Address, CoreError};
use keyguard_perms::Denial;
use keyguard_relay::RelayError;
use keyguard_store::{ResourceError, StoreError};
use thiserror::Error;

/// Errors that can occur during key manager operations.
#[derive(Debug, Error)]
pub enum KeyGuardError {
    /// The principal lacks the permissions the request needs.
    #[error("denied: {0}")]
    Denied(#[from] Denial),

    /// The relay envelope was rejected.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    /// A nested call came from a principal without REENTRANCY.
    #[error("reentrant call by {0} without REENTRANCY permission")]
    ReentrancyDenied(Address),

    /// The resource failed while performing a forwarded request.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Encoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] CoreError),
}

/// Result type for key manager operations.
pub type Result<T> = std::result::Result<T, KeyGuardError>;
