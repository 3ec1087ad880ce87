//! Error types for the relay module.

use keyguard_core::Address;
use thiserror::Error;

use crate::envelope::RelayNonce;

/// Reasons a relay request is rejected before its payload is evaluated.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The signature does not verify over the signed message.
    #[error("invalid relay signature")]
    InvalidRelaySignature,

    /// The nonce is not the next one for this signer and channel.
    #[error("invalid relay nonce for {signer}: expected {expected}, got {got}")]
    InvalidRelayNonce {
        signer: Address,
        expected: RelayNonce,
        got: RelayNonce,
    },

    /// `now` is at or past `valid_until`.
    #[error("relay request expired at {valid_until} (now {now})")]
    RelayRequestExpired { valid_until: u64, now: u64 },

    /// `now` is before `valid_from`.
    #[error("relay request not valid before {valid_from} (now {now})")]
    RelayRequestNotYetValid { valid_from: u64, now: u64 },

    /// The payload could not be encoded for signing.
    #[error("encoding error: {0}")]
    Encoding(#[from] keyguard_core::CoreError),

    /// Nonce storage failed.
    #[error("store error: {0}")]
    Store(#[from] keyguard_store::StoreError),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
