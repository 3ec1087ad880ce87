//! Error types for KeyGuard Core.

use thiserror::Error;

/// Errors raised while decoding or verifying core data structures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("malformed compact bytes array: {0}")]
    MalformedCompactBytesArray(String),

    #[error("invalid encoded allowed calls: {0}")]
    InvalidEncodedAllowedCalls(String),

    #[error("invalid encoded allowed data keys: {0}")]
    InvalidEncodedAllowedDataKeys(String),

    #[error("unknown permission name: {0}")]
    UnknownPermission(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
