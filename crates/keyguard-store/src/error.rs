//! Error types for the store module.

use bytes::Bytes;
use thiserror::Error;

/// Errors from nonce persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Failure reported by the resource itself.
///
/// The key manager returns these to its caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The callee reverted with the given data.
    #[error("call reverted ({} bytes of revert data)", .0.len())]
    Reverted(Bytes),

    /// The resource does not implement this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// `accept_ownership` without a pending transfer.
    #[error("no pending ownership transfer")]
    NoPendingOwner,

    /// Batch write with mismatched key and value counts.
    #[error("batch length mismatch: {keys} keys, {values} values")]
    LengthMismatch { keys: usize, values: usize },

    /// `commit` or `rollback` without an open savepoint.
    #[error("no open savepoint")]
    NoSavepoint,

    /// A collaborator could not be reached.
    #[error("resource unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
