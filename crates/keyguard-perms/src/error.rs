//! Error types for the permissions module.

use keyguard_core::{Address, CoreError, DataKey, Permissions, Selector};
use keyguard_store::ResourceError;
use thiserror::Error;

/// Why a principal may not perform an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    /// The principal has no stored permissions at all.
    #[error("no permissions set for {0}")]
    NoPermissionsSet(Address),

    /// A required permission is missing.
    #[error("{principal} is not authorised for {}", .permission.names().join(" | "))]
    NotAuthorised {
        principal: Address,
        permission: Permissions,
    },

    /// No AllowedCalls entry admits the call.
    #[error("{principal} may not call {target} (selector {selector:?})")]
    NotAllowedCall {
        principal: Address,
        target: Address,
        selector: Option<Selector>,
    },

    /// No AllowedERC725YDataKeys entry admits the key.
    #[error("{principal} may not set data key {key}")]
    NotAllowedERC725YKey { principal: Address, key: DataKey },

    /// The payload itself is inconsistent.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A permission value has the wrong shape for its key.
    #[error("invalid value for data key {key}: {reason}")]
    InvalidDataValuesForDataKeys { key: DataKey, reason: String },

    /// A key in the permission namespace that is not part of the layout.
    #[error("not a recognised permission key: {0}")]
    NotRecognisedPermissionKey(DataKey),

    /// Stored or submitted AllowedCalls do not decode.
    #[error("invalid encoded allowed calls: {0}")]
    InvalidEncodedAllowedCalls(String),

    /// Stored or submitted AllowedERC725YDataKeys do not decode.
    #[error("invalid encoded allowed data keys: {0}")]
    InvalidEncodedAllowedERC725YDataKeys(String),

    /// Stored permission data is unreadable.
    #[error("invalid stored permission data: {0}")]
    InvalidStoredData(String),

    /// The resource failed while permission data was read.
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
}

impl From<CoreError> for Denial {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidEncodedAllowedCalls(msg) => Denial::InvalidEncodedAllowedCalls(msg),
            CoreError::InvalidEncodedAllowedDataKeys(msg) => {
                Denial::InvalidEncodedAllowedERC725YDataKeys(msg)
            }
            other => Denial::InvalidStoredData(other.to_string()),
        }
    }
}

/// Result type for permission checks.
pub type Result<T> = std::result::Result<T, Denial>;
