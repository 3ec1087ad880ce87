//! Read adapter over the permission data persisted in the resource.

use bytes::Bytes;
use keyguard_core::allowed::{decode_allowed_calls, decode_allowed_data_keys};
use keyguard_core::keys;
use keyguard_core::{Address, AllowedCall, AllowedDataKey, Permissions};
use keyguard_store::Resource;

use crate::error::Result;

/// Reads controller permissions and allow-lists from a resource.
///
/// Borrows the resource; it never owns or caches it.
#[derive(Clone, Copy)]
pub struct PermissionStore<'a> {
    resource: &'a dyn Resource,
}

impl<'a> PermissionStore<'a> {
    pub fn new(resource: &'a dyn Resource) -> Self {
        Self { resource }
    }

    /// Stored permission bitmask. `None` when unset or all-zero.
    pub fn permissions_of(&self, controller: &Address) -> Result<Option<Permissions>> {
        let raw = self.resource.read(&keys::permissions_key(controller))?;
        Ok(Permissions::from_stored(&raw)?)
    }

    /// Decoded AllowedCalls. Empty when unset.
    pub fn allowed_calls_of(&self, controller: &Address) -> Result<Vec<AllowedCall>> {
        let raw = self.resource.read(&keys::allowed_calls_key(controller))?;
        Ok(decode_allowed_calls(&raw)?)
    }

    /// Decoded AllowedERC725YDataKeys. Empty when unset.
    pub fn allowed_data_keys_of(&self, controller: &Address) -> Result<Vec<AllowedDataKey>> {
        let raw = self.resource.read(&keys::allowed_data_keys_key(controller))?;
        Ok(decode_allowed_data_keys(&raw)?)
    }

    /// Permissions of `controller` with its allow-lists fetched but not yet
    /// decoded. `None` when no permissions are set.
    pub fn snapshot(&self, controller: &Address) -> Result<Option<PermissionSnapshot>> {
        let Some(permissions) = self.permissions_of(controller)? else {
            return Ok(None);
        };
        Ok(Some(PermissionSnapshot {
            principal: *controller,
            permissions,
            allowed_calls: self.resource.read(&keys::allowed_calls_key(controller))?,
            allowed_data_keys: self
                .resource
                .read(&keys::allowed_data_keys_key(controller))?,
        }))
    }
}

/// Point-in-time view of one controller's permission data.
///
/// Batches are evaluated against a single snapshot. Allow-lists are decoded
/// on demand, so a malformed list only fails actions that consult it.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    pub principal: Address,
    pub permissions: Permissions,
    allowed_calls: Bytes,
    allowed_data_keys: Bytes,
}

impl PermissionSnapshot {
    pub fn allowed_calls(&self) -> Result<Vec<AllowedCall>> {
        Ok(decode_allowed_calls(&self.allowed_calls)?)
    }

    pub fn allowed_data_keys(&self) -> Result<Vec<AllowedDataKey>> {
        Ok(decode_allowed_data_keys(&self.allowed_data_keys)?)
    }
}
