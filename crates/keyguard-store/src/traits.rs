//! Interfaces the key manager consumes.
//!
//! The engine never owns the resource's storage or execution: it reads
//! permission data through [`Resource::read`], writes through the gated
//! write methods and hands authorised executions to
//! [`Resource::forward_call`]. Each dispatched request runs inside a
//! resource savepoint and is rolled back if any part of it fails.

use bytes::Bytes;
use keyguard_core::{Address, CredentialId, DataKey, Operation};

use crate::error::{ResourceError, Result};

/// The controlled resource: an account with key-value state that can call
/// out to other addresses.
///
/// Implementations use interior mutability. A forwarded call may re-enter the
/// key manager, so no lock may be held while a callee runs.
pub trait Resource: Send + Sync {
    /// Address of the resource.
    fn address(&self) -> Address;

    /// Read a value. Unset keys read as empty bytes.
    fn read(&self, key: &DataKey) -> std::result::Result<Bytes, ResourceError>;

    /// Write one value.
    fn write(&self, key: DataKey, value: Bytes) -> std::result::Result<(), ResourceError>;

    /// Write several values atomically.
    fn write_batch(
        &self,
        keys: &[DataKey],
        values: &[Bytes],
    ) -> std::result::Result<(), ResourceError>;

    /// Perform a call, static call or delegate call and return its output.
    fn forward_call(
        &self,
        operation: Operation,
        target: Address,
        value: u128,
        data: &Bytes,
    ) -> std::result::Result<Bytes, ResourceError>;

    /// Deploy code and return the new address encoded as bytes.
    fn deploy(
        &self,
        operation: Operation,
        bytecode: &Bytes,
        value: u128,
    ) -> std::result::Result<Bytes, ResourceError>;

    /// Current owner.
    fn owner(&self) -> Address;

    /// Start a two-step ownership transfer.
    fn transfer_ownership(&self, new_owner: Address) -> std::result::Result<(), ResourceError>;

    /// Complete a pending ownership transfer.
    fn accept_ownership(&self) -> std::result::Result<(), ResourceError>;

    /// Give up ownership.
    fn renounce_ownership(&self) -> std::result::Result<(), ResourceError>;

    /// Whether `target` implements the standard identified by `interface_id`.
    fn supports_standard(&self, target: &Address, interface_id: &[u8]) -> bool;

    /// Open a savepoint. Savepoints nest.
    fn begin(&self) -> std::result::Result<(), ResourceError>;

    /// Keep the changes made since the innermost open savepoint.
    fn commit(&self) -> std::result::Result<(), ResourceError>;

    /// Undo the changes made since the innermost open savepoint.
    fn rollback(&self) -> std::result::Result<(), ResourceError>;
}

/// Resolves who currently holds a credential in an external collection.
pub trait OwnershipLookup: Send + Sync {
    /// The holder of `id`, or `None` if it has none.
    fn holder_of(&self, id: &CredentialId) -> std::result::Result<Option<Address>, ResourceError>;
}

/// Per-(principal, channel) relay nonce counters.
pub trait NonceStore: Send + Sync {
    /// Next expected index. Unused channels start at 0.
    fn get(&self, principal: &Address, channel: u128) -> Result<u128>;

    /// Increment the counter if it still equals `expected`.
    ///
    /// Returns `false` without changing anything when it does not.
    fn compare_and_increment(
        &self,
        principal: &Address,
        channel: u128,
        expected: u128,
    ) -> Result<bool>;
}
