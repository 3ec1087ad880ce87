//! In-memory implementations of the store traits.
//!
//! These are primarily for testing. [`MemoryAccount`] stands in for the
//! controlled resource: a key-value map plus scripted callees.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use keyguard_core::{Address, CredentialId, DataKey, Operation};

use crate::error::{ResourceError, Result, StoreError};
use crate::traits::{NonceStore, OwnershipLookup, Resource};

/// A call the account forwarded to a callee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedCall {
    pub operation: Operation,
    pub target: Address,
    pub value: u128,
    pub data: Bytes,
}

/// Scripted behaviour of a callee.
pub type CallHandler =
    Arc<dyn Fn(&ForwardedCall) -> std::result::Result<Bytes, ResourceError> + Send + Sync>;

/// In-memory controlled account.
///
/// Calls to targets without a handler succeed with empty output. Every
/// forwarded call is recorded, in order; the call log is never rolled back.
pub struct MemoryAccount {
    address: Address,
    inner: RwLock<AccountInner>,
}

struct AccountInner {
    data: HashMap<DataKey, Bytes>,
    owner: Address,
    pending_owner: Option<Address>,
    handlers: HashMap<Address, CallHandler>,
    standards: HashMap<Address, HashSet<Vec<u8>>>,
    calls: Vec<ForwardedCall>,
    deployments: u64,
    savepoints: Vec<Savepoint>,
}

/// State restored by a rollback.
struct Savepoint {
    data: HashMap<DataKey, Bytes>,
    owner: Address,
    pending_owner: Option<Address>,
    deployments: u64,
}

impl AccountInner {
    fn savepoint(&self) -> Savepoint {
        Savepoint {
            data: self.data.clone(),
            owner: self.owner,
            pending_owner: self.pending_owner,
            deployments: self.deployments,
        }
    }

    fn restore(&mut self, savepoint: Savepoint) {
        self.data = savepoint.data;
        self.owner = savepoint.owner;
        self.pending_owner = savepoint.pending_owner;
        self.deployments = savepoint.deployments;
    }
}

impl MemoryAccount {
    /// Create an empty account owned by `owner`.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            inner: RwLock::new(AccountInner {
                data: HashMap::new(),
                owner,
                pending_owner: None,
                handlers: HashMap::new(),
                standards: HashMap::new(),
                calls: Vec::new(),
                deployments: 0,
                savepoints: Vec::new(),
            }),
        }
    }

    /// Write a value directly, bypassing any key manager.
    pub fn provision(&self, key: DataKey, value: impl Into<Bytes>) {
        let mut inner = self.inner.write().unwrap();
        put(&mut inner.data, key, value.into());
    }

    /// Read a value directly. Unset keys read as empty.
    pub fn get(&self, key: &DataKey) -> Bytes {
        let inner = self.inner.read().unwrap();
        inner.data.get(key).cloned().unwrap_or_default()
    }

    /// Script the behaviour of calls to `target`.
    pub fn on_call<F>(&self, target: Address, handler: F)
    where
        F: Fn(&ForwardedCall) -> std::result::Result<Bytes, ResourceError> + Send + Sync + 'static,
    {
        let mut inner = self.inner.write().unwrap();
        inner.handlers.insert(target, Arc::new(handler));
    }

    /// Declare that `target` implements a standard.
    pub fn register_standard(&self, target: Address, interface_id: [u8; 4]) {
        let mut inner = self.inner.write().unwrap();
        inner
            .standards
            .entry(target)
            .or_default()
            .insert(interface_id.to_vec());
    }

    /// All forwarded calls so far.
    pub fn calls(&self) -> Vec<ForwardedCall> {
        self.inner.read().unwrap().calls.clone()
    }

    /// Pending owner of a two-step transfer.
    pub fn pending_owner(&self) -> Option<Address> {
        self.inner.read().unwrap().pending_owner
    }

    /// Number of savepoints not yet committed or rolled back.
    pub fn open_savepoints(&self) -> usize {
        self.inner.read().unwrap().savepoints.len()
    }
}

fn put(data: &mut HashMap<DataKey, Bytes>, key: DataKey, value: Bytes) {
    if value.is_empty() {
        data.remove(&key);
    } else {
        data.insert(key, value);
    }
}

impl Resource for MemoryAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn read(&self, key: &DataKey) -> std::result::Result<Bytes, ResourceError> {
        Ok(self.get(key))
    }

    fn write(&self, key: DataKey, value: Bytes) -> std::result::Result<(), ResourceError> {
        let mut inner = self.inner.write().unwrap();
        put(&mut inner.data, key, value);
        Ok(())
    }

    fn write_batch(
        &self,
        keys: &[DataKey],
        values: &[Bytes],
    ) -> std::result::Result<(), ResourceError> {
        if keys.len() != values.len() {
            return Err(ResourceError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        let mut inner = self.inner.write().unwrap();
        for (key, value) in keys.iter().zip(values) {
            put(&mut inner.data, *key, value.clone());
        }
        Ok(())
    }

    fn forward_call(
        &self,
        operation: Operation,
        target: Address,
        value: u128,
        data: &Bytes,
    ) -> std::result::Result<Bytes, ResourceError> {
        if operation.is_create() {
            return Err(ResourceError::Unsupported(format!(
                "{:?} is not a call",
                operation
            )));
        }
        let call = ForwardedCall {
            operation,
            target,
            value,
            data: data.clone(),
        };

        // Release the lock before the callee runs: it may re-enter.
        let handler = {
            let mut inner = self.inner.write().unwrap();
            inner.calls.push(call.clone());
            inner.handlers.get(&target).cloned()
        };

        match handler {
            Some(handler) => handler(&call),
            None => Ok(Bytes::new()),
        }
    }

    fn deploy(
        &self,
        operation: Operation,
        bytecode: &Bytes,
        _value: u128,
    ) -> std::result::Result<Bytes, ResourceError> {
        let mut inner = self.inner.write().unwrap();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.address.0);
        match operation {
            Operation::Create => {
                inner.deployments += 1;
                hasher.update(&inner.deployments.to_be_bytes());
            }
            Operation::Create2 => {
                hasher.update(bytecode);
            }
            other => {
                return Err(ResourceError::Unsupported(format!(
                    "{:?} does not deploy",
                    other
                )))
            }
        }
        let digest = hasher.finalize();
        Ok(Bytes::copy_from_slice(&digest.as_bytes()[12..]))
    }

    fn owner(&self) -> Address {
        self.inner.read().unwrap().owner
    }

    fn transfer_ownership(&self, new_owner: Address) -> std::result::Result<(), ResourceError> {
        self.inner.write().unwrap().pending_owner = Some(new_owner);
        Ok(())
    }

    fn accept_ownership(&self) -> std::result::Result<(), ResourceError> {
        let mut inner = self.inner.write().unwrap();
        let pending = inner.pending_owner.take().ok_or(ResourceError::NoPendingOwner)?;
        inner.owner = pending;
        Ok(())
    }

    fn renounce_ownership(&self) -> std::result::Result<(), ResourceError> {
        let mut inner = self.inner.write().unwrap();
        inner.owner = Address::ZERO;
        inner.pending_owner = None;
        Ok(())
    }

    fn supports_standard(&self, target: &Address, interface_id: &[u8]) -> bool {
        let inner = self.inner.read().unwrap();
        inner
            .standards
            .get(target)
            .is_some_and(|ids| ids.contains(interface_id))
    }

    fn begin(&self) -> std::result::Result<(), ResourceError> {
        let mut inner = self.inner.write().unwrap();
        let savepoint = inner.savepoint();
        inner.savepoints.push(savepoint);
        Ok(())
    }

    fn commit(&self) -> std::result::Result<(), ResourceError> {
        let mut inner = self.inner.write().unwrap();
        inner.savepoints.pop().ok_or(ResourceError::NoSavepoint)?;
        Ok(())
    }

    fn rollback(&self) -> std::result::Result<(), ResourceError> {
        let mut inner = self.inner.write().unwrap();
        let savepoint = inner.savepoints.pop().ok_or(ResourceError::NoSavepoint)?;
        inner.restore(savepoint);
        Ok(())
    }
}

/// In-memory credential collection.
#[derive(Default)]
pub struct MemoryOwnership {
    holders: RwLock<HashMap<CredentialId, Address>>,
    unavailable: AtomicBool,
}

impl MemoryOwnership {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `id` to `holder`, replacing any previous holder.
    pub fn mint(&self, id: CredentialId, holder: Address) {
        self.holders.write().unwrap().insert(id, holder);
    }

    /// Move `id` to a new holder.
    pub fn transfer(&self, id: CredentialId, to: Address) {
        self.mint(id, to);
    }

    /// Destroy `id`.
    pub fn burn(&self, id: &CredentialId) {
        self.holders.write().unwrap().remove(id);
    }

    /// Make every lookup fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl OwnershipLookup for MemoryOwnership {
    fn holder_of(&self, id: &CredentialId) -> std::result::Result<Option<Address>, ResourceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ResourceError::Unavailable("credential collection".into()));
        }
        Ok(self.holders.read().unwrap().get(id).copied())
    }
}

/// In-memory nonce counters.
#[derive(Default)]
pub struct MemoryNonceStore {
    counters: Mutex<HashMap<(Address, u128), u128>>,
}

impl MemoryNonceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NonceStore for MemoryNonceStore {
    fn get(&self, principal: &Address, channel: u128) -> Result<u128> {
        let counters = self.counters.lock().unwrap();
        Ok(counters.get(&(*principal, channel)).copied().unwrap_or(0))
    }

    fn compare_and_increment(
        &self,
        principal: &Address,
        channel: u128,
        expected: u128,
    ) -> Result<bool> {
        let mut counters = self.counters.lock().unwrap();
        let current = counters.get(&(*principal, channel)).copied().unwrap_or(0);
        if current != expected {
            return Ok(false);
        }
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidData("nonce counter overflow".into()))?;
        counters.insert((*principal, channel), next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_empty_write_clears_key() {
        let account = MemoryAccount::new(addr(1), addr(2));
        let key = DataKey([7; 32]);
        account.write(key, Bytes::from_static(b"v")).unwrap();
        assert_eq!(account.read(&key).unwrap(), Bytes::from_static(b"v"));

        account.write(key, Bytes::new()).unwrap();
        assert!(account.read(&key).unwrap().is_empty());
    }

    #[test]
    fn test_write_batch_length_mismatch() {
        let account = MemoryAccount::new(addr(1), addr(2));
        let err = account
            .write_batch(&[DataKey([1; 32])], &[])
            .unwrap_err();
        assert_eq!(err, ResourceError::LengthMismatch { keys: 1, values: 0 });
        assert!(account.get(&DataKey([1; 32])).is_empty());
    }

    #[test]
    fn test_forward_call_uses_handler_and_records() {
        let account = MemoryAccount::new(addr(1), addr(2));
        account.on_call(addr(9), |call| Ok(call.data.slice(1..)));

        let out = account
            .forward_call(Operation::Call, addr(9), 0, &Bytes::from_static(&[1, 2, 3]))
            .unwrap();
        assert_eq!(out, Bytes::from_static(&[2, 3]));

        let out = account
            .forward_call(Operation::StaticCall, addr(8), 0, &Bytes::new())
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(account.calls().len(), 2);
        assert_eq!(account.calls()[1].target, addr(8));
    }

    #[test]
    fn test_handler_revert_is_returned() {
        let account = MemoryAccount::new(addr(1), addr(2));
        account.on_call(addr(9), |_| Err(ResourceError::Reverted(Bytes::from_static(b"no"))));
        let err = account
            .forward_call(Operation::Call, addr(9), 0, &Bytes::new())
            .unwrap_err();
        assert_eq!(err, ResourceError::Reverted(Bytes::from_static(b"no")));
    }

    #[test]
    fn test_deploy_addresses() {
        let account = MemoryAccount::new(addr(1), addr(2));
        let code = Bytes::from_static(&[0x60, 0x00]);
        let a = account.deploy(Operation::Create, &code, 0).unwrap();
        let b = account.deploy(Operation::Create, &code, 0).unwrap();
        assert_eq!(a.len(), 20);
        assert_ne!(a, b);

        let c = account.deploy(Operation::Create2, &code, 0).unwrap();
        let d = account.deploy(Operation::Create2, &code, 0).unwrap();
        assert_eq!(c, d);
        assert!(account.deploy(Operation::Call, &code, 0).is_err());
    }

    #[test]
    fn test_two_step_ownership() {
        let account = MemoryAccount::new(addr(1), addr(2));
        assert_eq!(account.accept_ownership(), Err(ResourceError::NoPendingOwner));

        account.transfer_ownership(addr(3)).unwrap();
        assert_eq!(account.owner(), addr(2));
        assert_eq!(account.pending_owner(), Some(addr(3)));

        account.accept_ownership().unwrap();
        assert_eq!(account.owner(), addr(3));

        account.renounce_ownership().unwrap();
        assert!(account.owner().is_zero());
    }

    #[test]
    fn test_supports_standard() {
        let account = MemoryAccount::new(addr(1), addr(2));
        account.register_standard(addr(5), [0xde, 0xad, 0xbe, 0xef]);
        assert!(account.supports_standard(&addr(5), &[0xde, 0xad, 0xbe, 0xef]));
        assert!(!account.supports_standard(&addr(5), &[0, 0, 0, 0]));
        assert!(!account.supports_standard(&addr(6), &[0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn test_ownership_lookup() {
        let ownership = MemoryOwnership::new();
        let id = CredentialId::from_u64(1);
        assert_eq!(ownership.holder_of(&id).unwrap(), None);

        ownership.mint(id, addr(4));
        ownership.transfer(id, addr(5));
        assert_eq!(ownership.holder_of(&id).unwrap(), Some(addr(5)));

        ownership.set_unavailable(true);
        assert!(ownership.holder_of(&id).is_err());
        ownership.set_unavailable(false);

        ownership.burn(&id);
        assert_eq!(ownership.holder_of(&id).unwrap(), None);
    }

    #[test]
    fn test_nonce_compare_and_increment() {
        let store = MemoryNonceStore::new();
        let p = addr(1);

        assert_eq!(store.get(&p, 0).unwrap(), 0);
        assert!(!store.compare_and_increment(&p, 0, 1).unwrap());
        assert!(store.compare_and_increment(&p, 0, 0).unwrap());
        assert!(!store.compare_and_increment(&p, 0, 0).unwrap());
        assert_eq!(store.get(&p, 0).unwrap(), 1);
        assert_eq!(store.get(&p, 7).unwrap(), 0);
    }

    #[test]
    fn test_failed_compare_leaves_channel_untouched() {
        let store = MemoryNonceStore::new();
        let p = addr(1);

        assert!(!store.compare_and_increment(&p, 3, 5).unwrap());
        assert!(store.counters.lock().unwrap().is_empty());
    }

    #[test]
    fn test_exhausted_channel_is_an_error() {
        let store = MemoryNonceStore::new();
        let p = addr(1);
        store.counters.lock().unwrap().insert((p, 0), u128::MAX);

        assert!(matches!(
            store.compare_and_increment(&p, 0, u128::MAX),
            Err(StoreError::InvalidData(_))
        ));
        assert_eq!(store.get(&p, 0).unwrap(), u128::MAX);
    }

    #[test]
    fn test_rollback_restores_state() {
        let account = MemoryAccount::new(addr(1), addr(2));
        let key = DataKey([7; 32]);
        account.write(key, Bytes::from_static(b"kept")).unwrap();

        account.begin().unwrap();
        account.write(key, Bytes::from_static(b"dropped")).unwrap();
        account.transfer_ownership(addr(3)).unwrap();
        account.forward_call(Operation::Call, addr(9), 0, &Bytes::new()).unwrap();
        account.rollback().unwrap();

        assert_eq!(account.get(&key), Bytes::from_static(b"kept"));
        assert_eq!(account.pending_owner(), None);
        assert_eq!(account.calls().len(), 1);
        assert_eq!(account.open_savepoints(), 0);
    }

    #[test]
    fn test_savepoints_nest() {
        let account = MemoryAccount::new(addr(1), addr(2));
        let (a, b) = (DataKey([1; 32]), DataKey([2; 32]));

        account.begin().unwrap();
        account.write(a, Bytes::from_static(b"a")).unwrap();
        account.begin().unwrap();
        account.write(b, Bytes::from_static(b"b")).unwrap();
        account.commit().unwrap();
        assert_eq!(account.get(&b), Bytes::from_static(b"b"));

        account.rollback().unwrap();
        assert!(account.get(&a).is_empty());
        assert!(account.get(&b).is_empty());
        assert_eq!(account.commit(), Err(ResourceError::NoSavepoint));
    }
}
