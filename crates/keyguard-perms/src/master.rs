//! Master override: the holder of one designated credential bypasses all
//! permission checks.
//!
//! Holdership is resolved on every call, so transferring the credential
//! moves the override immediately and the previous holder falls back to its
//! own stored permissions.

use std::sync::Arc;

use keyguard_core::{Address, CredentialId};
use keyguard_store::OwnershipLookup;

/// Resolves whether a principal currently holds the master credential.
#[derive(Clone)]
pub struct MasterOverrideResolver {
    credential: CredentialId,
    lookup: Arc<dyn OwnershipLookup>,
}

impl MasterOverrideResolver {
    pub fn new(credential: CredentialId, lookup: Arc<dyn OwnershipLookup>) -> Self {
        Self { credential, lookup }
    }

    /// The credential this resolver watches.
    pub fn credential(&self) -> CredentialId {
        self.credential
    }

    /// Current holder, if the lookup answers and anyone holds it.
    pub fn current_holder(&self) -> Option<Address> {
        match self.lookup.holder_of(&self.credential) {
            Ok(holder) => holder,
            Err(e) => {
                tracing::warn!(
                    credential = ?self.credential,
                    error = %e,
                    "master credential lookup failed"
                );
                None
            }
        }
    }

    /// Whether `principal` holds the credential right now.
    pub fn is_master_holder(&self, principal: &Address) -> bool {
        self.current_holder().as_ref() == Some(principal)
    }
}

impl std::fmt::Debug for MasterOverrideResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterOverrideResolver")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyguard_store::MemoryOwnership;

    #[test]
    fn test_holder_follows_transfers() {
        let ownership = Arc::new(MemoryOwnership::new());
        let id = CredentialId::from_u64(1);
        let a = Address::from_bytes([0xa; 20]);
        let b = Address::from_bytes([0xb; 20]);
        let resolver = MasterOverrideResolver::new(id, ownership.clone());

        assert!(!resolver.is_master_holder(&a));

        ownership.mint(id, a);
        assert!(resolver.is_master_holder(&a));

        ownership.transfer(id, b);
        assert!(!resolver.is_master_holder(&a));
        assert!(resolver.is_master_holder(&b));
    }

    #[test]
    fn test_lookup_failure_is_not_master() {
        let ownership = Arc::new(MemoryOwnership::new());
        let id = CredentialId::from_u64(7);
        let a = Address::from_bytes([0xa; 20]);
        ownership.mint(id, a);
        ownership.set_unavailable(true);

        let resolver = MasterOverrideResolver::new(id, ownership);
        assert!(!resolver.is_master_holder(&a));
        assert_eq!(resolver.current_holder(), None);
    }
}
