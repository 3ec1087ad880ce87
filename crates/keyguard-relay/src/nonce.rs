//! Replay protection: one counter per (signer, channel).
//!
//! Channels let a signer keep several independent request sequences in
//! flight. Within a channel, requests are accepted strictly in order.

use std::sync::Arc;

use keyguard_core::Address;
use keyguard_store::NonceStore;

use crate::envelope::RelayNonce;
use crate::error::{RelayError, Result};

/// Wraps a [`NonceStore`] with exact-match consumption.
#[derive(Clone)]
pub struct NonceRegistry {
    store: Arc<dyn NonceStore>,
}

impl NonceRegistry {
    pub fn new(store: Arc<dyn NonceStore>) -> Self {
        Self { store }
    }

    /// The nonce the next request on `channel` must carry.
    pub fn current(&self, signer: &Address, channel: u128) -> Result<RelayNonce> {
        let index = self.store.get(signer, channel)?;
        Ok(RelayNonce::new(channel, index))
    }

    /// Whether `nonce` is the next expected one, without consuming it.
    pub fn check(&self, signer: &Address, nonce: RelayNonce) -> Result<()> {
        let expected = self.current(signer, nonce.channel)?;
        if expected != nonce {
            return Err(RelayError::InvalidRelayNonce {
                signer: *signer,
                expected,
                got: nonce,
            });
        }
        Ok(())
    }

    /// Consume `nonce`. Fails if it is not the next expected one.
    pub fn consume(&self, signer: &Address, nonce: RelayNonce) -> Result<()> {
        if self
            .store
            .compare_and_increment(signer, nonce.channel, nonce.index)?
        {
            tracing::trace!(%signer, %nonce, "relay nonce consumed");
            return Ok(());
        }
        Err(RelayError::InvalidRelayNonce {
            signer: *signer,
            expected: self.current(signer, nonce.channel)?,
            got: nonce,
        })
    }
}

impl std::fmt::Debug for NonceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyguard_store::{MemoryNonceStore, SqliteNonceStore};
    use proptest::prelude::*;

    fn signer() -> Address {
        Address::from_bytes([0x51; 20])
    }

    #[test]
    fn test_consume_in_order() {
        let registry = NonceRegistry::new(Arc::new(MemoryNonceStore::new()));

        assert_eq!(registry.current(&signer(), 4).unwrap(), RelayNonce::new(4, 0));
        registry.consume(&signer(), RelayNonce::new(4, 0)).unwrap();
        assert_eq!(registry.current(&signer(), 4).unwrap(), RelayNonce::new(4, 1));

        let err = registry.consume(&signer(), RelayNonce::new(4, 0)).unwrap_err();
        assert!(matches!(
            err,
            RelayError::InvalidRelayNonce { expected, got, .. }
                if expected == RelayNonce::new(4, 1) && got == RelayNonce::new(4, 0)
        ));
    }

    #[test]
    fn test_check_does_not_consume() {
        let registry = NonceRegistry::new(Arc::new(MemoryNonceStore::new()));
        registry.check(&signer(), RelayNonce::new(0, 0)).unwrap();
        registry.check(&signer(), RelayNonce::new(0, 0)).unwrap();
        assert!(registry.check(&signer(), RelayNonce::new(0, 1)).is_err());
    }

    #[test]
    fn test_sqlite_backed_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteNonceStore::open(dir.path().join("relay.db")).unwrap();
        let registry = NonceRegistry::new(Arc::new(store));

        registry.consume(&signer(), RelayNonce::new(1, 0)).unwrap();
        registry.consume(&signer(), RelayNonce::new(1, 1)).unwrap();
        assert!(registry.consume(&signer(), RelayNonce::new(1, 1)).is_err());
        assert_eq!(registry.current(&signer(), 2).unwrap(), RelayNonce::new(2, 0));
    }

    proptest! {
        #[test]
        fn test_channels_are_independent(
            channels in prop::collection::vec(any::<u128>(), 1..6),
            rounds in 1u128..4,
        ) {
            let registry = NonceRegistry::new(Arc::new(MemoryNonceStore::new()));
            let mut distinct = channels.clone();
            distinct.sort_unstable();
            distinct.dedup();

            for index in 0..rounds {
                for channel in &distinct {
                    prop_assert!(registry.consume(&signer(), RelayNonce::new(*channel, index)).is_ok());
                }
            }
            for channel in &distinct {
                prop_assert!(registry.consume(&signer(), RelayNonce::new(*channel, rounds - 1)).is_err());
                prop_assert_eq!(
                    registry.current(&signer(), *channel).unwrap(),
                    RelayNonce::new(*channel, rounds)
                );
            }
        }
    }
}
