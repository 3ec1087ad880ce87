//! SQLite-backed relay nonce counters.
//!
//! Counters survive restarts, so a relay request consumed before a restart
//! stays consumed after it.

use std::path::Path;
use std::sync::{Arc, Mutex};

use keyguard_core::Address;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::NonceStore;

/// Persistent [`NonceStore`].
///
/// Thread-safe via an internal Mutex; compare-and-increment runs in one
/// transaction while the lock is held.
pub struct SqliteNonceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNonceStore {
    /// Open a SQLite database at the given path, creating and migrating it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&mut conn)
    }
}

fn read_counter(conn: &Connection, principal: &Address, channel: u128) -> Result<u128> {
    let stored: Option<Vec<u8>> = conn
        .query_row(
            "SELECT next_index FROM relay_nonces WHERE principal = ?1 AND channel = ?2",
            params![&principal.0[..], &channel.to_be_bytes()[..]],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        None => Ok(0),
        Some(bytes) => {
            let arr: [u8; 16] = bytes.as_slice().try_into().map_err(|_| {
                StoreError::InvalidData(format!("nonce counter of {} bytes", bytes.len()))
            })?;
            Ok(u128::from_be_bytes(arr))
        }
    }
}

impl NonceStore for SqliteNonceStore {
    fn get(&self, principal: &Address, channel: u128) -> Result<u128> {
        self.with_conn_mut(|conn| read_counter(conn, principal, channel))
    }

    fn compare_and_increment(
        &self,
        principal: &Address,
        channel: u128,
        expected: u128,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let current = read_counter(&tx, principal, channel)?;
            if current != expected {
                return Ok(false);
            }
            let next = current
                .checked_add(1)
                .ok_or_else(|| StoreError::InvalidData("nonce counter overflow".into()))?;

            tx.execute(
                "INSERT INTO relay_nonces (principal, channel, next_index, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (principal, channel)
                 DO UPDATE SET next_index = excluded.next_index, updated_at = excluded.updated_at",
                params![
                    &principal.0[..],
                    &channel.to_be_bytes()[..],
                    &next.to_be_bytes()[..],
                    migration::now_millis()
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Address {
        Address::from_bytes([0x11; 20])
    }

    #[test]
    fn test_fresh_channel_starts_at_zero() {
        let store = SqliteNonceStore::open_memory().unwrap();
        assert_eq!(store.get(&principal(), 0).unwrap(), 0);
        assert_eq!(store.get(&principal(), u128::MAX).unwrap(), 0);
    }

    #[test]
    fn test_compare_and_increment() {
        let store = SqliteNonceStore::open_memory().unwrap();
        let p = principal();

        assert!(store.compare_and_increment(&p, 5, 0).unwrap());
        assert!(!store.compare_and_increment(&p, 5, 0).unwrap());
        assert!(store.compare_and_increment(&p, 5, 1).unwrap());
        assert_eq!(store.get(&p, 5).unwrap(), 2);
        assert_eq!(store.get(&p, 6).unwrap(), 0);
    }

    #[test]
    fn test_counters_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonces.db");

        {
            let store = SqliteNonceStore::open(&path).unwrap();
            assert!(store.compare_and_increment(&principal(), 1, 0).unwrap());
        }

        let store = SqliteNonceStore::open(&path).unwrap();
        assert_eq!(store.get(&principal(), 1).unwrap(), 1);
        assert!(!store.compare_and_increment(&principal(), 1, 0).unwrap());
    }
}
