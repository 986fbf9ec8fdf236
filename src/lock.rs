//! Per-account lock manager
//!
//! Serializes every fetch-mutate-persist sequence that touches the same
//! account. Callers ask for all the keys an operation needs in one call;
//! keys are always taken in ascending order, so two transfers running in
//! opposite directions cannot deadlock.
//!
//! Locks are released when the returned [`AccountLockGuard`] is dropped.
//! Entries for keys nobody holds or waits on are pruned on release, so the
//! table only grows with the number of accounts under contention.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::domain::AccountNumber;

/// Something an operation needs exclusive access to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// Balance of one account
    Account(AccountNumber),
    /// Reservation of a login name during account creation
    Login(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Account(number) => write!(f, "account:{}", number),
            LockKey::Login(name) => write!(f, "login:{}", name),
        }
    }
}

/// Lock acquisition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("Timed out after {waited:?} waiting for lock on {key}")]
    Timeout { key: String, waited: Duration },
}

type LockTable = HashMap<LockKey, Arc<Mutex<()>>>;

/// Table of per-key async mutexes. Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct AccountLocks {
    table: Arc<StdMutex<LockTable>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire every key in `keys`, waiting at most `timeout` in total.
    ///
    /// Duplicate keys are collapsed. On timeout, locks already taken by
    /// this call are released before returning.
    pub async fn acquire<I>(&self, keys: I, timeout: Duration) -> Result<AccountLockGuard, LockError>
    where
        I: IntoIterator<Item = LockKey>,
    {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let deadline = Instant::now() + timeout;
        let mut guard = AccountLockGuard {
            locks: self.clone(),
            held: Vec::with_capacity(keys.len()),
        };

        for key in keys {
            // `lock_owned` consumes this Arc; it is dropped when the wait ends.
            let mutex = self.entry(&key);
            match tokio::time::timeout_at(deadline, mutex.lock_owned()).await {
                Ok(lock) => {
                    tracing::debug!(key = %key, "Lock acquired");
                    guard.held.push((key, lock));
                }
                Err(_) => {
                    tracing::warn!(key = %key, waited = ?timeout, "Lock wait timed out");
                    self.prune(std::slice::from_ref(&key));
                    return Err(LockError::Timeout {
                        key: key.to_string(),
                        waited: timeout,
                    });
                }
            }
        }

        Ok(guard)
    }

    /// Number of keys currently tracked (held or waited on)
    pub fn tracked_keys(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, LockTable> {
        // The table is only mutated by insert/remove, so a poisoned lock
        // still holds a consistent map.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, key: &LockKey) -> Arc<Mutex<()>> {
        self.table()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop table entries that only the table itself still references
    fn prune(&self, keys: &[LockKey]) {
        let mut table = self.table();
        for key in keys {
            if table
                .get(key)
                .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
            {
                table.remove(key);
            }
        }
    }
}

/// Exclusive access to a set of keys. Released on drop.
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct AccountLockGuard {
    locks: AccountLocks,
    held: Vec<(LockKey, OwnedMutexGuard<()>)>,
}

impl AccountLockGuard {
    /// Keys held by this guard, in acquisition order
    pub fn keys(&self) -> impl Iterator<Item = &LockKey> {
        self.held.iter().map(|(key, _)| key)
    }
}

impl fmt::Debug for AccountLockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountLockGuard")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for AccountLockGuard {
    fn drop(&mut self) {
        let keys: Vec<LockKey> = self
            .held
            .drain(..)
            .rev()
            .map(|(key, lock)| {
                drop(lock);
                key
            })
            .collect();

        if !keys.is_empty() {
            tracing::debug!(keys = keys.len(), "Locks released");
            self.locks.prune(&keys);
        }
    }
}
