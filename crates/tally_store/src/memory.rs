//! In-memory store for testing and ephemeral use.

use crate::error::StoreResult;
use crate::store::{Commit, KeyValueStore, WatchHandle, WriteOp};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    version: u64,
    /// Expiry instant on the store clock; `None` means no TTL.
    expires_at: Option<Duration>,
}

impl Entry {
    fn is_live(&self, now: Duration) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_version: u64,
    clock_offset: Duration,
}

/// An in-memory key-value store.
///
/// Implements the full [`KeyValueStore`] contract, including watch-based
/// conflict detection and lazy TTL expiry, and is suitable for:
/// - Unit and integration tests
/// - Single-process ephemeral counters that don't need a shared store
///
/// Every committed mutation assigns the key a store-unique, monotonically
/// increasing version; a commit validates the watched key's
/// presence-and-version against the watch-time observation.
///
/// # Thread Safety
///
/// This store is thread-safe and designed to be shared across threads
/// behind an `Arc`.
///
/// # Time
///
/// TTLs are measured on an internal clock that tracks wall time but can be
/// advanced manually with [`advance`](InMemoryStore::advance), so expiry
/// tests don't sleep.
///
/// # Example
///
/// ```rust
/// use tally_store::{InMemoryStore, KeyValueStore, WriteOp};
/// use std::time::Duration;
///
/// let store = InMemoryStore::new();
/// let watch = store.watch("k").unwrap();
/// let outcome = store
///     .commit(watch, vec![WriteOp::set("k", b"v".to_vec(), Some(Duration::from_secs(1)))])
///     .unwrap();
/// assert!(outcome.is_applied());
/// assert!(store.get("k").unwrap().is_some());
///
/// store.advance(Duration::from_secs(2));
/// assert!(store.get("k").unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    origin: Instant,
    inner: RwLock<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the store clock, expiring keys whose TTL elapses.
    ///
    /// Useful for testing TTL behaviour without sleeping.
    pub fn advance(&self, by: Duration) {
        self.inner.write().clock_offset += by;
    }

    /// Returns the number of live (non-expired) keys.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        let now = self.now(&inner);
        inner.entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Returns true if the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all keys.
    pub fn clear(&self) {
        self.inner.write().entries.clear();
    }

    fn now(&self, inner: &Inner) -> Duration {
        self.origin.elapsed() + inner.clock_offset
    }

    fn observe(inner: &Inner, key: &str, now: Duration) -> Option<u64> {
        inner
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.version)
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.read();
        let now = self.now(&inner);
        Ok(inner
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.bytes.clone()))
    }

    fn watch(&self, key: &str) -> StoreResult<WatchHandle> {
        let inner = self.inner.read();
        let now = self.now(&inner);
        Ok(WatchHandle::new(key, Self::observe(&inner, key, now)))
    }

    fn commit(&self, watch: WatchHandle, ops: Vec<WriteOp>) -> StoreResult<Commit> {
        let mut inner = self.inner.write();
        let now = self.now(&inner);

        if Self::observe(&inner, &watch.key, now) != watch.observed {
            return Ok(Commit::Conflict);
        }

        for op in ops {
            match op {
                WriteOp::Set { key, bytes, ttl } => {
                    inner.next_version += 1;
                    let version = inner.next_version;
                    inner.entries.insert(
                        key,
                        Entry {
                            bytes,
                            version,
                            expires_at: ttl.map(|t| now + t),
                        },
                    );
                }
                WriteOp::Delete { key } => {
                    inner.entries.remove(&key);
                }
            }
        }

        Ok(Commit::Applied)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        let now = self.now(&inner);
        let was_live = Self::observe(&inner, key, now).is_some();
        inner.entries.remove(key);
        Ok(was_live)
    }
}
