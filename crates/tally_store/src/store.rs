//! Key-value store trait definition.

use crate::error::StoreResult;
use std::time::Duration;

/// A shared key-value store with TTL expiry and watch-based transactions.
///
/// Stores are **opaque byte stores**. They map non-empty string keys to
/// byte values and provide the primitives the counter engine builds its
/// optimistic read-modify-write cycle on. The store owns no record format
/// interpretation.
///
/// # Invariants
///
/// - A key whose TTL has elapsed is indistinguishable from one never set:
///   `get` returns `None` and `watch` observes absence
/// - `commit` applies all ops atomically or none of them
/// - `commit` returns [`Commit::Conflict`] if and only if the watched
///   key's observation no longer holds: another committer mutated it, or a
///   key watched as present expired. A key watched as absent that was
///   created and expired again before commit still matches its observation
/// - Implementations must be `Send + Sync`; one handle is shared by all
///   concurrent callers
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and ephemeral use
pub trait KeyValueStore: Send + Sync {
    /// Reads the current value for `key`.
    ///
    /// Returns `None` for keys that are absent or whose TTL has elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Opens a watch on `key`, capturing its current presence and version.
    ///
    /// The returned handle is the conflict-detection token for a subsequent
    /// [`commit`](Self::commit). Watching an absent key is valid; the
    /// handle then conflicts with any creation of that key before commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn watch(&self, key: &str) -> StoreResult<WatchHandle>;

    /// Atomically applies `ops`, conditional on the watched key being
    /// unchanged since `watch` was taken.
    ///
    /// Returns [`Commit::Applied`] when all ops took effect, or
    /// [`Commit::Conflict`] when the watched key no longer matches its
    /// observation and nothing was applied. That covers another committer
    /// touching the key, and a key watched as present expiring before the
    /// commit — a value read before expiry must not be committed past it.
    /// The handle is consumed either way; a conflicted attempt must start
    /// over with a fresh watch.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached. A lost race is not
    /// an error.
    fn commit(&self, watch: WatchHandle, ops: Vec<WriteOp>) -> StoreResult<Commit>;

    /// Removes `key`, returning whether a live value was present.
    ///
    /// This is the external flush path; the counter engine itself never
    /// deletes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    fn delete(&self, key: &str) -> StoreResult<bool>;
}

/// Conflict-detection token tied to one key's observed state.
///
/// Produced by [`KeyValueStore::watch`] and consumed by
/// [`KeyValueStore::commit`]. `observed` is the key's version at watch
/// time, or `None` if the key was absent (or expired) when watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHandle {
    /// The watched key.
    pub key: String,
    /// Version observed at watch time; `None` for an absent key.
    pub observed: Option<u64>,
}

impl WatchHandle {
    /// Creates a handle from an observation.
    #[must_use]
    pub fn new(key: impl Into<String>, observed: Option<u64>) -> Self {
        Self {
            key: key.into(),
            observed,
        }
    }
}

/// A single write inside a transactional commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Sets `key` to `bytes`, with an optional TTL starting at commit time.
    Set {
        /// The key to write.
        key: String,
        /// The value bytes.
        bytes: Vec<u8>,
        /// Time-to-live; `None` means the key never expires.
        ttl: Option<Duration>,
    },
    /// Removes `key`.
    Delete {
        /// The key to remove.
        key: String,
    },
}

impl WriteOp {
    /// Creates a set op.
    #[must_use]
    pub fn set(key: impl Into<String>, bytes: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self::Set {
            key: key.into(),
            bytes,
            ttl,
        }
    }

    /// Creates a delete op.
    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Outcome of a transactional commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a conflicted commit applied nothing and must be retried or surfaced"]
pub enum Commit {
    /// All ops were applied atomically.
    Applied,
    /// The watched key changed since the watch; nothing was applied.
    Conflict,
}

impl Commit {
    /// Returns true if the commit applied.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}
