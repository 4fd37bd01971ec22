//! The optimistically-locked counter.

use crate::config::CounterConfig;
use crate::error::{CounterError, CounterResult};
use std::sync::Arc;
use std::time::Instant;
use tally_codec::{CounterRecord, Decode, Encode};
use tally_store::{Commit, KeyValueStore, WriteOp};

/// Outcome of a single optimistic attempt.
enum Attempt {
    Committed(i64),
    Conflicted,
}

/// A keyed counter with optimistic concurrency control.
///
/// `increment` runs the watch/read/modify/commit cycle against the injected
/// store: it watches the key, reads and decodes the current record (absent
/// counts as 0), adds the delta, and commits the new record with a
/// refreshed TTL. A commit that loses to a concurrent writer is retried
/// with exponential backoff up to the configured attempt bound and
/// deadline; every other failure propagates immediately.
///
/// The record is persisted as a structured document rather than a
/// store-native integer so the schema can grow without losing the
/// no-lost-update guarantee; see `tally_codec`.
///
/// # Thread Safety
///
/// The counter holds no per-call state; one instance behind an `Arc` serves
/// all concurrent callers. Increments on the same key serialize through
/// the store's conflict detection, increments on different keys are fully
/// independent.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tally_core::OptimisticCounter;
/// use tally_store::InMemoryStore;
///
/// let counter = OptimisticCounter::new(Arc::new(InMemoryStore::new()));
/// assert_eq!(counter.increment("age", 19).unwrap(), 19);
/// assert_eq!(counter.increment("age", 19).unwrap(), 38);
/// ```
pub struct OptimisticCounter {
    store: Arc<dyn KeyValueStore>,
    config: CounterConfig,
}

impl OptimisticCounter {
    /// Creates a counter over `store` with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(store, CounterConfig::default())
    }

    /// Creates a counter over `store` with an explicit configuration.
    #[must_use]
    pub fn with_config(store: Arc<dyn KeyValueStore>, config: CounterConfig) -> Self {
        Self { store, config }
    }

    /// Returns the counter's configuration.
    #[must_use]
    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Atomically adds `delta` to the counter at `key`, returning the new
    /// accumulated value.
    ///
    /// An absent (or expired) key starts from 0, so the first increment
    /// creates the record. Every successful call rewrites the record and
    /// refreshes its TTL, including `delta == 0`.
    ///
    /// # Errors
    ///
    /// - [`CounterError::EmptyKey`] if `key` is empty
    /// - [`CounterError::Overflow`] if `value + delta` overflows `i64`
    /// - [`CounterError::Codec`] if the persisted record is corrupt
    /// - [`CounterError::Store`] if the store fails
    /// - [`CounterError::ContentionExhausted`] if every attempt lost its
    ///   race to a concurrent writer
    /// - [`CounterError::DeadlineExceeded`] if the configured deadline
    ///   elapsed first
    pub fn increment(&self, key: &str, delta: i64) -> CounterResult<i64> {
        if key.is_empty() {
            return Err(CounterError::EmptyKey);
        }

        let started = Instant::now();
        let max_attempts = self.config.retry.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let mut delay = self.config.retry.delay_for_attempt(attempt);
            if let Some(deadline) = self.config.deadline {
                // Clamp the backoff sleep to the remaining budget so one
                // delay cannot overrun the deadline.
                match deadline.checked_sub(started.elapsed()) {
                    Some(remaining) if !remaining.is_zero() => delay = delay.min(remaining),
                    _ => return Err(CounterError::DeadlineExceeded { key: key.into() }),
                }
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            match self.try_increment(key, delta)? {
                Attempt::Committed(value) => {
                    tracing::debug!(key, value, attempt, "increment committed");
                    return Ok(value);
                }
                Attempt::Conflicted => {
                    tracing::debug!(key, attempt, "commit conflicted, retrying");
                }
            }
        }

        tracing::warn!(key, attempts = max_attempts, "contention exhausted");
        Err(CounterError::ContentionExhausted {
            key: key.into(),
            attempts: max_attempts,
        })
    }

    /// One watch/read/modify/commit cycle.
    ///
    /// Only a lost commit race maps to [`Attempt::Conflicted`]; store and
    /// codec failures propagate so the caller-visible classification stays
    /// precise.
    fn try_increment(&self, key: &str, delta: i64) -> CounterResult<Attempt> {
        let watch = self.store.watch(key)?;

        let current = match self.store.get(key)? {
            Some(bytes) => CounterRecord::decode(&bytes)?.value,
            None => {
                tracing::debug!(key, "key absent, creating");
                0
            }
        };

        let value = current
            .checked_add(delta)
            .ok_or_else(|| CounterError::Overflow { key: key.into() })?;

        let bytes = CounterRecord::new(value).encode()?;
        let ops = vec![WriteOp::set(key, bytes, Some(self.config.ttl))];

        match self.store.commit(watch, ops)? {
            Commit::Applied => Ok(Attempt::Committed(value)),
            Commit::Conflict => Ok(Attempt::Conflicted),
        }
    }
}

impl std::fmt::Debug for OptimisticCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticCounter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tally_store::{InMemoryStore, StoreError, StoreResult, WatchHandle};

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(8)
            .with_initial_delay(Duration::from_micros(10))
            .with_max_delay(Duration::from_micros(100))
    }

    fn counter_over(store: Arc<dyn KeyValueStore>) -> OptimisticCounter {
        OptimisticCounter::with_config(store, CounterConfig::new().with_retry(fast_retry()))
    }

    #[test]
    fn sequential_increments_accumulate() {
        let counter = counter_over(Arc::new(InMemoryStore::new()));
        assert_eq!(counter.increment("age", 19).unwrap(), 19);
        assert_eq!(counter.increment("age", 19).unwrap(), 38);
    }

    #[test]
    fn negative_deltas_subtract() {
        let counter = counter_over(Arc::new(InMemoryStore::new()));
        assert_eq!(counter.increment("k", 10).unwrap(), 10);
        assert_eq!(counter.increment("k", -25).unwrap(), -15);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let counter = counter_over(Arc::new(InMemoryStore::new()));
        assert_eq!(counter.increment("a", 1).unwrap(), 1);
        assert_eq!(counter.increment("b", 5).unwrap(), 5);
        assert_eq!(counter.increment("a", 1).unwrap(), 2);
    }

    #[test]
    fn empty_key_is_rejected() {
        let counter = counter_over(Arc::new(InMemoryStore::new()));
        assert!(matches!(
            counter.increment("", 1),
            Err(CounterError::EmptyKey)
        ));
    }

    #[test]
    fn overflow_is_fatal() {
        let counter = counter_over(Arc::new(InMemoryStore::new()));
        counter.increment("k", i64::MAX).unwrap();
        assert!(matches!(
            counter.increment("k", 1),
            Err(CounterError::Overflow { .. })
        ));
        // The stored value is untouched by the failed attempt.
        assert_eq!(counter.increment("k", 0).unwrap(), i64::MAX);
    }

    #[test]
    fn expired_key_restarts_from_zero() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter_over(store.clone());

        counter.increment("k", 42).unwrap();
        store.advance(counter.config().ttl + Duration::from_secs(1));

        assert_eq!(counter.increment("k", 5).unwrap(), 5);
    }

    #[test]
    fn write_refreshes_ttl() {
        let store = Arc::new(InMemoryStore::new());
        let counter = counter_over(store.clone());
        let ttl = counter.config().ttl;

        counter.increment("k", 1).unwrap();

        // Keep touching the key just before each expiry; it must survive
        // well past the original TTL.
        for _ in 0..3 {
            store.advance(ttl - Duration::from_secs(1));
            assert_eq!(counter.increment("k", 0).unwrap(), 1);
        }
    }

    #[test]
    fn zero_delta_does_not_change_value() {
        let counter = counter_over(Arc::new(InMemoryStore::new()));
        counter.increment("k", 7).unwrap();
        assert_eq!(counter.increment("k", 0).unwrap(), 7);
    }

    #[test]
    fn corrupt_record_is_fatal_not_retried() {
        let store = Arc::new(InMemoryStore::new());
        let watch = store.watch("k").unwrap();
        let outcome = store
            .commit(watch, vec![WriteOp::set("k", b"not json".to_vec(), None)])
            .unwrap();
        assert_eq!(outcome, Commit::Applied);

        let counter = counter_over(store.clone());
        assert!(matches!(
            counter.increment("k", 1),
            Err(CounterError::Codec(_))
        ));
        // The corrupt bytes are still there; nothing was half-applied.
        assert_eq!(store.get("k").unwrap(), Some(b"not json".to_vec()));
    }

    /// Store whose commits always lose the race.
    struct AlwaysConflict {
        inner: InMemoryStore,
        commits: AtomicU32,
    }

    impl KeyValueStore for AlwaysConflict {
        fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }
        fn watch(&self, key: &str) -> StoreResult<WatchHandle> {
            self.inner.watch(key)
        }
        fn commit(&self, _watch: WatchHandle, _ops: Vec<WriteOp>) -> StoreResult<Commit> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(Commit::Conflict)
        }
        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn sustained_contention_exhausts_attempt_bound() {
        let store = Arc::new(AlwaysConflict {
            inner: InMemoryStore::new(),
            commits: AtomicU32::new(0),
        });
        let counter = OptimisticCounter::with_config(
            store.clone(),
            CounterConfig::new().with_retry(
                fast_retry().with_initial_delay(Duration::from_micros(1)),
            ),
        );

        match counter.increment("hot", 1) {
            Err(CounterError::ContentionExhausted { key, attempts }) => {
                assert_eq!(key, "hot");
                assert_eq!(attempts, 8);
            }
            other => panic!("expected contention exhaustion, got {other:?}"),
        }
        assert_eq!(store.commits.load(Ordering::SeqCst), 8);
    }

    /// Store that is unreachable, counting how often it is asked.
    struct Unreachable {
        calls: AtomicU32,
    }

    impl KeyValueStore for Unreachable {
        fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
            Err(StoreError::unavailable("connection refused"))
        }
        fn watch(&self, _key: &str) -> StoreResult<WatchHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::unavailable("connection refused"))
        }
        fn commit(&self, _watch: WatchHandle, _ops: Vec<WriteOp>) -> StoreResult<Commit> {
            Err(StoreError::unavailable("connection refused"))
        }
        fn delete(&self, _key: &str) -> StoreResult<bool> {
            Err(StoreError::unavailable("connection refused"))
        }
    }

    #[test]
    fn connectivity_error_propagates_without_retry() {
        let store = Arc::new(Unreachable {
            calls: AtomicU32::new(0),
        });
        let counter = counter_over(store.clone());

        let err = counter.increment("k", 1).unwrap_err();
        assert!(matches!(err, CounterError::Store(_)));
        assert!(err.is_transient());
        // One attempt only; connectivity failures are not conflicts.
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deadline_clamps_backoff_sleeps() {
        let store = Arc::new(AlwaysConflict {
            inner: InMemoryStore::new(),
            commits: AtomicU32::new(0),
        });
        // Backoff far larger than the deadline; an unclamped sleep would
        // blow well past it.
        let counter = OptimisticCounter::with_config(
            store,
            CounterConfig::new()
                .with_deadline(Duration::from_millis(10))
                .with_retry(
                    RetryConfig::new(8)
                        .with_initial_delay(Duration::from_millis(200))
                        .with_max_delay(Duration::from_millis(200)),
                ),
        );

        let started = Instant::now();
        let err = counter.increment("hot", 1).unwrap_err();
        assert!(matches!(err, CounterError::DeadlineExceeded { .. }));
        assert!(
            started.elapsed() < Duration::from_millis(100),
            "call ran {:?} against a 10ms deadline",
            started.elapsed()
        );
    }

    #[test]
    fn elapsed_deadline_stops_the_loop() {
        let counter = OptimisticCounter::with_config(
            Arc::new(InMemoryStore::new()),
            CounterConfig::new().with_deadline(Duration::ZERO),
        );
        assert!(matches!(
            counter.increment("k", 1),
            Err(CounterError::DeadlineExceeded { .. })
        ));
    }
}
