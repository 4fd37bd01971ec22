//! Error types for the counter engine.

use thiserror::Error;

/// Result type for counter operations.
pub type CounterResult<T> = Result<T, CounterError>;

/// Errors that can occur during counter operations.
///
/// Conflicts with concurrent writers never appear here directly; they are
/// retried inside the engine and only surface as [`ContentionExhausted`]
/// once the attempt bound is spent.
///
/// [`ContentionExhausted`]: CounterError::ContentionExhausted
#[derive(Debug, Error)]
pub enum CounterError {
    /// Store error (connectivity class).
    #[error("store error: {0}")]
    Store(#[from] tally_store::StoreError),

    /// Codec error (data-integrity class).
    #[error("codec error: {0}")]
    Codec(#[from] tally_codec::CodecError),

    /// The key was empty.
    #[error("key cannot be empty")]
    EmptyKey,

    /// Applying the delta would overflow the 64-bit value.
    #[error("counter overflow on key {key:?}")]
    Overflow {
        /// The key whose value would overflow.
        key: String,
    },

    /// Every attempt lost its optimistic-locking race.
    #[error("contention exhausted on key {key:?} after {attempts} attempts")]
    ContentionExhausted {
        /// The contended key.
        key: String,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The configured deadline elapsed before a commit succeeded.
    #[error("deadline exceeded on key {key:?}")]
    DeadlineExceeded {
        /// The key being incremented.
        key: String,
    },
}

impl CounterError {
    /// Returns true if the whole request can reasonably be retried upstream.
    ///
    /// Transient errors cover an unreachable store and contention/deadline
    /// exhaustion. Codec errors are a data-integrity problem: the same
    /// corrupt bytes would be re-read, so retrying cannot help. Empty-key
    /// and overflow are caller bugs.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::ContentionExhausted { .. } | Self::DeadlineExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_codec::CodecError;
    use tally_store::StoreError;

    #[test]
    fn transient_classification() {
        assert!(CounterError::from(StoreError::unavailable("refused")).is_transient());
        assert!(CounterError::ContentionExhausted {
            key: "k".into(),
            attempts: 8,
        }
        .is_transient());
        assert!(CounterError::DeadlineExceeded { key: "k".into() }.is_transient());

        assert!(!CounterError::from(CodecError::decoding_failed("bad json")).is_transient());
        assert!(!CounterError::EmptyKey.is_transient());
        assert!(!CounterError::Overflow { key: "k".into() }.is_transient());
    }

    #[test]
    fn error_display() {
        let err = CounterError::ContentionExhausted {
            key: "cart:7".into(),
            attempts: 8,
        };
        assert!(err.to_string().contains("cart:7"));
        assert!(err.to_string().contains('8'));
    }
}
