//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// A commit losing an optimistic-locking race is **not** an error; it is
/// reported as [`crate::Commit::Conflict`]. These variants cover the
/// machinery failing, not a concurrent writer winning.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable or a request to it failed.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The store handle has been closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
