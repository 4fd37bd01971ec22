//! # Tally Core
//!
//! Optimistically-locked keyed counter engine.
//!
//! This crate provides:
//! - [`OptimisticCounter`] - the watch/read/modify/commit increment loop
//! - [`CounterConfig`] and [`RetryConfig`] - TTL, attempt bound, backoff,
//!   deadline
//! - [`CounterError`] - the caller-facing error taxonomy
//!
//! A counter runs against any [`tally_store::KeyValueStore`]; the store
//! handle is injected at construction and shared by all callers. Conflicts
//! with concurrent writers are detected store-side and retried here, so no
//! committed increment is ever lost and callers never see a conflict while
//! attempts remain.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod counter;
mod error;

pub use config::{CounterConfig, RetryConfig};
pub use counter::OptimisticCounter;
pub use error::{CounterError, CounterResult};
