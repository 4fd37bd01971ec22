//! # Tally Store
//!
//! Key-value store trait and implementations for tally.
//!
//! This crate provides the store abstraction the counter engine runs
//! against. Stores are **opaque byte stores** with three extras the engine
//! depends on:
//!
//! - per-key TTL with lazy expiry (an expired key reads as absent)
//! - a watch/commit primitive for optimistic concurrency control
//! - a distinguished conflict outcome on commit, separate from errors
//!
//! ## Design Principles
//!
//! - Stores do not interpret the bytes they hold; record encoding lives in
//!   `tally_codec`
//! - Conflicts are an outcome ([`Commit::Conflict`]), never an error
//! - Must be `Send + Sync` for concurrent callers sharing one handle
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral single-process use
//!
//! ## Example
//!
//! ```rust
//! use tally_store::{Commit, InMemoryStore, KeyValueStore, WriteOp};
//!
//! let store = InMemoryStore::new();
//! let watch = store.watch("hits").unwrap();
//! let outcome = store
//!     .commit(watch, vec![WriteOp::set("hits", b"{\"value\":1}".to_vec(), None)])
//!     .unwrap();
//! assert_eq!(outcome, Commit::Applied);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use store::{Commit, KeyValueStore, WatchHandle, WriteOp};
