//! # Tally Codec
//!
//! Encoding/decoding of the persisted counter record for tally.
//!
//! The store holds each counter as a small JSON document, currently
//! `{"value": <int>}`. Keeping the persisted form a structured document
//! rather than a store-native integer is deliberate: the record can grow
//! fields without a store migration, and the codec is the compatibility
//! boundary that keeps old blobs decodable.
//!
//! ## Compatibility Rules
//!
//! - `decode(encode(r)) == r` for every valid record
//! - Unknown fields are ignored on decode
//! - A missing `value` field decodes as 0
//! - Anything that is not a JSON object is a decode error
//!
//! ## Usage
//!
//! ```
//! use tally_codec::{CounterRecord, Decode, Encode};
//!
//! let record = CounterRecord::new(42);
//! let bytes = record.encode().unwrap();
//!
//! let decoded = CounterRecord::decode(&bytes).unwrap();
//! assert_eq!(record, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod record;

pub use error::{CodecError, CodecResult};
pub use record::CounterRecord;

/// Trait for types that can be encoded to store bytes.
pub trait Encode {
    /// Encode this value to bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from store bytes.
pub trait Decode: Sized {
    /// Decode this value from bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}
