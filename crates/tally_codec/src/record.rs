//! The persisted counter record.

use crate::error::{CodecError, CodecResult};
use crate::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The record persisted for one counter key.
///
/// Serialized as `{"value": <int>}`. Decoding is lenient about fields it
/// does not know and about a missing `value` (treated as 0), so records
/// written by older and newer schema versions keep decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Accumulated total for the key.
    #[serde(default)]
    pub value: i64,
}

impl CounterRecord {
    /// Creates a record holding `value`.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self { value }
    }
}

impl Encode for CounterRecord {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }
}

impl Decode for CounterRecord {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }
}
