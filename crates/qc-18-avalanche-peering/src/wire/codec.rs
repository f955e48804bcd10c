//! Binary codec shared by wire messages and the proof/delegation formats.
//!
//! Fixed-width little-endian integers, bounded input, no trailing bytes.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Upper bound on a single decoded payload.
pub const MAX_PAYLOAD_SIZE: u64 = 2 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_PAYLOAD_SIZE)
        .reject_trailing_bytes()
}

/// Encode `value`.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    options().serialize(value)
}

/// Decode a `T`, rejecting oversized or trailing input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, bincode::Error> {
    options().deserialize(bytes)
}
