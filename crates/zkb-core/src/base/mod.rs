//! Foundational primitive types and byte/serde helpers.

mod address;
mod field;

pub use address::{ADDRESS_SIZE, Address};
pub use field::{FIELD_SIZE, Field};

/// Errors returned when parsing hex-encoded primitives.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    /// The input is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    /// The decoded input has the wrong number of bytes.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Decoded byte length.
        actual: usize,
    },
}

/// Decode an optionally `0x`-prefixed hex string into a fixed-size array.
pub(crate) fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| ParseError::InvalidLength {
        expected: N,
        actual,
    })
}
