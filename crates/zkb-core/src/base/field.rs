//! 32-byte field elements used for commitments, nullifiers and tree nodes.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

use super::{ParseError, decode_hex_array};

/// Size of a field element in bytes.
pub const FIELD_SIZE: usize = 32;

/// A big-endian 32-byte field element.
///
/// Commitments, nullifiers, tree nodes and roots are all field elements. The
/// value is opaque to the bridge: only the hasher interprets its bytes.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    bytemuck::Pod,
    bytemuck::Zeroable,
    SerializeDisplay,
    DeserializeFromStr,
)]
#[repr(transparent)]
pub struct Field([u8; FIELD_SIZE]);

impl Field {
    /// The all-zero element. Never a valid tree root.
    pub const ZERO: Self = Self([0_u8; FIELD_SIZE]);

    /// Create a field element from its big-endian bytes.
    #[must_use]
    pub const fn new(bytes: [u8; FIELD_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a field element holding a small integer (big-endian, right aligned).
    #[must_use]
    #[allow(
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        reason = "Loop indices are bounded by the array sizes"
    )]
    pub const fn from_u64(value: u64) -> Self {
        let mut bytes = [0_u8; FIELD_SIZE];
        let be = value.to_be_bytes();
        let mut i = 0;
        while i < be.len() {
            bytes[FIELD_SIZE - be.len() + i] = be[i];
            i += 1;
        }
        Self(bytes)
    }

    /// Get the underlying bytes.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; FIELD_SIZE] {
        self.0
    }

    /// Returns `true` for the all-zero element.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0_u8; FIELD_SIZE]
    }
}

impl AsRef<[u8; FIELD_SIZE]> for Field {
    fn as_ref(&self) -> &[u8; FIELD_SIZE] {
        &self.0
    }
}

impl From<[u8; FIELD_SIZE]> for Field {
    fn from(bytes: [u8; FIELD_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Field> for [u8; FIELD_SIZE] {
    fn from(field: Field) -> Self {
        field.0
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({self})")
    }
}

impl FromStr for Field {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_array(s).map(Self)
    }
}
