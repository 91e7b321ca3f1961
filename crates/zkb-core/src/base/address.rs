//! Account and asset addresses.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

use super::{ParseError, decode_hex_array};

/// Size of an address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// A 20-byte account or asset identifier, displayed as `0x`-prefixed hex.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, SerializeDisplay, DeserializeFromStr,
)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Create an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create an address whose last byte is `tag`. Handy for fixtures and devnets.
    #[must_use]
    #[allow(clippy::indexing_slicing, reason = "Index is a constant within bounds")]
    pub const fn from_tag(tag: u8) -> Self {
        let mut bytes = [0_u8; ADDRESS_SIZE];
        bytes[ADDRESS_SIZE - 1] = tag;
        Self(bytes)
    }

    /// Get the underlying bytes.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; ADDRESS_SIZE] {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_array(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let address: Address = "0x00000000000000000000000000000000000000aa"
            .parse()
            .expect("valid address");
        assert_eq!(address, Address::from_tag(0xaa));
        assert_eq!(
            address.to_string(),
            "0x00000000000000000000000000000000000000aa"
        );
    }

    #[test]
    fn rejects_field_sized_input() {
        let result = "0x0000000000000000000000000000000000000000000000000000000000000001"
            .parse::<Address>();
        assert!(matches!(
            result,
            Err(ParseError::InvalidLength {
                expected: ADDRESS_SIZE,
                actual: 32
            })
        ));
    }
}
