//! Ledger identity and variant types.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Human-readable identifier of a ledger deployment (for example `"a"` or `"linea"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct LedgerId(String);

impl LedgerId {
    /// Create a new ledger identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LedgerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How a ledger takes custody of deposited value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerVariant {
    /// Deposits lock real balances in ledger custody; withdrawals release them.
    LockRelease,
    /// Deposits burn supply; withdrawals mint new supply.
    BurnMint,
}

impl fmt::Display for LedgerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockRelease => f.write_str("lock-release"),
            Self::BurnMint => f.write_str("burn-mint"),
        }
    }
}

/// Error returned for an unknown ledger variant name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid ledger variant: {0}. Expected 'lock-release' or 'burn-mint'.")]
pub struct UnknownVariant(String);

impl FromStr for LedgerVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lock-release" => Ok(Self::LockRelease),
            "burn-mint" => Ok(Self::BurnMint),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parse_matches_display() {
        for variant in [LedgerVariant::LockRelease, LedgerVariant::BurnMint] {
            assert_eq!(variant.to_string().parse::<LedgerVariant>(), Ok(variant));
        }
        assert!("vault".parse::<LedgerVariant>().is_err());
    }

    #[test]
    fn variant_serde_is_kebab_case() {
        let json = serde_json::to_string(&LedgerVariant::BurnMint).expect("serialize");
        assert_eq!(json, "\"burn-mint\"");
    }
}
