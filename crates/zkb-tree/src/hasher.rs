//! Two-to-one compression functions used to combine tree nodes.
//!
//! Both ledgers of a bridge must use the same hasher, otherwise their roots
//! diverge even when their leaves agree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use zkb_core::base::{FIELD_SIZE, Field};

/// Value of an empty leaf slot.
///
/// `keccak256("tornado") mod p` for the BN254 scalar field, kept so that empty
/// subtrees match deployments that share this constant.
pub const ZERO_LEAF: Field = Field::new([
    0x2f, 0xe5, 0x4c, 0x60, 0xd3, 0xac, 0xab, 0xf3, 0x34, 0x3a, 0x35, 0xb6, 0xeb, 0xa1, 0x5d, 0xb4,
    0x82, 0x1b, 0x34, 0x0f, 0x76, 0xe7, 0x41, 0xe2, 0x24, 0x96, 0x85, 0xed, 0x48, 0x99, 0xaf, 0x6c,
]);

/// Personalization for the `BLAKE2s` node hash (8 bytes max).
const BLAKE2S_PERSONALIZATION: &[u8; 8] = b"zkb_node";

/// A pure, deterministic two-input hash.
pub trait Hasher: Clone + fmt::Debug + Send + Sync + 'static {
    /// Combine two nodes into their parent.
    fn hash2(&self, left: &Field, right: &Field) -> Field;
}

/// SHA-256 over `left || right`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash2(&self, left: &Field, right: &Field) -> Field {
        let digest = Sha256::new()
            .chain_update(left.as_ref())
            .chain_update(right.as_ref())
            .finalize();
        let mut out = [0_u8; FIELD_SIZE];
        out.copy_from_slice(&digest);
        Field::new(out)
    }
}

/// Personalized `BLAKE2s-256` over `left || right`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blake2sHasher;

impl Hasher for Blake2sHasher {
    fn hash2(&self, left: &Field, right: &Field) -> Field {
        let digest = blake2s_simd::Params::new()
            .hash_length(FIELD_SIZE)
            .personal(BLAKE2S_PERSONALIZATION)
            .to_state()
            .update(left.as_ref())
            .update(right.as_ref())
            .finalize();
        let mut out = [0_u8; FIELD_SIZE];
        out.copy_from_slice(digest.as_bytes());
        Field::new(out)
    }
}

/// Runtime selection of a hasher, as stored in configuration and state files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// [`Sha256Hasher`].
    #[default]
    Sha256,
    /// [`Blake2sHasher`].
    Blake2s,
}

impl Hasher for HasherKind {
    fn hash2(&self, left: &Field, right: &Field) -> Field {
        match self {
            Self::Sha256 => Sha256Hasher.hash2(left, right),
            Self::Blake2s => Blake2sHasher.hash2(left, right),
        }
    }
}

impl From<Sha256Hasher> for HasherKind {
    fn from(_: Sha256Hasher) -> Self {
        Self::Sha256
    }
}

impl From<Blake2sHasher> for HasherKind {
    fn from(_: Blake2sHasher) -> Self {
        Self::Blake2s
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Blake2s => f.write_str("blake2s"),
        }
    }
}

/// Error returned for an unknown hasher name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid hasher: {0}. Expected 'sha256' or 'blake2s'.")]
pub struct UnknownHasher(String);

impl FromStr for HasherKind {
    type Err = UnknownHasher;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "blake2s" => Ok(Self::Blake2s),
            other => Err(UnknownHasher(other.to_owned())),
        }
    }
}

/// Roots of empty subtrees: `table[0]` is [`ZERO_LEAF`], `table[l + 1]` hashes
/// two copies of `table[l]`.
#[must_use]
pub fn zero_table<H: Hasher>(hasher: &H, depth: u8) -> Vec<Field> {
    let mut table = Vec::with_capacity(usize::from(depth).saturating_add(1));
    let mut current = ZERO_LEAF;
    table.push(current);
    for _ in 0..depth {
        current = hasher.hash2(&current, &current);
        table.push(current);
    }
    table
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn sha256_matches_reference_vector() {
        let hash = Sha256Hasher.hash2(&Field::from_u64(1), &Field::from_u64(2));
        assert_eq!(
            hash.to_bytes(),
            hex!("d6ba9329f8932c12192b37849f772104d20048f76434a3290512d9d814e4116f")
        );
    }

    #[test]
    fn zero_table_first_levels() {
        let sha = zero_table(&Sha256Hasher, 1);
        assert_eq!(sha.len(), 2);
        assert_eq!(sha.first(), Some(&ZERO_LEAF));
        assert_eq!(
            sha.get(1).map(Field::to_bytes),
            Some(hex!(
                "e656eee143c3b6c56c597c1d114ede3e231efcb6f4f74b0a3621463097fe9411"
            ))
        );

        let blake = zero_table(&Blake2sHasher, 1);
        assert_eq!(
            blake.get(1).map(Field::to_bytes),
            Some(hex!(
                "77b45d94d52414e3fd2a9771739316d2834f9c646af6ec20cf09e73f1405fd7d"
            ))
        );
    }

    #[test]
    fn hash_is_order_sensitive() {
        let a = Field::from_u64(1);
        let b = Field::from_u64(2);
        assert_ne!(Sha256Hasher.hash2(&a, &b), Sha256Hasher.hash2(&b, &a));
        assert_ne!(Sha256Hasher.hash2(&a, &b), Blake2sHasher.hash2(&a, &b));
    }

    #[test]
    fn kind_dispatches_to_concrete_hasher() {
        let a = Field::from_u64(3);
        let b = Field::from_u64(4);
        assert_eq!(HasherKind::Sha256.hash2(&a, &b), Sha256Hasher.hash2(&a, &b));
        assert_eq!(
            HasherKind::Blake2s.hash2(&a, &b),
            Blake2sHasher.hash2(&a, &b)
        );
        assert_eq!("blake2s".parse::<HasherKind>(), Ok(HasherKind::Blake2s));
        assert!("poseidon".parse::<HasherKind>().is_err());
    }
}
