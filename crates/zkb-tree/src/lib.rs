//! Commitment tree shared by both ledgers of a bridge.

mod dense;
mod error;
mod hasher;
mod io;
mod path;
mod tree;

pub use dense::DenseMerkleTree;
pub use error::TreeError;
pub use hasher::{
    Blake2sHasher, Hasher, HasherKind, Sha256Hasher, UnknownHasher, ZERO_LEAF, zero_table,
};
pub use io::{read_leaves, write_leaves};
pub use path::{Direction, InvalidDirection, MerklePath};
pub use tree::IncrementalMerkleTree;

/// Deepest supported tree; capacity is `2^32` leaves.
pub const MAX_TREE_DEPTH: u8 = 32;

/// Depth used when none is configured.
pub const DEFAULT_TREE_DEPTH: u8 = 20;

/// Number of roots retained when none is configured.
pub const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;
