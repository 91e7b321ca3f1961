use thiserror::Error;

use crate::MAX_TREE_DEPTH;

/// Errors that can occur when building or querying a commitment tree.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    /// Every leaf slot is occupied.
    #[error("Tree is full: all {capacity} leaves are used")]
    TreeFull {
        /// Number of leaves the tree can hold.
        capacity: u64,
    },

    /// No leaf has been inserted at this index.
    #[error("No leaf at index {0}")]
    LeafNotFound(u64),

    /// Requested depth exceeds the supported maximum.
    #[error("Depth {0} exceeds maximum supported depth ({MAX_TREE_DEPTH})")]
    DepthTooLarge(u8),

    /// Root history must keep at least one root.
    #[error("Root history size must be greater than zero")]
    EmptyRootHistory,
}
