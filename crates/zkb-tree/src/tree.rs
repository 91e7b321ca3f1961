//! Append-only sparse Merkle tree with a bounded root history.

#![allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    reason = "Levels are bounded by the tree depth and indices by the tree capacity"
)]

use std::collections::HashMap;

use zkb_core::base::Field;

use crate::error::TreeError;
use crate::hasher::{Hasher, zero_table};
use crate::path::{Direction, MerklePath};
use crate::{DEFAULT_ROOT_HISTORY_SIZE, DEFAULT_TREE_DEPTH, MAX_TREE_DEPTH};

/// Fixed-depth, append-only binary Merkle tree.
///
/// Only populated nodes are stored. A node missing from the map is the root of
/// an empty subtree at its level. Every insertion records the new root in a
/// circular history of the last `root_history_size` roots.
#[derive(Debug, Clone)]
pub struct IncrementalMerkleTree<H: Hasher> {
    depth: u8,
    hasher: H,
    zeros: Vec<Field>,
    nodes: HashMap<(u8, u64), Field>,
    leaf_count: u64,
    leaf_indices: HashMap<Field, u64>,
    roots: Vec<Field>,
    current_root_index: usize,
}

impl<H: Hasher> IncrementalMerkleTree<H> {
    /// Create an empty tree.
    ///
    /// The history starts with the empty-tree root in its first slot; the
    /// remaining slots are zero and never match [`Self::is_known_root`].
    ///
    /// # Errors
    /// Returns an error if `depth` exceeds [`MAX_TREE_DEPTH`] or the history size is zero.
    pub fn new(depth: u8, root_history_size: usize, hasher: H) -> Result<Self, TreeError> {
        if depth > MAX_TREE_DEPTH {
            return Err(TreeError::DepthTooLarge(depth));
        }
        if root_history_size == 0 {
            return Err(TreeError::EmptyRootHistory);
        }

        let zeros = zero_table(&hasher, depth);
        let mut roots = vec![Field::ZERO; root_history_size];
        roots[0] = zeros[usize::from(depth)];

        Ok(Self {
            depth,
            hasher,
            zeros,
            nodes: HashMap::new(),
            leaf_count: 0,
            leaf_indices: HashMap::new(),
            roots,
            current_root_index: 0,
        })
    }

    /// Create an empty tree with the default depth and history size.
    ///
    /// # Errors
    /// Never fails for the default parameters; the result mirrors [`Self::new`].
    pub fn with_defaults(hasher: H) -> Result<Self, TreeError> {
        Self::new(DEFAULT_TREE_DEPTH, DEFAULT_ROOT_HISTORY_SIZE, hasher)
    }

    /// Rebuild a tree by inserting `leaves` in order.
    ///
    /// The resulting roots and root history are identical to those of the tree
    /// that originally received the same leaves.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid or the leaves do not fit.
    pub fn from_leaves(
        depth: u8,
        root_history_size: usize,
        hasher: H,
        leaves: impl IntoIterator<Item = Field>,
    ) -> Result<Self, TreeError> {
        let mut tree = Self::new(depth, root_history_size, hasher)?;
        for leaf in leaves {
            tree.insert(leaf)?;
        }
        Ok(tree)
    }

    /// Tree depth.
    #[must_use]
    pub const fn depth(&self) -> u8 {
        self.depth
    }

    /// Number of inserted leaves.
    #[must_use]
    pub const fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    /// Maximum number of leaves, `2^depth`.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        1_u64 << self.depth
    }

    /// Number of roots retained in the history.
    #[must_use]
    pub const fn root_history_size(&self) -> usize {
        self.roots.len()
    }

    /// The hasher combining nodes of this tree.
    #[must_use]
    pub const fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Append a leaf and return its index.
    ///
    /// # Errors
    /// Returns [`TreeError::TreeFull`] once `2^depth` leaves have been inserted.
    pub fn insert(&mut self, leaf: Field) -> Result<u64, TreeError> {
        let capacity = self.capacity();
        if self.leaf_count >= capacity {
            return Err(TreeError::TreeFull { capacity });
        }

        let leaf_index = self.leaf_count;
        let mut index = leaf_index;
        let mut node = leaf;
        self.nodes.insert((0, index), node);

        for level in 0..self.depth {
            let sibling = self.node(level, index ^ 1);
            node = match Direction::of_index(index) {
                Direction::Left => self.hasher.hash2(&node, &sibling),
                Direction::Right => self.hasher.hash2(&sibling, &node),
            };
            index /= 2;
            self.nodes.insert((level + 1, index), node);
        }

        self.leaf_count += 1;
        self.leaf_indices.entry(leaf).or_insert(leaf_index);
        self.push_root(node);
        Ok(leaf_index)
    }

    /// Membership path of the leaf at `leaf_index` against the current root.
    ///
    /// # Errors
    /// Returns [`TreeError::LeafNotFound`] if no leaf was inserted at that index.
    pub fn proof(&self, leaf_index: u64) -> Result<MerklePath, TreeError> {
        if leaf_index >= self.leaf_count {
            return Err(TreeError::LeafNotFound(leaf_index));
        }

        let depth = usize::from(self.depth);
        let mut path_elements = Vec::with_capacity(depth);
        let mut path_directions = Vec::with_capacity(depth);
        let mut index = leaf_index;
        for level in 0..self.depth {
            path_elements.push(self.node(level, index ^ 1));
            path_directions.push(Direction::of_index(index));
            index /= 2;
        }

        Ok(MerklePath {
            path_elements,
            path_directions,
        })
    }

    /// Root over all leaves inserted so far.
    #[must_use]
    pub fn current_root(&self) -> Field {
        self.roots[self.current_root_index]
    }

    /// Whether `root` is one of the retained roots.
    ///
    /// The zero element is never known, so unpopulated history slots never match.
    #[must_use]
    pub fn is_known_root(&self, root: &Field) -> bool {
        !root.is_zero() && self.roots.contains(root)
    }

    /// Retained roots, newest first.
    #[must_use]
    pub fn root_history(&self) -> Vec<Field> {
        let len = self.roots.len();
        (0..len)
            .map(|offset| self.roots[(self.current_root_index + len - offset) % len])
            .filter(|root| !root.is_zero())
            .collect()
    }

    /// Leaf at `index`, if inserted.
    #[must_use]
    pub fn leaf(&self, index: u64) -> Option<Field> {
        if index < self.leaf_count {
            self.nodes.get(&(0, index)).copied()
        } else {
            None
        }
    }

    /// Index of the first occurrence of `leaf`.
    #[must_use]
    pub fn index_of(&self, leaf: &Field) -> Option<u64> {
        self.leaf_indices.get(leaf).copied()
    }

    /// Inserted leaves in insertion order.
    pub fn leaves(&self) -> impl Iterator<Item = Field> + '_ {
        (0..self.leaf_count).filter_map(|index| self.nodes.get(&(0, index)).copied())
    }

    fn node(&self, level: u8, index: u64) -> Field {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zeros[usize::from(level)])
    }

    fn push_root(&mut self, root: Field) {
        self.current_root_index = (self.current_root_index + 1) % self.roots.len();
        self.roots[self.current_root_index] = root;
    }
}
