//! Dense Merkle tree recomputed level by level from a full leaf list.
//!
//! Slower and memory-hungrier than [`crate::IncrementalMerkleTree`], but built
//! from scratch in one pass, which makes it a reference for checking that
//! incremental insertion produces the same roots and paths.

#![allow(
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing,
    reason = "Level widths and offsets are computed from the leaf count"
)]

use zkb_core::base::Field;

use crate::MAX_TREE_DEPTH;
use crate::error::TreeError;
use crate::hasher::{Hasher, zero_table};
use crate::path::{Direction, MerklePath};

fn level_layout(leaf_count: usize, depth: u8) -> (Vec<usize>, Vec<usize>, usize) {
    let levels = usize::from(depth) + 1;
    let mut widths = Vec::with_capacity(levels);
    let mut offsets = Vec::with_capacity(levels);

    let mut width = leaf_count;
    let mut offset = 0_usize;

    for _ in 0..levels {
        widths.push(width);
        offsets.push(offset);
        offset = offset.saturating_add(width);
        width = width.div_ceil(2);
    }

    (widths, offsets, offset)
}

/// Merkle tree holding every populated node in a flat, level-ordered vector.
#[derive(Debug, Clone)]
pub struct DenseMerkleTree {
    depth: u8,
    leaf_count: usize,
    level_widths: Vec<usize>,
    level_offsets: Vec<usize>,
    zeros: Vec<Field>,
    nodes: Vec<Field>,
    root: Field,
}

impl DenseMerkleTree {
    /// Build the tree over `leaves`, padding with empty subtrees.
    ///
    /// # Errors
    /// Returns an error if `depth` is too large or the leaves exceed `2^depth`.
    pub fn from_leaves<H: Hasher>(
        depth: u8,
        leaves: &[Field],
        hasher: &H,
    ) -> Result<Self, TreeError> {
        if depth > MAX_TREE_DEPTH {
            return Err(TreeError::DepthTooLarge(depth));
        }
        let capacity = 1_u64 << depth;
        let leaf_count = leaves.len();
        if !u64::try_from(leaf_count).is_ok_and(|count| count <= capacity) {
            return Err(TreeError::TreeFull { capacity });
        }

        let zeros = zero_table(hasher, depth);
        let (level_widths, level_offsets, total_nodes) = level_layout(leaf_count, depth);

        let mut nodes = Vec::with_capacity(total_nodes);
        nodes.extend_from_slice(leaves);

        let mut current = leaves.to_vec();
        for level in 0..usize::from(depth) {
            let mut next = Vec::with_capacity(level_widths[level + 1]);
            let empty = zeros[level];
            for pair_start in (0..current.len()).step_by(2) {
                let left = current[pair_start];
                let right = current.get(pair_start + 1).copied().unwrap_or(empty);
                next.push(hasher.hash2(&left, &right));
            }
            nodes.extend_from_slice(&next);
            current = next;
        }

        let root = current
            .first()
            .copied()
            .unwrap_or(zeros[usize::from(depth)]);

        Ok(Self {
            depth,
            leaf_count,
            level_widths,
            level_offsets,
            zeros,
            nodes,
            root,
        })
    }

    /// Root of the tree.
    #[must_use]
    pub const fn root(&self) -> Field {
        self.root
    }

    /// Number of leaves.
    #[must_use]
    pub const fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Membership path of the leaf at `leaf_index`.
    ///
    /// # Errors
    /// Returns [`TreeError::LeafNotFound`] for an index past the last leaf.
    pub fn witness(&self, leaf_index: u64) -> Result<MerklePath, TreeError> {
        let mut index = usize::try_from(leaf_index)
            .ok()
            .filter(|index| *index < self.leaf_count)
            .ok_or(TreeError::LeafNotFound(leaf_index))?;

        let depth = usize::from(self.depth);
        let mut path_elements = Vec::with_capacity(depth);
        let mut path_directions = Vec::with_capacity(depth);
        for level in 0..depth {
            let sibling = index ^ 1;
            let sibling_node = if sibling < self.level_widths[level] {
                self.node_at(level, sibling)
            } else {
                self.zeros[level]
            };
            path_elements.push(sibling_node);
            path_directions.push(if index % 2 == 0 {
                Direction::Left
            } else {
                Direction::Right
            });
            index /= 2;
        }

        Ok(MerklePath {
            path_elements,
            path_directions,
        })
    }

    fn node_at(&self, level: usize, index: usize) -> Field {
        self.nodes[self.level_offsets[level] + index]
    }
}
