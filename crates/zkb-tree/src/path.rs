//! Membership proofs for tree leaves.

use serde::{Deserialize, Serialize};
use zkb_core::base::Field;

use crate::hasher::Hasher;

/// Which child of its parent a node on the path is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    /// The node is the left child; its sibling is on the right.
    Left,
    /// The node is the right child; its sibling is on the left.
    Right,
}

impl Direction {
    /// Direction of the node at `index` within its level.
    #[must_use]
    pub const fn of_index(index: u64) -> Self {
        if index & 1 == 0 {
            Self::Left
        } else {
            Self::Right
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => 0,
            Direction::Right => 1,
        }
    }
}

/// Error returned for a direction other than `0` or `1`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid path direction {0}, expected 0 or 1")]
pub struct InvalidDirection(u8);

impl TryFrom<u8> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Left),
            1 => Ok(Self::Right),
            other => Err(InvalidDirection(other)),
        }
    }
}

/// Siblings and directions from a leaf up to (excluding) the root.
///
/// `path_elements[l]` is the sibling at level `l`; `path_directions[l]` tells
/// whether the running node is the left or right child at that level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling nodes, leaf level first.
    pub path_elements: Vec<Field>,
    /// Position of the running node at each level.
    pub path_directions: Vec<Direction>,
}

impl MerklePath {
    /// Number of levels in the path.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.path_elements.len()
    }

    /// Returns `true` for the path of a depth-0 tree.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.path_elements.is_empty()
    }

    /// Re-derive the root reached by hashing `leaf` along this path.
    ///
    /// Extra elements or directions beyond the shorter of the two lists are ignored.
    #[must_use]
    pub fn compute_root<H: Hasher>(&self, leaf: &Field, hasher: &H) -> Field {
        self.path_elements
            .iter()
            .zip(&self.path_directions)
            .fold(*leaf, |node, (sibling, direction)| match direction {
                Direction::Left => hasher.hash2(&node, sibling),
                Direction::Right => hasher.hash2(sibling, &node),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Sha256Hasher;

    #[test]
    fn direction_follows_index_parity() {
        assert_eq!(Direction::of_index(0), Direction::Left);
        assert_eq!(Direction::of_index(5), Direction::Right);
    }

    #[test]
    fn directions_serialize_as_bits() {
        let path = MerklePath {
            path_elements: vec![Field::from_u64(1), Field::from_u64(2)],
            path_directions: vec![Direction::Right, Direction::Left],
        };
        let json = serde_json::to_value(&path).expect("serialize");
        assert_eq!(json["path_directions"], serde_json::json!([1, 0]));

        let bad = serde_json::json!({
            "path_elements": [Field::from_u64(1).to_string()],
            "path_directions": [2],
        });
        assert!(serde_json::from_value::<MerklePath>(bad).is_err());
    }

    #[test]
    fn compute_root_orders_siblings_by_direction() {
        let leaf = Field::from_u64(7);
        let sibling = Field::from_u64(8);
        let left = MerklePath {
            path_elements: vec![sibling],
            path_directions: vec![Direction::Left],
        };
        let right = MerklePath {
            path_elements: vec![sibling],
            path_directions: vec![Direction::Right],
        };
        assert_eq!(
            left.compute_root(&leaf, &Sha256Hasher),
            Sha256Hasher.hash2(&leaf, &sibling)
        );
        assert_eq!(
            right.compute_root(&leaf, &Sha256Hasher),
            Sha256Hasher.hash2(&sibling, &leaf)
        );
    }
}
