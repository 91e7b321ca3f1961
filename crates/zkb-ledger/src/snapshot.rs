//! Serializable ledger state.
//!
//! The tree is stored as its leaf sequence. Restoring re-inserts the leaves in
//! order, which reproduces the same roots and the same root history.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zkb_core::base::Field;
use zkb_core::schema::events::LedgerEvent;
use zkb_core::schema::ledger::LedgerVariant;
use zkb_tree::{Hasher, HasherKind, IncrementalMerkleTree, TreeError};

use crate::assets::AssetBook;
use crate::custody::Custody;
use crate::ledger::{CommitmentLedger, LedgerParams};
use crate::verifier::ProofVerifier;

/// Errors that can occur when restoring a ledger from a snapshot.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot was taken with a different hasher.
    #[error("Snapshot uses hasher {snapshot}, but {provided} was provided")]
    HasherMismatch {
        /// Hasher recorded in the snapshot.
        snapshot: HasherKind,
        /// Hasher passed to `restore`.
        provided: HasherKind,
    },

    /// The snapshot was taken with a different custody variant.
    #[error("Snapshot uses custody {snapshot}, but {provided} was provided")]
    VariantMismatch {
        /// Variant recorded in the snapshot.
        snapshot: LedgerVariant,
        /// Variant passed to `restore`.
        provided: LedgerVariant,
    },

    /// A commitment appears twice in the leaf list.
    #[error("Commitment {0} appears more than once")]
    DuplicateLeaf(Field),

    /// The leaves do not fit the recorded tree parameters.
    #[error("Failed to rebuild tree: {0}")]
    Tree(#[from] TreeError),
}

/// Complete ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Deployment parameters.
    pub params: LedgerParams,
    /// Hasher combining tree nodes.
    pub hasher: HasherKind,
    /// Custody variant.
    pub variant: LedgerVariant,
    /// Tree leaves in insertion order.
    pub leaves: Vec<Field>,
    /// Spent nullifiers.
    pub nullifiers: BTreeSet<Field>,
    /// Balances, allowances and whitelist.
    pub assets: AssetBook,
    /// Deposit counter.
    pub nonce: u64,
    /// Event log.
    pub events: Vec<LedgerEvent>,
}

impl<H, V, C> CommitmentLedger<H, V, C>
where
    H: Hasher + Copy + Into<HasherKind>,
    V: ProofVerifier,
    C: Custody,
{
    /// Capture the full ledger state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            params: self.params.clone(),
            hasher: (*self.tree.hasher()).into(),
            variant: self.custody.variant(),
            leaves: self.tree.leaves().collect(),
            nullifiers: self.nullifiers.clone(),
            assets: self.assets.clone(),
            nonce: self.nonce,
            events: self.events.clone(),
        }
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// # Errors
    /// Returns an error if `hasher` or `custody` differ from the snapshot, or
    /// the leaves cannot be re-inserted.
    pub fn restore(
        snapshot: LedgerSnapshot,
        hasher: H,
        verifier: V,
        custody: C,
    ) -> Result<Self, SnapshotError> {
        let provided = hasher.into();
        if snapshot.hasher != provided {
            return Err(SnapshotError::HasherMismatch {
                snapshot: snapshot.hasher,
                provided,
            });
        }
        let provided = custody.variant();
        if snapshot.variant != provided {
            return Err(SnapshotError::VariantMismatch {
                snapshot: snapshot.variant,
                provided,
            });
        }

        let mut commitments = HashSet::with_capacity(snapshot.leaves.len());
        for leaf in &snapshot.leaves {
            if !commitments.insert(*leaf) {
                return Err(SnapshotError::DuplicateLeaf(*leaf));
            }
        }
        let tree = IncrementalMerkleTree::from_leaves(
            snapshot.params.depth,
            snapshot.params.root_history_size,
            hasher,
            snapshot.leaves,
        )?;

        Ok(Self {
            params: snapshot.params,
            tree,
            commitments,
            nullifiers: snapshot.nullifiers,
            assets: snapshot.assets,
            nonce: snapshot.nonce,
            events: snapshot.events,
            verifier,
            custody,
        })
    }
}
