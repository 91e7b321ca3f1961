//! Withdrawal proof verification.
//!
//! Ledgers only see proofs as opaque bytes and hand them to a
//! [`ProofVerifier`]. A zero-knowledge verifier plugs in behind the same trait.
//! [`TransparentVerifier`] is a development stand-in: its proofs reveal the
//! secret and the leaf, so it must never guard real value.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zkb_core::base::Field;
use zkb_tree::{Direction, Hasher, IncrementalMerkleTree, MerklePath, TreeError};

use crate::note::{Note, commitment_of, nullifier_of};

/// Predicate deciding whether a withdrawal proof is valid for its public signals.
///
/// Withdrawal public signals are exactly `[root, nullifier]`.
pub trait ProofVerifier: Send + Sync + 'static {
    /// Returns `true` if `proof` attests to `public_signals`.
    fn verify(&self, proof: &[u8], public_signals: &[Field]) -> bool;
}

/// Transparent membership proof: the secret, its leaf index and its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// Note secret as a field element.
    pub secret: Field,
    /// Index of the note's commitment in the tree.
    pub leaf_index: u64,
    /// Path from the commitment to the root.
    pub path: MerklePath,
}

impl MembershipProof {
    /// Encode as the opaque proof bytes passed to `withdraw`.
    ///
    /// # Errors
    /// Returns an error if JSON encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from opaque proof bytes.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a JSON-encoded proof.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Errors that can occur when building a transparent proof.
#[derive(Error, Debug)]
pub enum ProveError {
    /// The tree has no usable path for this index.
    #[error("Failed to build membership path: {0}")]
    Tree(#[from] TreeError),

    /// The leaf at this index is not the note's commitment.
    #[error("Leaf {leaf_index} does not hold the note commitment {commitment}")]
    CommitmentMismatch {
        /// Requested leaf index.
        leaf_index: u64,
        /// Commitment derived from the note.
        commitment: Field,
    },
}

/// Proof and public signals for a withdrawal against a tree's current root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalWitness {
    /// Transparent membership proof.
    pub proof: MembershipProof,
    /// Root the proof was built against.
    pub root: Field,
    /// Nullifier revealed by the withdrawal.
    pub nullifier: Field,
}

impl WithdrawalWitness {
    /// Public signals in the order the verifier expects.
    #[must_use]
    pub const fn public_signals(&self) -> [Field; 2] {
        [self.root, self.nullifier]
    }
}

/// Build a transparent proof that `note` is the leaf at `leaf_index`.
///
/// When `leaf_index` is `None` the first leaf holding the note commitment is used.
///
/// # Errors
/// Returns an error if the leaf is missing or holds a different commitment.
pub fn prove_membership<H: Hasher>(
    note: &Note,
    tree: &IncrementalMerkleTree<H>,
    leaf_index: Option<u64>,
) -> Result<WithdrawalWitness, ProveError> {
    let hasher = tree.hasher();
    let commitment = note.commitment(hasher);
    let leaf_index = match leaf_index {
        Some(index) => index,
        None => tree
            .index_of(&commitment)
            .ok_or(ProveError::CommitmentMismatch {
                leaf_index: tree.leaf_count(),
                commitment,
            })?,
    };

    let leaf = tree
        .leaf(leaf_index)
        .ok_or(TreeError::LeafNotFound(leaf_index))?;
    if leaf != commitment {
        return Err(ProveError::CommitmentMismatch {
            leaf_index,
            commitment,
        });
    }

    Ok(WithdrawalWitness {
        proof: MembershipProof {
            secret: note.secret_field(),
            leaf_index,
            path: tree.proof(leaf_index)?,
        },
        root: tree.current_root(),
        nullifier: note.nullifier(hasher),
    })
}

/// Development verifier that recomputes the root and nullifier from a
/// revealed secret. Not zero-knowledge.
#[derive(Debug, Clone)]
pub struct TransparentVerifier<H> {
    hasher: H,
    depth: u8,
}

impl<H: Hasher> TransparentVerifier<H> {
    /// Verifier for trees of `depth` combined with `hasher`.
    #[must_use]
    pub const fn new(hasher: H, depth: u8) -> Self {
        Self { hasher, depth }
    }

    fn check(&self, proof: &MembershipProof, root: &Field, nullifier: &Field) -> bool {
        let path = &proof.path;
        if path.len() != usize::from(self.depth)
            || path.path_directions.len() != path.path_elements.len()
        {
            return false;
        }

        let directions_match_index = (0_u32..)
            .zip(&path.path_directions)
            .all(|(level, direction)| {
                proof
                    .leaf_index
                    .checked_shr(level)
                    .map_or(Direction::Left, Direction::of_index)
                    == *direction
            });
        if !directions_match_index {
            return false;
        }

        let commitment = commitment_of(&proof.secret, &self.hasher);
        path.compute_root(&commitment, &self.hasher) == *root
            && nullifier_of(&proof.secret, &self.hasher) == *nullifier
    }
}

impl<H: Hasher> ProofVerifier for TransparentVerifier<H> {
    fn verify(&self, proof: &[u8], public_signals: &[Field]) -> bool {
        let [root, nullifier] = public_signals else {
            return false;
        };
        MembershipProof::from_bytes(proof)
            .is_ok_and(|proof| self.check(&proof, root, nullifier))
    }
}

#[cfg(test)]
mod tests {
    use test_utils::field;
    use zkb_tree::Sha256Hasher;

    use super::*;

    const DEPTH: u8 = 4;

    fn tree_with(note: &Note) -> IncrementalMerkleTree<Sha256Hasher> {
        let mut tree = IncrementalMerkleTree::new(DEPTH, 8, Sha256Hasher).expect("valid tree");
        tree.insert(field!(1)).expect("room");
        tree.insert(note.commitment(&Sha256Hasher)).expect("room");
        tree.insert(field!(3)).expect("room");
        tree
    }

    #[test]
    fn valid_proof_verifies() {
        let note = Note::from_secret([9; 31]);
        let tree = tree_with(&note);
        let witness = prove_membership(&note, &tree, None).expect("note is in tree");
        assert_eq!(witness.proof.leaf_index, 1);

        let verifier = TransparentVerifier::new(Sha256Hasher, DEPTH);
        let bytes = witness.proof.to_bytes().expect("encode");
        assert!(verifier.verify(&bytes, &witness.public_signals()));
    }

    #[test]
    fn wrong_signals_are_rejected() {
        let note = Note::from_secret([9; 31]);
        let tree = tree_with(&note);
        let witness = prove_membership(&note, &tree, Some(1)).expect("note is in tree");
        let verifier = TransparentVerifier::new(Sha256Hasher, DEPTH);
        let bytes = witness.proof.to_bytes().expect("encode");

        assert!(!verifier.verify(&bytes, &[witness.nullifier, witness.root]));
        assert!(!verifier.verify(&bytes, &[witness.root]));
        assert!(!verifier.verify(&bytes, &[witness.root, field!(77)]));
        assert!(!verifier.verify(&bytes, &[field!(77), witness.nullifier]));
        assert!(!verifier.verify(b"not a proof", &witness.public_signals()));
    }

    #[test]
    fn tampered_index_is_rejected() {
        let note = Note::from_secret([9; 31]);
        let tree = tree_with(&note);
        let mut witness = prove_membership(&note, &tree, Some(1)).expect("note is in tree");
        witness.proof.leaf_index = 0;
        let verifier = TransparentVerifier::new(Sha256Hasher, DEPTH);
        let bytes = witness.proof.to_bytes().expect("encode");
        assert!(!verifier.verify(&bytes, &witness.public_signals()));
    }

    #[test]
    fn prove_rejects_foreign_leaf() {
        let note = Note::from_secret([9; 31]);
        let tree = tree_with(&note);
        assert!(matches!(
            prove_membership(&note, &tree, Some(0)),
            Err(ProveError::CommitmentMismatch { leaf_index: 0, .. })
        ));
        assert!(matches!(
            prove_membership(&note, &tree, Some(9)),
            Err(ProveError::Tree(TreeError::LeafNotFound(9)))
        ));

        let stranger = Note::from_secret([1; 31]);
        assert!(matches!(
            prove_membership(&stranger, &tree, None),
            Err(ProveError::CommitmentMismatch { .. })
        ));
    }
}
