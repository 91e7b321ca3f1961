//! CLI-independent file formats and option types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize as _;
use zkb_core::base::Field;
use zkb_core::schema::ledger::LedgerId;
use zkb_ledger::{MembershipProof, Note, SECRET_SIZE, WithdrawalWitness};
use zkb_tree::HasherKind;

/// A depositor's note as stored on disk.
///
/// The secret is wiped from memory when the value is dropped.
#[derive(Clone, Serialize, Deserialize)]
pub struct NoteFile {
    /// Hasher the commitment and nullifier were derived with.
    pub hasher: HasherKind,
    /// Note secret.
    #[serde(with = "hex::serde")]
    pub secret: [u8; SECRET_SIZE],
    /// Commitment to deposit.
    pub commitment: Field,
    /// Nullifier revealed on withdrawal.
    pub nullifier: Field,
}

impl NoteFile {
    /// Describe `note` under `hasher`.
    #[must_use]
    pub fn new(note: &Note, hasher: HasherKind) -> Self {
        Self {
            hasher,
            secret: *note.expose_secret(),
            commitment: note.commitment(&hasher),
            nullifier: note.nullifier(&hasher),
        }
    }

    /// The note held by this file.
    #[must_use]
    pub fn note(&self) -> Note {
        Note::from_secret(self.secret)
    }
}

impl std::fmt::Debug for NoteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteFile")
            .field("hasher", &self.hasher)
            .field("commitment", &self.commitment)
            .finish_non_exhaustive()
    }
}

impl Drop for NoteFile {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// A withdrawal proof as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofFile {
    /// Ledger the proof was built against.
    pub ledger: LedgerId,
    /// Root the proof was built against.
    pub root: Field,
    /// Nullifier consumed by the withdrawal.
    pub nullifier: Field,
    /// Public signals, `[root, nullifier]`.
    pub public_signals: Vec<Field>,
    /// Transparent membership proof.
    pub proof: MembershipProof,
}

impl ProofFile {
    /// Wrap a witness built against `ledger`.
    #[must_use]
    pub fn new(ledger: LedgerId, witness: WithdrawalWitness) -> Self {
        Self {
            ledger,
            root: witness.root,
            nullifier: witness.nullifier,
            public_signals: witness.public_signals().to_vec(),
            proof: witness.proof,
        }
    }
}

/// Where a deposit takes its commitment from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommitmentSource {
    /// Deposit without a commitment.
    #[default]
    None,
    /// A commitment given directly.
    Value(Field),
    /// The commitment of a note file.
    Note(PathBuf),
}

/// Inputs of a relay run.
#[derive(Debug, Clone)]
pub struct RelaySyncOptions {
    /// State file of ledger A.
    pub state_a: PathBuf,
    /// State file of ledger B.
    pub state_b: PathBuf,
    /// Checkpoint database directory.
    pub checkpoint_db: PathBuf,
    /// Relay settings file.
    pub config: Option<PathBuf>,
    /// Drain both directions once and exit.
    pub once: bool,
}
