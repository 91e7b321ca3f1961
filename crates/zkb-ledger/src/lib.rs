//! Commitment ledgers for the ZKB bridge.
//!
//! A ledger accepts deposits (emitting events that the relay mirrors into the
//! peer ledger), inserts mirrored commitments into its tree, and releases value
//! against membership proofs while tracking spent nullifiers.

mod assets;
mod custody;
mod error;
mod ledger;
mod note;
mod shared;
mod snapshot;
mod verifier;

pub use assets::AssetBook;
pub use custody::{BurnMint, Custody, LockRelease};
pub use error::LedgerError;
pub use ledger::{CommitmentLedger, LedgerParams, WithdrawRequest};
pub use note::{
    COMMITMENT_DOMAIN, NULLIFIER_DOMAIN, Note, SECRET_SIZE, commitment_of, nullifier_of,
    secret_to_field,
};
pub use shared::SharedLedger;
pub use snapshot::{LedgerSnapshot, SnapshotError};
pub use verifier::{
    MembershipProof, ProofVerifier, ProveError, TransparentVerifier, WithdrawalWitness,
    prove_membership,
};

/// Ledger with runtime-selected hasher and custody, as loaded from state files.
pub type DynLedger = CommitmentLedger<
    zkb_tree::HasherKind,
    TransparentVerifier<zkb_tree::HasherKind>,
    zkb_core::schema::ledger::LedgerVariant,
>;

/// Shared handle to a [`DynLedger`].
pub type SharedDynLedger = SharedLedger<
    zkb_tree::HasherKind,
    TransparentVerifier<zkb_tree::HasherKind>,
    zkb_core::schema::ledger::LedgerVariant,
>;
