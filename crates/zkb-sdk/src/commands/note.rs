//! Note creation and withdrawal proofs.

use std::path::Path;

use eyre::{Context as _, ensure};
use tracing::info;
use zeroize::Zeroizing;
use zkb_ledger::{Note, prove_membership};
use zkb_tree::HasherKind;

use super::print_json;
use super::sensitive_output::{WriteMode, write_sensitive_output};
use crate::common::{NoteFile, ProofFile};
use crate::state::load_ledger;

async fn read_note(path: &Path) -> eyre::Result<NoteFile> {
    let json = Zeroizing::new(
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
    );
    serde_json::from_str(&json).with_context(|| format!("Failed to parse note {}", path.display()))
}

/// Draw a new note, write it to `out` and print its commitment.
///
/// `hasher` must be the hasher of the ledger the note will be withdrawn from.
///
/// # Errors
/// Returns an error if `out` already exists or cannot be written.
pub async fn note_new(out: &Path, hasher: HasherKind) -> eyre::Result<()> {
    let note_file = NoteFile::new(&Note::random(), hasher);
    let json = Zeroizing::new(serde_json::to_string_pretty(&note_file)?);
    write_sensitive_output(out, &json, WriteMode::CreateNew).await?;

    info!(file = ?out, commitment = %note_file.commitment, "Note written");
    print_json(&serde_json::json!({
        "commitment": note_file.commitment,
        "nullifier": note_file.nullifier,
    }))
}

/// Build a withdrawal proof for `note` against the current root of the ledger
/// in `state`, and write it to `out`.
///
/// The proof reveals the note secret, so `out` is written with owner-only
/// permissions.
///
/// # Errors
/// Returns an error if the note was made for another hasher, its commitment is
/// not in the tree, or a file cannot be read or written.
pub async fn note_prove(
    note: &Path,
    state: &Path,
    out: &Path,
    leaf_index: Option<u64>,
) -> eyre::Result<()> {
    let note_file = read_note(note).await?;
    let ledger = load_ledger(state).await?;
    let hasher = *ledger.tree().hasher();
    ensure!(
        note_file.hasher == hasher,
        "Note uses hasher {}, but ledger {} uses {hasher}",
        note_file.hasher,
        ledger.id()
    );

    let witness = prove_membership(&note_file.note(), ledger.tree(), leaf_index)
        .context("Failed to build withdrawal proof")?;
    let leaf_index = witness.proof.leaf_index;
    let proof = ProofFile::new(ledger.id().clone(), witness);
    let json = Zeroizing::new(serde_json::to_string_pretty(&proof)?);
    write_sensitive_output(out, &json, WriteMode::Replace).await?;

    info!(
        file = ?out,
        ledger = %proof.ledger,
        leaf_index,
        root = %proof.root,
        nullifier = %proof.nullifier,
        "Withdrawal proof written"
    );
    Ok(())
}
