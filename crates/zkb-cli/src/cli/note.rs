//! Note subcommands.

use std::path::PathBuf;

use zkb_tree::HasherKind;

use super::constants::{
    DEFAULT_HASHER, DEFAULT_NOTE_FILE, DEFAULT_PROOF_FILE, ZKB_HASHER, ZKB_LEAF_INDEX,
    ZKB_NOTE_FILE, ZKB_NOTE_OUT, ZKB_PROOF_OUT, ZKB_STATE_FILE,
};

/// Note command group.
#[derive(Debug, clap::Subcommand)]
pub enum NoteCommands {
    /// Draw a new note secret and print its commitment.
    New {
        /// Output file for the note (written with owner-only permissions).
        #[arg(long, env = ZKB_NOTE_OUT, default_value = DEFAULT_NOTE_FILE)]
        out: PathBuf,
        /// Hasher of the ledger the note will be withdrawn from.
        #[arg(long, env = ZKB_HASHER, default_value = DEFAULT_HASHER)]
        hasher: HasherKind,
    },
    /// Build a withdrawal proof against a ledger's current root.
    Prove {
        /// Note file written by `zkb note new`.
        #[arg(long, env = ZKB_NOTE_FILE, default_value = DEFAULT_NOTE_FILE)]
        note: PathBuf,
        /// State file of the ledger to withdraw from.
        #[arg(long, env = ZKB_STATE_FILE)]
        state: PathBuf,
        /// Output file for the proof (written with owner-only permissions).
        #[arg(long, env = ZKB_PROOF_OUT, default_value = DEFAULT_PROOF_FILE)]
        out: PathBuf,
        /// Leaf holding the note commitment. Looked up if omitted.
        #[arg(long, env = ZKB_LEAF_INDEX)]
        leaf_index: Option<u64>,
    },
}
