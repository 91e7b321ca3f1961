//! Tree subcommands.

use std::path::PathBuf;

use zkb_tree::{DEFAULT_TREE_DEPTH, HasherKind};

use super::constants::{
    DEFAULT_HASHER, DEFAULT_LEAVES_FILE, ZKB_HASHER, ZKB_LEAVES_FILE, ZKB_LEAVES_OUT,
    ZKB_STATE_FILE, ZKB_TREE_DEPTH,
};

/// Tree command group.
#[derive(Debug, clap::Subcommand)]
pub enum TreeCommands {
    /// Write a ledger's commitments to a binary leaf file.
    Export {
        /// Ledger state file.
        #[arg(long, env = ZKB_STATE_FILE)]
        state: PathBuf,
        /// Output leaf file.
        #[arg(long, env = ZKB_LEAVES_OUT, default_value = DEFAULT_LEAVES_FILE)]
        out: PathBuf,
    },
    /// Recompute the root of a binary leaf file.
    Root {
        /// Leaf file.
        #[arg(long, env = ZKB_LEAVES_FILE, default_value = DEFAULT_LEAVES_FILE)]
        leaves: PathBuf,
        /// Tree depth.
        #[arg(
            long,
            env = ZKB_TREE_DEPTH,
            default_value_t = DEFAULT_TREE_DEPTH,
            value_parser = clap::value_parser!(u8).range(1..=32)
        )]
        depth: u8,
        /// Tree hasher (sha256 or blake2s).
        #[arg(long, env = ZKB_HASHER, default_value = DEFAULT_HASHER)]
        hasher: HasherKind,
    },
}
