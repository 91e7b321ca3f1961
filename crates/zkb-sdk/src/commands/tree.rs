//! Export a ledger's leaves and recompute a root from a leaf file.

use std::path::Path;

use eyre::Context as _;
use serde::Serialize;
use tokio::io::{BufReader, BufWriter};
use tracing::info;
use zkb_core::base::Field;
use zkb_tree::{DenseMerkleTree, HasherKind, read_leaves, write_leaves};

use super::print_json;
use crate::state::load_ledger;

/// Write the commitments of the ledger in `state` to a binary leaf file.
///
/// # Errors
/// Returns an error if the state cannot be read or `out` cannot be written.
pub async fn tree_export(state: &Path, out: &Path) -> eyre::Result<()> {
    let ledger = load_ledger(state).await?;
    let leaves: Vec<Field> = ledger.tree().leaves().collect();
    let file = tokio::fs::File::create(out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;
    write_leaves(&leaves, BufWriter::new(file))
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!(file = ?out, count = leaves.len(), root = %ledger.current_root(), "Leaves exported");
    Ok(())
}

#[derive(Debug, Serialize)]
struct RootOutput {
    leaf_count: usize,
    root: Field,
}

/// Recompute the root of a binary leaf file over a full tree of `depth`.
///
/// # Errors
/// Returns an error if the file cannot be read or has too many leaves.
pub async fn tree_root(leaves: &Path, depth: u8, hasher: HasherKind) -> eyre::Result<()> {
    let file = tokio::fs::File::open(leaves)
        .await
        .with_context(|| format!("Failed to open {}", leaves.display()))?;
    let leaves = read_leaves(BufReader::new(file))
        .await
        .with_context(|| format!("Failed to read leaves from {}", leaves.display()))?;
    let tree = DenseMerkleTree::from_leaves(depth, &leaves, &hasher)?;
    print_json(&RootOutput {
        leaf_count: tree.leaf_count(),
        root: tree.root(),
    })
}
