//! Application command implementations.
//!
//! This module contains the core logic for each CLI subcommand.

mod ledger;
mod note;
mod relay;
mod sensitive_output;
mod tree;

use std::path::Path;

use eyre::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use ledger::{
    LedgerStatus, ledger_add_commitment, ledger_approve, ledger_balance, ledger_deposit,
    ledger_init, ledger_is_spent, ledger_mint, ledger_status, ledger_whitelist, ledger_withdraw,
};
pub use note::{note_new, note_prove};
pub use relay::{relay_status, relay_sync};
pub use tree::{tree_export, tree_root};

/// Generates and prints the JSON schema of the relay settings file.
///
/// # Errors
/// Returns an error if serialization to JSON fails.
#[allow(clippy::print_stdout, reason = "Prints schema to stdout")]
pub fn relay_config_schema() -> eyre::Result<()> {
    let schema = zkb_relay::RelayConfig::json_schema();
    let schema_str = serde_json::to_string_pretty(&schema)?;
    println!("{schema_str}");
    Ok(())
}

#[allow(clippy::print_stdout, reason = "Prints command output to stdout")]
fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{json}");
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> eyre::Result<T> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {what} {}", path.display()))
}
