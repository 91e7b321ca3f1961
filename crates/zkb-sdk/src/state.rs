//! Ledger state files.
//!
//! A state file is the JSON encoding of a [`LedgerSnapshot`]. Saving writes a
//! sibling temporary file first and renames it over the target.
//!
//! Commands that load, change and save a state file hold a [`StateLock`] for
//! the whole sequence, so concurrent commands never save over each other.

use std::path::{Path, PathBuf};

use eyre::Context as _;
use sha2::{Digest as _, Sha256};
use tracing::debug;
use zkb_core::base::{ADDRESS_SIZE, Address};
use zkb_core::schema::ledger::{LedgerId, LedgerVariant};
use zkb_ledger::{DynLedger, LedgerParams, LedgerSnapshot, TransparentVerifier};
use zkb_tree::HasherKind;

const CUSTODY_ADDRESS_DOMAIN: &[u8] = b"zkb:custody:";

/// Exclusive advisory lock on a state file, released on drop.
///
/// The lock is taken on a `<file>.lock` sibling, since saving replaces the
/// state file itself. Only Unix targets lock; elsewhere the guard is inert.
#[derive(Debug)]
pub struct StateLock {
    _file: std::fs::File,
}

/// Wait until no other command holds the state file at `path`.
///
/// # Errors
/// Returns an error if the lock file cannot be opened or locked.
pub async fn lock_state(path: &Path) -> eyre::Result<StateLock> {
    let lock_path = sibling_path(path, "lock");
    let file = tokio::task::spawn_blocking(move || {
        acquire_lock(&lock_path)
            .with_context(|| format!("Failed to lock {}", lock_path.display()))
    })
    .await
    .context("Lock task failed")??;
    debug!(file = ?path, "State file locked");
    Ok(StateLock { _file: file })
}

fn open_lock_file(lock_path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
}

#[cfg(unix)]
#[allow(unsafe_code, reason = "flock(2) is only reachable through libc")]
fn acquire_lock(lock_path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::io::AsRawFd as _;

    let file = open_lock_file(lock_path)?;
    // SAFETY: the descriptor belongs to `file`, which is open for the whole
    // call. The lock is released when the guard closes it.
    let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(file)
}

#[cfg(not(unix))]
fn acquire_lock(lock_path: &Path) -> std::io::Result<std::fs::File> {
    open_lock_file(lock_path)
}

/// Custody account derived from a ledger name, used when none is given.
#[must_use]
pub fn custody_address(id: &LedgerId) -> Address {
    let digest = Sha256::new()
        .chain_update(CUSTODY_ADDRESS_DOMAIN)
        .chain_update(id.as_str())
        .finalize();
    let bytes = digest
        .first_chunk::<ADDRESS_SIZE>()
        .copied()
        .unwrap_or_default();
    Address::new(bytes)
}

/// Create an empty ledger.
///
/// # Errors
/// Returns an error if the tree parameters are invalid.
pub fn new_ledger(
    params: LedgerParams,
    variant: LedgerVariant,
    hasher: HasherKind,
) -> eyre::Result<DynLedger> {
    let verifier = TransparentVerifier::new(hasher, params.depth);
    DynLedger::new(params, hasher, verifier, variant).context("Failed to create ledger")
}

/// Rebuild a ledger from its snapshot, with the hasher and custody it records.
///
/// # Errors
/// Returns an error if the snapshot is inconsistent.
pub fn restore_ledger(snapshot: LedgerSnapshot) -> eyre::Result<DynLedger> {
    let hasher = snapshot.hasher;
    let variant = snapshot.variant;
    let verifier = TransparentVerifier::new(hasher, snapshot.params.depth);
    DynLedger::restore(snapshot, hasher, verifier, variant).context("Failed to restore ledger")
}

/// Load a ledger from a state file.
///
/// # Errors
/// Returns an error if the file cannot be read or does not hold a valid ledger.
pub async fn load_ledger(path: &Path) -> eyre::Result<DynLedger> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse ledger state {}", path.display()))?;
    let ledger = restore_ledger(snapshot)?;
    debug!(file = ?path, ledger = %ledger.id(), leaves = ledger.leaf_count(), "Ledger loaded");
    Ok(ledger)
}

/// Save a ledger to a state file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub async fn save_ledger(path: &Path, ledger: &DynLedger) -> eyre::Result<()> {
    save_snapshot(path, &ledger.snapshot()).await
}

/// Save a snapshot to a state file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub async fn save_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to encode ledger state")?;
    let tmp = sibling_path(path, "tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!(file = ?path, ledger = %snapshot.params.id, "Ledger saved");
    Ok(())
}

/// `path` with `.<suffix>` appended to its file name.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
