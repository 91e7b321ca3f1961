//! Relay commands over two ledger state files.
//!
//! Each sync cycle locks and loads both state files, then drains both
//! directions once. A mirrored commitment is written to the destination state
//! file before the relay checkpoint moves past its deposit. Other commands can
//! change the files between cycles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{Context as _, ensure};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use zkb_core::base::{Address, Field};
use zkb_core::schema::ledger::LedgerVariant;
use zkb_ledger::{DynLedger, SharedDynLedger, TransparentVerifier};
use zkb_relay::{
    CheckpointStore, CommitmentSink, InProcessLedger, LedgerEndpoint, MirrorOutcome, RelayConfig,
    RelayError, RelayerSync, SledCheckpointStore, SyncReport, ValidatedRelayConfig,
};
use zkb_tree::HasherKind;

use super::print_json;
use crate::common::RelaySyncOptions;
use crate::state::{StateLock, load_ledger, lock_state, save_snapshot};

type FileLedger = InProcessLedger<HasherKind, TransparentVerifier<HasherKind>, LedgerVariant>;

/// Account the relay inserts commitments into `ledger` as.
fn relayer_for(config: &ValidatedRelayConfig, ledger: &DynLedger) -> Address {
    let params = ledger.params();
    config
        .relayer
        .or(params.relayer)
        .unwrap_or(params.owner)
}

async fn save_shared(path: &Path, ledger: &SharedDynLedger) -> eyre::Result<()> {
    let snapshot = ledger.with(|ledger| ledger.snapshot())?;
    save_snapshot(path, &snapshot).await
}

/// Inserts into a loaded ledger and saves its state file before confirming.
struct StateFileSink {
    ledger: FileLedger,
    path: PathBuf,
}

#[async_trait]
impl CommitmentSink for StateFileSink {
    async fn mirror_commitment(&self, commitment: Field) -> Result<MirrorOutcome, RelayError> {
        // A retry after a failed save finds the commitment already present in
        // memory and saves again.
        let outcome = self.ledger.mirror_commitment(commitment).await?;
        save_shared(&self.path, self.ledger.ledger())
            .await
            .map_err(|e| RelayError::Transient(format!("{e:#}")))?;
        Ok(outcome)
    }
}

fn endpoint(config: &ValidatedRelayConfig, ledger: DynLedger, path: &Path) -> LedgerEndpoint {
    let id = ledger.id().clone();
    let relayer = relayer_for(config, &ledger);
    let ledger = InProcessLedger::new(SharedDynLedger::new(ledger), relayer);
    LedgerEndpoint {
        id,
        source: Arc::new(ledger.clone()),
        sink: Arc::new(StateFileSink {
            ledger,
            path: path.to_path_buf(),
        }),
    }
}

/// Lock both state files, in path order.
async fn lock_pair(a: &Path, b: &Path) -> eyre::Result<[StateLock; 2]> {
    let canonical_a = tokio::fs::canonicalize(a)
        .await
        .with_context(|| format!("Failed to resolve {}", a.display()))?;
    let canonical_b = tokio::fs::canonicalize(b)
        .await
        .with_context(|| format!("Failed to resolve {}", b.display()))?;
    ensure!(
        canonical_a != canonical_b,
        "Both relay sides use the state file {}",
        canonical_a.display()
    );
    let (first, second) = if canonical_a < canonical_b {
        (a, b)
    } else {
        (b, a)
    };
    Ok([lock_state(first).await?, lock_state(second).await?])
}

/// One sync cycle.
async fn sync_cycle(
    options: &RelaySyncOptions,
    config: &ValidatedRelayConfig,
    store: &Arc<dyn CheckpointStore>,
) -> eyre::Result<SyncReport> {
    let _locks = lock_pair(&options.state_a, &options.state_b).await?;
    let endpoint_a = endpoint(config, load_ledger(&options.state_a).await?, &options.state_a);
    let endpoint_b = endpoint(config, load_ledger(&options.state_b).await?, &options.state_b);
    let (sender, mut stranded) = mpsc::channel(config.operator_channel_capacity);
    let relay = RelayerSync::new(endpoint_a, endpoint_b, Arc::clone(store), config.clone())
        .with_operator_channel(sender);

    let result = relay.sync_once().await;
    drop(relay);
    while let Ok(deposit) = stranded.try_recv() {
        error!(
            route = %deposit.route,
            position = deposit.position,
            commitment = %deposit.commitment,
            reason = %deposit.reason,
            "Deposit stranded, operator action required"
        );
    }
    Ok(result?)
}

/// Mirror deposits between the ledgers in two state files.
///
/// With `once` set, drains both directions a single time and prints the
/// report. Otherwise repeats every poll interval until Ctrl-C.
///
/// # Errors
/// Returns an error if the settings are invalid, the checkpoint database
/// cannot be opened, or (with `once`) the cycle fails.
pub async fn relay_sync(options: &RelaySyncOptions) -> eyre::Result<()> {
    let config = RelayConfig::load(options.config.as_deref())?.validate()?;
    let store = SledCheckpointStore::open(&options.checkpoint_db)
        .await
        .with_context(|| {
            format!(
                "Failed to open checkpoint database {}",
                options.checkpoint_db.display()
            )
        })?;
    let store: Arc<dyn CheckpointStore> = Arc::new(store);

    if options.once {
        let report = sync_cycle(options, &config, &store).await?;
        info!(?report, "Sync complete");
        return print_json(&report);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        }
    });

    info!(poll_interval = ?config.poll_interval, "Relaying until Ctrl-C");
    while !cancel.is_cancelled() {
        match sync_cycle(options, &config, &store).await {
            Ok(report) if report.a_to_b.is_idle() && report.b_to_a.is_idle() => {}
            Ok(report) => info!(?report, "Sync cycle complete"),
            Err(e) => warn!(error = ?e, "Sync cycle failed"),
        }
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(config.poll_interval) => {}
        }
    }
    info!("Relay stopped");
    Ok(())
}

/// Print the checkpoint of every route in a checkpoint database.
///
/// # Errors
/// Returns an error if the database cannot be opened or read.
pub async fn relay_status(checkpoint_db: &Path) -> eyre::Result<()> {
    let store = SledCheckpointStore::open(checkpoint_db)
        .await
        .with_context(|| {
            format!(
                "Failed to open checkpoint database {}",
                checkpoint_db.display()
            )
        })?;
    let checkpoints = store.list().await?;
    print_json(&checkpoints)
}
