//! Both relay directions between a pair of ledgers.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;
use zkb_core::schema::ledger::LedgerId;

use crate::checkpoint::{CheckpointStore, StrandedDeposit};
use crate::error::RelayError;
use crate::settings::ValidatedRelayConfig;
use crate::source::{CommitmentSink, EventSource};
use crate::watch::{PassReport, WatchLoop};

/// A ledger as the relay sees it.
#[derive(Clone)]
pub struct LedgerEndpoint {
    /// Deployment name, used in checkpoint keys.
    pub id: LedgerId,
    /// Where deposits are read.
    pub source: Arc<dyn EventSource>,
    /// Where peer commitments are inserted.
    pub sink: Arc<dyn CommitmentSink>,
}

impl LedgerEndpoint {
    /// Endpoint reading from and writing to the same object.
    pub fn new<L>(id: LedgerId, ledger: L) -> Self
    where
        L: EventSource + CommitmentSink + 'static,
    {
        let ledger = Arc::new(ledger);
        let source: Arc<dyn EventSource> = ledger.clone();
        Self {
            id,
            source,
            sink: ledger,
        }
    }
}

/// Checkpoint key of the route from `from` to `to`.
#[must_use]
pub fn route_key(from: &LedgerId, to: &LedgerId) -> String {
    format!("{from}->{to}")
}

/// Results of one pass in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Deposits on A mirrored into B.
    pub a_to_b: PassReport,
    /// Deposits on B mirrored into A.
    pub b_to_a: PassReport,
}

/// Keeps two ledgers' commitment sets in sync, one [`WatchLoop`] per direction.
#[derive(Debug, Clone)]
pub struct RelayerSync {
    a_to_b: WatchLoop,
    b_to_a: WatchLoop,
}

impl RelayerSync {
    /// Relay between `a` and `b`, saving progress in `store`.
    #[must_use]
    pub fn new(
        a: LedgerEndpoint,
        b: LedgerEndpoint,
        store: Arc<dyn CheckpointStore>,
        config: ValidatedRelayConfig,
    ) -> Self {
        let a_to_b = WatchLoop::new(
            route_key(&a.id, &b.id),
            Arc::clone(&a.source),
            Arc::clone(&b.sink),
            Arc::clone(&store),
            config.clone(),
        );
        let b_to_a = WatchLoop::new(route_key(&b.id, &a.id), b.source, a.sink, store, config);
        Self { a_to_b, b_to_a }
    }

    /// Publish stranded deposits of both directions on `sender`.
    #[must_use]
    pub fn with_operator_channel(self, sender: mpsc::Sender<StrandedDeposit>) -> Self {
        Self {
            a_to_b: self.a_to_b.with_operator_channel(sender.clone()),
            b_to_a: self.b_to_a.with_operator_channel(sender),
        }
    }

    /// Checkpoint keys of both directions.
    #[must_use]
    pub fn routes(&self) -> [&str; 2] {
        [self.a_to_b.route(), self.b_to_a.route()]
    }

    /// Drain both directions once.
    ///
    /// # Errors
    /// Returns the first error of either direction. Progress made by the other
    /// direction is kept in its checkpoint.
    pub async fn sync_once(&self) -> Result<SyncReport, RelayError> {
        let cancel = CancellationToken::new();
        let (a_to_b, b_to_a) = tokio::join!(self.a_to_b.pass(&cancel), self.b_to_a.pass(&cancel));
        Ok(SyncReport {
            a_to_b: a_to_b?,
            b_to_a: b_to_a?,
        })
    }

    /// Run both directions as separate tasks until `cancel` fires.
    ///
    /// # Errors
    /// Returns an error if a watch task panics.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RelayError> {
        let mut tasks = JoinSet::new();
        for watch in [self.a_to_b.clone(), self.b_to_a.clone()] {
            let cancel = cancel.clone();
            tasks.spawn(async move { watch.run(cancel).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.map_err(|e| RelayError::TaskJoin(e.to_string()))?;
        }
        info!("Relay stopped");
        Ok(())
    }
}
