//! One relay direction: observe deposits on a source ledger and mirror their
//! commitments into a destination ledger.
//!
//! Per deposit the loop records the commitment as in flight, forwards it, then
//! clears it and advances the cursor in a single checkpoint write. A crash
//! between forwarding and that write re-forwards the commitment on the next
//! pass, where the destination reports it as already present.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use zkb_core::base::Field;
use zkb_core::schema::events::EventPosition;

use crate::checkpoint::{CheckpointStore, RelayCheckpoint, StrandedDeposit};
use crate::error::RelayError;
use crate::retry::retry_with_backoff;
use crate::settings::ValidatedRelayConfig;
use crate::source::{CommitmentSink, EventSource, MirrorOutcome};

/// Counts of what one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Commitments newly inserted into the destination.
    pub inserted: u64,
    /// Commitments the destination already held.
    pub already_present: u64,
    /// Deposits without a commitment.
    pub skipped: u64,
    /// Deposits refused by the destination.
    pub stranded: u64,
}

impl PassReport {
    fn record(&mut self, outcome: MirrorOutcome) {
        match outcome {
            MirrorOutcome::Inserted { .. } => self.inserted = self.inserted.saturating_add(1),
            MirrorOutcome::AlreadyPresent => {
                self.already_present = self.already_present.saturating_add(1);
            }
        }
    }

    /// Whether the pass did nothing.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Watches one source ledger and forwards to one destination.
#[derive(Clone)]
pub struct WatchLoop {
    route: String,
    source: Arc<dyn EventSource>,
    sink: Arc<dyn CommitmentSink>,
    store: Arc<dyn CheckpointStore>,
    config: ValidatedRelayConfig,
    operator: Option<mpsc::Sender<StrandedDeposit>>,
}

impl std::fmt::Debug for WatchLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchLoop")
            .field("route", &self.route)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WatchLoop {
    /// Create a loop whose progress is saved under `route` in `store`.
    #[must_use]
    pub fn new(
        route: impl Into<String>,
        source: Arc<dyn EventSource>,
        sink: Arc<dyn CommitmentSink>,
        store: Arc<dyn CheckpointStore>,
        config: ValidatedRelayConfig,
    ) -> Self {
        Self {
            route: route.into(),
            source,
            sink,
            store,
            config,
            operator: None,
        }
    }

    /// Publish stranded deposits on `sender` as well as in the checkpoint.
    #[must_use]
    pub fn with_operator_channel(mut self, sender: mpsc::Sender<StrandedDeposit>) -> Self {
        self.operator = Some(sender);
        self
    }

    /// Checkpoint key of this loop.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Process every deposit currently after the cursor.
    ///
    /// Stops early without error when `cancel` fires between deposits.
    ///
    /// # Errors
    /// Returns a transient error once its retries are exhausted (the cursor
    /// stays on the failed deposit), or a checkpoint error.
    #[instrument(skip_all, fields(route = %self.route))]
    pub async fn pass(&self, cancel: &CancellationToken) -> Result<PassReport, RelayError> {
        let mut checkpoint = self.store.load(&self.route).await?;
        let mut report = PassReport::default();
        if !checkpoint.in_flight.is_empty() {
            warn!(
                count = checkpoint.in_flight.len(),
                "Resuming with unconfirmed commitments in flight"
            );
        }

        loop {
            let cursor = checkpoint.last_confirmed;
            let page = retry_with_backoff(&self.config, || {
                self.source.deposits_after(cursor, self.config.batch_size)
            })
            .await?;
            let Some(scanned_through) = page.scanned_through else {
                break;
            };

            for observed in page.deposits {
                if cancel.is_cancelled() {
                    info!("Cancelled between deposits");
                    return Ok(report);
                }
                match observed.deposit.commitment {
                    Some(commitment) => {
                        self.forward(&mut checkpoint, &mut report, observed.position, commitment)
                            .await?;
                    }
                    None => {
                        warn!(
                            position = observed.position,
                            nonce = observed.deposit.nonce,
                            "Deposit has no commitment, nothing to mirror"
                        );
                        report.skipped = report.skipped.saturating_add(1);
                    }
                }
                checkpoint.last_confirmed = Some(observed.position);
                self.store.save(&self.route, &checkpoint).await?;
            }

            if checkpoint.last_confirmed != Some(scanned_through) {
                checkpoint.last_confirmed = Some(scanned_through);
                self.store.save(&self.route, &checkpoint).await?;
            }
            debug!(scanned_through, "Page processed");
        }

        Ok(report)
    }

    /// Mirror one commitment. On success or permanent failure the commitment
    /// leaves the in-flight set; the caller persists that together with the
    /// cursor.
    async fn forward(
        &self,
        checkpoint: &mut RelayCheckpoint,
        report: &mut PassReport,
        position: EventPosition,
        commitment: Field,
    ) -> Result<(), RelayError> {
        checkpoint.in_flight.insert(commitment);
        self.store.save(&self.route, checkpoint).await?;

        match retry_with_backoff(&self.config, || self.sink.mirror_commitment(commitment)).await {
            Ok(outcome) => {
                match outcome {
                    MirrorOutcome::Inserted { leaf_index } => {
                        info!(position, %commitment, leaf_index, "Commitment mirrored");
                    }
                    MirrorOutcome::AlreadyPresent => {
                        info!(position, %commitment, "Commitment already mirrored");
                    }
                }
                report.record(outcome);
            }
            Err(error) if error.is_retryable() => {
                warn!(position, %commitment, %error, "Giving up on this pass, will retry");
                return Err(error);
            }
            Err(error) => {
                self.strand(checkpoint, position, commitment, &error);
                report.stranded = report.stranded.saturating_add(1);
            }
        }
        checkpoint.in_flight.remove(&commitment);
        Ok(())
    }

    fn strand(
        &self,
        checkpoint: &mut RelayCheckpoint,
        position: EventPosition,
        commitment: Field,
        error: &RelayError,
    ) {
        error!(position, %commitment, %error, "Deposit stranded, operator action required");
        let stranded = StrandedDeposit {
            route: self.route.clone(),
            position,
            commitment,
            reason: error.to_string(),
        };
        if let Some(operator) = &self.operator
            && let Err(send_error) = operator.try_send(stranded.clone())
        {
            warn!(%send_error, "Failed to notify operator channel");
        }
        checkpoint.stranded.push(stranded);
    }

    /// Poll until `cancel` fires.
    ///
    /// Errors end the current pass only; the next poll starts again from the
    /// last saved checkpoint.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(route = %self.route, "Watching for deposits");
        while !cancel.is_cancelled() {
            match self.pass(&cancel).await {
                Ok(report) if !report.is_idle() => {
                    info!(route = %self.route, ?report, "Pass complete");
                }
                Ok(_) => {}
                Err(error) => warn!(route = %self.route, %error, "Pass failed"),
            }
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
        info!(route = %self.route, "Stopped");
    }
}
