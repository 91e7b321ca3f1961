//! Boundaries between the relay and the ledgers it connects.

use async_trait::async_trait;
use zkb_core::base::Field;
use zkb_core::schema::events::{DepositEvent, EventPosition};

use crate::error::RelayError;

/// A deposit event and its position in the source log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedDeposit {
    /// Position of the event.
    pub position: EventPosition,
    /// The deposit.
    pub deposit: DepositEvent,
}

/// One page of a ledger's event log, reduced to deposits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositPage {
    /// Deposits on the page, in log order.
    pub deposits: Vec<ObservedDeposit>,
    /// Position of the last event read, deposit or not. `None` when the log
    /// has nothing after the cursor.
    pub scanned_through: Option<EventPosition>,
}

/// Result of mirroring a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// The commitment was inserted at `leaf_index`.
    Inserted {
        /// Assigned leaf index.
        leaf_index: u64,
    },
    /// The destination already held the commitment.
    AlreadyPresent,
}

/// Read access to a ledger's deposit events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Up to `limit` events strictly after `cursor`, with their deposits.
    async fn deposits_after(
        &self,
        cursor: Option<EventPosition>,
        limit: usize,
    ) -> Result<DepositPage, RelayError>;
}

/// Write access to a ledger's commitment tree.
#[async_trait]
pub trait CommitmentSink: Send + Sync {
    /// Insert `commitment`, returning once the insert is committed.
    ///
    /// A commitment that is already present must yield
    /// [`MirrorOutcome::AlreadyPresent`] rather than an error.
    async fn mirror_commitment(&self, commitment: Field) -> Result<MirrorOutcome, RelayError>;
}
