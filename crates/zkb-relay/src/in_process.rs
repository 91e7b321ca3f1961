//! Relay endpoints backed by ledgers living in this process.

use async_trait::async_trait;
use zkb_core::base::{Address, Field};
use zkb_core::schema::events::EventPosition;
use zkb_ledger::{Custody, LedgerError, ProofVerifier, SharedLedger};
use zkb_tree::Hasher;

use crate::error::RelayError;
use crate::source::{CommitmentSink, DepositPage, EventSource, MirrorOutcome, ObservedDeposit};

/// A [`SharedLedger`] seen through the relay traits.
#[derive(Debug, Clone)]
pub struct InProcessLedger<H: Hasher, V, C> {
    ledger: SharedLedger<H, V, C>,
    relayer: Address,
}

impl<H: Hasher, V, C> InProcessLedger<H, V, C> {
    /// Wrap `ledger`, inserting commitments as `relayer`.
    #[must_use]
    pub const fn new(ledger: SharedLedger<H, V, C>, relayer: Address) -> Self {
        Self { ledger, relayer }
    }

    /// The wrapped ledger.
    #[must_use]
    pub const fn ledger(&self) -> &SharedLedger<H, V, C> {
        &self.ledger
    }
}

#[async_trait]
impl<H, V, C> EventSource for InProcessLedger<H, V, C>
where
    H: Hasher,
    V: ProofVerifier,
    C: Custody,
{
    async fn deposits_after(
        &self,
        cursor: Option<EventPosition>,
        limit: usize,
    ) -> Result<DepositPage, RelayError> {
        let records = self.ledger.events_after(cursor, limit)?;
        let scanned_through = records.last().map(|record| record.position);
        let deposits = records
            .iter()
            .filter_map(|record| {
                record.event.as_deposit().map(|deposit| ObservedDeposit {
                    position: record.position,
                    deposit: *deposit,
                })
            })
            .collect();
        Ok(DepositPage {
            deposits,
            scanned_through,
        })
    }
}

#[async_trait]
impl<H, V, C> CommitmentSink for InProcessLedger<H, V, C>
where
    H: Hasher,
    V: ProofVerifier,
    C: Custody,
{
    async fn mirror_commitment(&self, commitment: Field) -> Result<MirrorOutcome, RelayError> {
        match self.ledger.add_commitment(self.relayer, commitment) {
            Ok(leaf_index) => Ok(MirrorOutcome::Inserted { leaf_index }),
            Err(LedgerError::DuplicateCommitment(_)) => Ok(MirrorOutcome::AlreadyPresent),
            Err(error) => Err(error.into()),
        }
    }
}
