//! Thread-safe handle to a ledger.
//!
//! Each call holds the ledger lock for its whole duration, so the nullifier
//! check-then-set of a withdrawal and the leaf index assignment of an insert
//! cannot interleave with other calls.

use std::sync::{Arc, Mutex};

use zkb_core::base::{Address, Field};
use zkb_core::schema::events::{EventPosition, EventRecord};
use zkb_tree::Hasher;

use crate::custody::Custody;
use crate::error::LedgerError;
use crate::ledger::{CommitmentLedger, WithdrawRequest};
use crate::verifier::ProofVerifier;

/// Cloneable, shared handle to a [`CommitmentLedger`].
#[derive(Debug)]
pub struct SharedLedger<H: Hasher, V, C> {
    inner: Arc<Mutex<CommitmentLedger<H, V, C>>>,
}

impl<H: Hasher, V, C> Clone for SharedLedger<H, V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H, V, C> SharedLedger<H, V, C>
where
    H: Hasher,
    V: ProofVerifier,
    C: Custody,
{
    /// Wrap a ledger.
    #[must_use]
    pub fn new(ledger: CommitmentLedger<H, V, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Run `f` with exclusive access to the ledger.
    ///
    /// # Errors
    /// Returns [`LedgerError::LedgerPoisoned`] if a previous holder panicked.
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut CommitmentLedger<H, V, C>) -> R,
    ) -> Result<R, LedgerError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| LedgerError::LedgerPoisoned)?;
        Ok(f(&mut guard))
    }

    /// See [`CommitmentLedger::deposit`].
    ///
    /// # Errors
    /// Propagates the ledger error.
    pub fn deposit(
        &self,
        commitment: Option<Field>,
        asset: Address,
        amount: u128,
        caller: Address,
    ) -> Result<u64, LedgerError> {
        self.with(|ledger| ledger.deposit(commitment, asset, amount, caller))?
    }

    /// See [`CommitmentLedger::add_commitment`].
    ///
    /// # Errors
    /// Propagates the ledger error.
    pub fn add_commitment(&self, caller: Address, commitment: Field) -> Result<u64, LedgerError> {
        self.with(|ledger| ledger.add_commitment(caller, commitment))?
    }

    /// See [`CommitmentLedger::withdraw`].
    ///
    /// # Errors
    /// Propagates the ledger error.
    pub fn withdraw(&self, request: &WithdrawRequest) -> Result<(), LedgerError> {
        self.with(|ledger| ledger.withdraw(request))?
    }

    /// See [`CommitmentLedger::is_spent`].
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn is_spent(&self, nullifier: &Field) -> Result<bool, LedgerError> {
        self.with(|ledger| ledger.is_spent(nullifier))
    }

    /// See [`CommitmentLedger::current_root`].
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn current_root(&self) -> Result<Field, LedgerError> {
        self.with(|ledger| ledger.current_root())
    }

    /// See [`CommitmentLedger::events_after`].
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn events_after(
        &self,
        cursor: Option<EventPosition>,
        limit: usize,
    ) -> Result<Vec<EventRecord>, LedgerError> {
        self.with(|ledger| ledger.events_after(cursor, limit))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use test_utils::field;
    use zkb_core::schema::ledger::LedgerId;
    use zkb_tree::Sha256Hasher;

    use super::*;
    use crate::custody::BurnMint;
    use crate::ledger::LedgerParams;
    use crate::note::Note;
    use crate::verifier::{TransparentVerifier, prove_membership};

    const OWNER: Address = Address::from_tag(1);
    const ASSET: Address = Address::from_tag(0xa0);
    const DEPTH: u8 = 8;

    fn shared() -> SharedLedger<Sha256Hasher, TransparentVerifier<Sha256Hasher>, BurnMint> {
        let params = LedgerParams {
            depth: DEPTH,
            ..LedgerParams::new(LedgerId::from("shared"), OWNER, Address::from_tag(0xee))
        };
        let mut ledger = CommitmentLedger::new(
            params,
            Sha256Hasher,
            TransparentVerifier::new(Sha256Hasher, DEPTH),
            BurnMint,
        )
        .expect("valid params");
        ledger.whitelist_asset(OWNER, ASSET).expect("owner");
        SharedLedger::new(ledger)
    }

    #[test]
    fn racing_withdrawals_spend_nullifier_once() {
        let ledger = shared();
        let note = Note::from_secret([3; 31]);
        ledger
            .add_commitment(OWNER, note.commitment(&Sha256Hasher))
            .expect("insert");
        let witness = ledger
            .with(|l| prove_membership(&note, l.tree(), None))
            .expect("lock")
            .expect("note in tree");
        let request = WithdrawRequest {
            proof: witness.proof.to_bytes().expect("encode"),
            public_signals: witness.public_signals().to_vec(),
            root: witness.root,
            nullifier: witness.nullifier,
            asset: ASSET,
            amount: 10,
            recipient: Address::from_tag(0x0b),
        };

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let ledger = ledger.clone();
                let barrier = Arc::clone(&barrier);
                let request = request.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    ledger.withdraw(&request)
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread finished"))
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().all(|r| matches!(
            r,
            Ok(()) | Err(LedgerError::NullifierAlreadySpent(_))
        )));
        assert!(ledger.is_spent(&request.nullifier).expect("lock"));
        assert_eq!(
            ledger
                .with(|l| l.balance_of(&ASSET, &Address::from_tag(0x0b)))
                .expect("lock"),
            10
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_get_distinct_indices() {
        let ledger = shared();
        let tasks: Vec<_> = (1..=32_u8)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.add_commitment(OWNER, field!(i)) })
            })
            .collect();

        let mut indices = Vec::new();
        for task in tasks {
            indices.push(task.await.expect("task finished").expect("insert"));
        }
        indices.sort_unstable();
        assert_eq!(indices, (0..32).collect::<Vec<u64>>());
        assert_eq!(ledger.with(|l| l.leaf_count()).expect("lock"), 32);
    }
}
