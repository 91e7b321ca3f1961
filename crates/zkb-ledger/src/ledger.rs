//! The commitment ledger: deposits, mirrored commitments and proof-gated withdrawals.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use zkb_core::base::{Address, Field};
use zkb_core::schema::events::{
    CommitmentAdded, DepositEvent, EventPosition, EventRecord, LedgerEvent, WithdrawalEvent,
};
use zkb_core::schema::ledger::{LedgerId, LedgerVariant};
use zkb_tree::{DEFAULT_ROOT_HISTORY_SIZE, DEFAULT_TREE_DEPTH, Hasher, IncrementalMerkleTree};

use crate::assets::AssetBook;
use crate::custody::Custody;
use crate::error::LedgerError;
use crate::verifier::ProofVerifier;

/// Static parameters of a ledger deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Deployment name.
    pub id: LedgerId,
    /// Account allowed to whitelist assets.
    pub owner: Address,
    /// Account holding locked value.
    pub address: Address,
    /// Only account allowed to add commitments, if set.
    pub relayer: Option<Address>,
    /// Commitment tree depth.
    pub depth: u8,
    /// Number of roots accepted for withdrawals.
    pub root_history_size: usize,
}

impl LedgerParams {
    /// Parameters with the default tree depth and history size and no relayer restriction.
    #[must_use]
    pub const fn new(id: LedgerId, owner: Address, address: Address) -> Self {
        Self {
            id,
            owner,
            address,
            relayer: None,
            depth: DEFAULT_TREE_DEPTH,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
        }
    }
}

/// Arguments of a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequest {
    /// Opaque proof bytes for the verifier.
    pub proof: Vec<u8>,
    /// Public signals the proof attests to; must be `[root, nullifier]`.
    pub public_signals: Vec<Field>,
    /// Root the proof was built against.
    pub root: Field,
    /// Nullifier consumed by this withdrawal.
    pub nullifier: Field,
    /// Asset to release.
    pub asset: Address,
    /// Amount to release.
    pub amount: u128,
    /// Account credited with the amount.
    pub recipient: Address,
}

/// One side of the bridge.
///
/// Owns its commitment tree, the set of registered commitments, the set of
/// spent nullifiers and the asset book. Every method either applies fully or
/// returns an error without changing state.
#[derive(Debug)]
pub struct CommitmentLedger<H: Hasher, V, C> {
    pub(crate) params: LedgerParams,
    pub(crate) tree: IncrementalMerkleTree<H>,
    pub(crate) commitments: HashSet<Field>,
    pub(crate) nullifiers: BTreeSet<Field>,
    pub(crate) assets: AssetBook,
    pub(crate) nonce: u64,
    pub(crate) events: Vec<LedgerEvent>,
    pub(crate) verifier: V,
    pub(crate) custody: C,
}

impl<H, V, C> CommitmentLedger<H, V, C>
where
    H: Hasher,
    V: ProofVerifier,
    C: Custody,
{
    /// Create an empty ledger.
    ///
    /// # Errors
    /// Returns [`LedgerError::InvalidTree`] for an invalid depth or history size.
    pub fn new(
        params: LedgerParams,
        hasher: H,
        verifier: V,
        custody: C,
    ) -> Result<Self, LedgerError> {
        let tree = IncrementalMerkleTree::new(params.depth, params.root_history_size, hasher)?;
        Ok(Self {
            params,
            tree,
            commitments: HashSet::new(),
            nullifiers: BTreeSet::new(),
            assets: AssetBook::default(),
            nonce: 0,
            events: Vec::new(),
            verifier,
            custody,
        })
    }

    /// Ledger parameters.
    #[must_use]
    pub const fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Deployment name.
    #[must_use]
    pub const fn id(&self) -> &LedgerId {
        &self.params.id
    }

    /// Custody variant.
    #[must_use]
    pub fn variant(&self) -> LedgerVariant {
        self.custody.variant()
    }

    /// The commitment tree.
    #[must_use]
    pub const fn tree(&self) -> &IncrementalMerkleTree<H> {
        &self.tree
    }

    /// Whitelist `asset`. Only the owner may call this.
    ///
    /// # Errors
    /// Returns [`LedgerError::Unauthorized`] for any caller but the owner.
    #[instrument(skip_all, fields(ledger = %self.params.id, %asset))]
    pub fn whitelist_asset(&mut self, caller: Address, asset: Address) -> Result<(), LedgerError> {
        if caller != self.params.owner {
            return Err(LedgerError::Unauthorized {
                caller,
                action: "whitelist assets",
            });
        }
        self.assets.whitelist(asset);
        info!("Asset whitelisted");
        Ok(())
    }

    /// Whether `asset` is whitelisted.
    #[must_use]
    pub fn is_whitelisted(&self, asset: &Address) -> bool {
        self.assets.is_whitelisted(asset)
    }

    /// Lock or burn `amount` of `asset` from `caller` and emit a deposit event.
    ///
    /// The commitment is not inserted into this ledger's tree; the relay mirrors
    /// it into the peer ledger. Returns the new deposit nonce.
    ///
    /// # Errors
    /// Returns an error if the asset is not whitelisted, the amount is zero,
    /// `caller` is the custody account, or custody cannot take the amount from
    /// `caller`.
    #[instrument(skip_all, fields(ledger = %self.params.id, %asset, %amount, %caller))]
    pub fn deposit(
        &mut self,
        commitment: Option<Field>,
        asset: Address,
        amount: u128,
        caller: Address,
    ) -> Result<u64, LedgerError> {
        if !self.assets.is_whitelisted(&asset) {
            return Err(LedgerError::AssetNotWhitelisted(asset));
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if caller == self.params.address {
            return Err(LedgerError::Unauthorized {
                caller,
                action: "deposit from the custody account",
            });
        }
        let nonce = self.nonce.saturating_add(1);

        self.custody
            .take(&mut self.assets, asset, caller, self.params.address, amount)?;
        self.nonce = nonce;
        self.events.push(LedgerEvent::Deposit(DepositEvent {
            commitment,
            asset,
            amount,
            nonce,
        }));

        match commitment {
            Some(commitment) => info!(%commitment, nonce, "Deposit accepted"),
            None => warn!(
                nonce,
                "Deposit accepted without a commitment; it will not be mirrored"
            ),
        }
        Ok(nonce)
    }

    /// Insert a commitment mirrored from the peer ledger and return its leaf index.
    ///
    /// # Errors
    /// Returns an error if `caller` is not the configured relayer, the
    /// commitment is already registered, or the tree is full.
    #[instrument(skip_all, fields(ledger = %self.params.id, %commitment))]
    pub fn add_commitment(
        &mut self,
        caller: Address,
        commitment: Field,
    ) -> Result<u64, LedgerError> {
        if let Some(relayer) = self.params.relayer
            && caller != relayer
        {
            return Err(LedgerError::Unauthorized {
                caller,
                action: "add commitments",
            });
        }
        if self.commitments.contains(&commitment) {
            return Err(LedgerError::DuplicateCommitment(commitment));
        }

        let leaf_index = self.tree.insert(commitment)?;
        self.commitments.insert(commitment);
        self.events
            .push(LedgerEvent::CommitmentAdded(CommitmentAdded {
                commitment,
                leaf_index,
            }));
        info!(leaf_index, root = %self.tree.current_root(), "Commitment added");
        Ok(leaf_index)
    }

    /// Release value against a membership proof, consuming its nullifier.
    ///
    /// # Errors
    /// Returns, in order of checking: [`LedgerError::UnknownRoot`],
    /// [`LedgerError::NullifierAlreadySpent`], [`LedgerError::InvalidProof`],
    /// [`LedgerError::AssetNotWhitelisted`], [`LedgerError::ZeroAmount`], or a
    /// custody error if the value cannot be released.
    #[instrument(
        skip_all,
        fields(
            ledger = %self.params.id,
            nullifier = %request.nullifier,
            asset = %request.asset,
            amount = %request.amount,
            recipient = %request.recipient,
        )
    )]
    pub fn withdraw(&mut self, request: &WithdrawRequest) -> Result<(), LedgerError> {
        if !self.tree.is_known_root(&request.root) {
            return Err(LedgerError::UnknownRoot(request.root));
        }
        if self.nullifiers.contains(&request.nullifier) {
            return Err(LedgerError::NullifierAlreadySpent(request.nullifier));
        }
        let expected_signals = [request.root, request.nullifier];
        if request.public_signals != expected_signals
            || !self
                .verifier
                .verify(&request.proof, &request.public_signals)
        {
            return Err(LedgerError::InvalidProof);
        }
        if !self.assets.is_whitelisted(&request.asset) {
            return Err(LedgerError::AssetNotWhitelisted(request.asset));
        }
        if request.amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        self.custody.release(
            &mut self.assets,
            request.asset,
            self.params.address,
            request.recipient,
            request.amount,
        )?;
        self.nullifiers.insert(request.nullifier);
        self.events.push(LedgerEvent::Withdrawal(WithdrawalEvent {
            nullifier: request.nullifier,
            asset: request.asset,
            amount: request.amount,
            recipient: request.recipient,
        }));
        info!("Withdrawal released");
        Ok(())
    }

    /// Whether `nullifier` has been consumed.
    #[must_use]
    pub fn is_spent(&self, nullifier: &Field) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// Whether `root` is within the accepted root history.
    #[must_use]
    pub fn is_known_root(&self, root: &Field) -> bool {
        self.tree.is_known_root(root)
    }

    /// Current tree root.
    #[must_use]
    pub fn current_root(&self) -> Field {
        self.tree.current_root()
    }

    /// Number of deposits accepted so far.
    #[must_use]
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Number of commitments in the tree.
    #[must_use]
    pub const fn leaf_count(&self) -> u64 {
        self.tree.leaf_count()
    }

    /// Whether `commitment` is registered.
    #[must_use]
    pub fn has_commitment(&self, commitment: &Field) -> bool {
        self.commitments.contains(commitment)
    }

    /// Balance of `account`.
    #[must_use]
    pub fn balance_of(&self, asset: &Address, account: &Address) -> u128 {
        self.assets.balance_of(asset, account)
    }

    /// Allowance from `owner` to `spender`.
    #[must_use]
    pub fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> u128 {
        self.assets.allowance(asset, owner, spender)
    }

    /// Total supply of `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: &Address) -> u128 {
        self.assets.total_supply(asset)
    }

    /// The asset book.
    #[must_use]
    pub const fn assets(&self) -> &AssetBook {
        &self.assets
    }

    /// Credit `amount` of new `asset` units to `account`.
    ///
    /// # Errors
    /// Returns an error on a zero amount or balance overflow.
    pub fn mint_to(
        &mut self,
        asset: Address,
        account: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.assets.mint(asset, account, amount)
    }

    /// Let `spender` move up to `amount` of `owner`'s `asset`.
    pub fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: u128) {
        self.assets.approve(asset, owner, spender, amount);
    }

    /// Move `amount` of `asset` between accounts.
    ///
    /// # Errors
    /// Returns an error on a zero amount, insufficient balance or overflow.
    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.assets.transfer(asset, from, to, amount)
    }

    /// Position the next event will take.
    #[must_use]
    pub fn next_event_position(&self) -> EventPosition {
        u64::try_from(self.events.len()).unwrap_or(u64::MAX)
    }

    /// Up to `limit` events strictly after `cursor` (from the start when `None`).
    #[must_use]
    pub fn events_after(&self, cursor: Option<EventPosition>, limit: usize) -> Vec<EventRecord> {
        let start = cursor.map_or(0, |position| position.saturating_add(1));
        let Some(tail) = usize::try_from(start)
            .ok()
            .and_then(|offset| self.events.get(offset..))
        else {
            return Vec::new();
        };
        (start..)
            .zip(tail)
            .take(limit)
            .map(|(position, event)| EventRecord {
                position,
                event: *event,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_utils::{address, field};
    use zkb_tree::Sha256Hasher;

    use super::*;
    use crate::custody::{BurnMint, LockRelease};
    use crate::note::Note;
    use crate::verifier::{TransparentVerifier, prove_membership};

    const DEPTH: u8 = 5;
    const OWNER: Address = Address::from_tag(0x01);
    const LEDGER: Address = Address::from_tag(0xee);
    const RELAYER: Address = Address::from_tag(0x0f);
    const ALICE: Address = Address::from_tag(0x0a);
    const BOB: Address = Address::from_tag(0x0b);
    const ASSET: Address = Address::from_tag(0xa0);

    type TestLedger<C> = CommitmentLedger<Sha256Hasher, TransparentVerifier<Sha256Hasher>, C>;

    fn params(relayer: Option<Address>) -> LedgerParams {
        LedgerParams {
            relayer,
            depth: DEPTH,
            root_history_size: 4,
            ..LedgerParams::new(LedgerId::from("test"), OWNER, LEDGER)
        }
    }

    fn ledger<C: Custody>(custody: C) -> TestLedger<C> {
        let mut ledger = CommitmentLedger::new(
            params(None),
            Sha256Hasher,
            TransparentVerifier::new(Sha256Hasher, DEPTH),
            custody,
        )
        .expect("valid params");
        ledger.whitelist_asset(OWNER, ASSET).expect("owner whitelists");
        ledger
    }

    fn withdraw_request<C: Custody>(
        ledger: &TestLedger<C>,
        note: &Note,
        amount: u128,
    ) -> WithdrawRequest {
        let witness = prove_membership(note, ledger.tree(), None).expect("note is in tree");
        WithdrawRequest {
            proof: witness.proof.to_bytes().expect("encode"),
            public_signals: witness.public_signals().to_vec(),
            root: witness.root,
            nullifier: witness.nullifier,
            asset: ASSET,
            amount,
            recipient: BOB,
        }
    }

    #[test]
    fn whitelist_requires_owner() {
        let mut ledger = ledger(LockRelease);
        assert!(matches!(
            ledger.whitelist_asset(ALICE, address!(0xa1)),
            Err(LedgerError::Unauthorized { caller: ALICE, .. })
        ));
        assert!(!ledger.is_whitelisted(&address!(0xa1)));
        assert!(ledger.is_whitelisted(&ASSET));
    }

    #[test]
    fn deposit_locks_and_counts() {
        let mut ledger = ledger(LockRelease);
        ledger.mint_to(ASSET, ALICE, 100).expect("mint");
        ledger.approve(ASSET, ALICE, LEDGER, 100);

        let nonce = ledger
            .deposit(Some(field!(42)), ASSET, 100, ALICE)
            .expect("deposit");
        assert_eq!(nonce, 1);
        assert_eq!(ledger.nonce(), 1);
        assert_eq!(ledger.balance_of(&ASSET, &ALICE), 0);
        assert_eq!(ledger.balance_of(&ASSET, &LEDGER), 100);
        assert_eq!(ledger.leaf_count(), 0);

        let events = ledger.events_after(None, 10);
        assert_eq!(
            events,
            vec![EventRecord {
                position: 0,
                event: LedgerEvent::Deposit(DepositEvent {
                    commitment: Some(field!(42)),
                    asset: ASSET,
                    amount: 100,
                    nonce: 1,
                }),
            }]
        );
    }

    #[test]
    fn deposit_rejections_leave_state_unchanged() {
        let mut ledger = ledger(BurnMint);
        ledger.mint_to(ASSET, ALICE, 10).expect("mint");

        assert_eq!(
            ledger.deposit(Some(field!(1)), address!(0xa1), 5, ALICE),
            Err(LedgerError::AssetNotWhitelisted(address!(0xa1)))
        );
        assert_eq!(
            ledger.deposit(Some(field!(1)), ASSET, 0, ALICE),
            Err(LedgerError::ZeroAmount)
        );
        assert!(matches!(
            ledger.deposit(Some(field!(1)), ASSET, 11, ALICE),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.nonce(), 0);
        assert_eq!(ledger.total_supply(&ASSET), 10);
        assert!(ledger.events_after(None, 10).is_empty());
    }

    #[test]
    fn custody_account_cannot_deposit() {
        let mut ledger = ledger(LockRelease);
        ledger.mint_to(ASSET, LEDGER, 50).expect("mint");
        ledger.approve(ASSET, LEDGER, LEDGER, 50);

        assert_eq!(
            ledger.deposit(Some(field!(3)), ASSET, 50, LEDGER),
            Err(LedgerError::Unauthorized {
                caller: LEDGER,
                action: "deposit from the custody account",
            })
        );
        assert_eq!(ledger.nonce(), 0);
        assert_eq!(ledger.balance_of(&ASSET, &LEDGER), 50);
        assert!(ledger.events_after(None, 10).is_empty());
    }

    #[test]
    fn duplicate_commitment_is_rejected() {
        let mut ledger = ledger(LockRelease);
        assert_eq!(ledger.add_commitment(ALICE, field!(7)), Ok(0));
        let root = ledger.current_root();

        assert_eq!(
            ledger.add_commitment(ALICE, field!(7)),
            Err(LedgerError::DuplicateCommitment(field!(7)))
        );
        assert_eq!(ledger.leaf_count(), 1);
        assert_eq!(ledger.current_root(), root);
    }

    #[test]
    fn relayer_gates_add_commitment() {
        let mut ledger: TestLedger<LockRelease> = CommitmentLedger::new(
            params(Some(RELAYER)),
            Sha256Hasher,
            TransparentVerifier::new(Sha256Hasher, DEPTH),
            LockRelease,
        )
        .expect("valid params");

        assert!(matches!(
            ledger.add_commitment(ALICE, field!(1)),
            Err(LedgerError::Unauthorized { caller: ALICE, .. })
        ));
        assert_eq!(ledger.add_commitment(RELAYER, field!(1)), Ok(0));
    }

    #[test]
    fn full_tree_surfaces_tree_full() {
        let mut ledger: TestLedger<LockRelease> = CommitmentLedger::new(
            LedgerParams {
                depth: 1,
                ..params(None)
            },
            Sha256Hasher,
            TransparentVerifier::new(Sha256Hasher, 1),
            LockRelease,
        )
        .expect("valid params");
        ledger.add_commitment(ALICE, field!(1)).expect("room");
        ledger.add_commitment(ALICE, field!(2)).expect("room");
        assert_eq!(
            ledger.add_commitment(ALICE, field!(3)),
            Err(LedgerError::TreeFull { capacity: 2 })
        );
        assert!(!ledger.has_commitment(&field!(3)));
    }

    #[test]
    fn withdraw_succeeds_once() {
        let mut ledger = ledger(BurnMint);
        let note = Note::from_secret([5; 31]);
        ledger
            .add_commitment(RELAYER, note.commitment(&Sha256Hasher))
            .expect("insert");

        let request = withdraw_request(&ledger, &note, 100);
        ledger.withdraw(&request).expect("first withdrawal");
        assert_eq!(ledger.balance_of(&ASSET, &BOB), 100);
        assert!(ledger.is_spent(&request.nullifier));

        assert_eq!(
            ledger.withdraw(&request),
            Err(LedgerError::NullifierAlreadySpent(request.nullifier))
        );
        assert_eq!(ledger.balance_of(&ASSET, &BOB), 100);
    }

    #[test]
    fn withdraw_checks_run_in_order() {
        let mut ledger = ledger(LockRelease);
        let note = Note::from_secret([5; 31]);
        ledger
            .add_commitment(RELAYER, note.commitment(&Sha256Hasher))
            .expect("insert");
        let request = withdraw_request(&ledger, &note, 100);

        let unknown_root = WithdrawRequest {
            root: field!(99),
            ..request.clone()
        };
        assert_eq!(
            ledger.withdraw(&unknown_root),
            Err(LedgerError::UnknownRoot(field!(99)))
        );

        let swapped_signals = WithdrawRequest {
            public_signals: vec![request.nullifier, request.root],
            ..request.clone()
        };
        assert_eq!(
            ledger.withdraw(&swapped_signals),
            Err(LedgerError::InvalidProof)
        );

        let garbage_proof = WithdrawRequest {
            proof: b"{}".to_vec(),
            ..request.clone()
        };
        assert_eq!(
            ledger.withdraw(&garbage_proof),
            Err(LedgerError::InvalidProof)
        );

        let foreign_asset = WithdrawRequest {
            asset: address!(0xa1),
            ..request.clone()
        };
        assert_eq!(
            ledger.withdraw(&foreign_asset),
            Err(LedgerError::AssetNotWhitelisted(address!(0xa1)))
        );

        // Custody is empty: the release fails and the nullifier stays unspent.
        assert!(matches!(
            ledger.withdraw(&request),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert!(!ledger.is_spent(&request.nullifier));
    }

    #[test]
    fn stale_root_is_rejected_after_eviction() {
        let mut ledger = ledger(BurnMint);
        let note = Note::from_secret([5; 31]);
        ledger
            .add_commitment(RELAYER, note.commitment(&Sha256Hasher))
            .expect("insert");
        let request = withdraw_request(&ledger, &note, 1);

        for i in 0..4 {
            ledger.add_commitment(RELAYER, field!(100 + i)).expect("insert");
        }
        assert_eq!(
            ledger.withdraw(&request),
            Err(LedgerError::UnknownRoot(request.root))
        );

        let fresh = withdraw_request(&ledger, &note, 1);
        ledger.withdraw(&fresh).expect("fresh root is known");
    }

    #[test]
    fn events_after_respects_cursor_and_limit() {
        let mut ledger = ledger(LockRelease);
        for i in 0..5 {
            ledger.add_commitment(RELAYER, field!(i + 1)).expect("insert");
        }
        let positions = |records: Vec<EventRecord>| {
            records.iter().map(|r| r.position).collect::<Vec<_>>()
        };
        assert_eq!(positions(ledger.events_after(None, 2)), vec![0, 1]);
        assert_eq!(positions(ledger.events_after(Some(1), 10)), vec![2, 3, 4]);
        assert!(ledger.events_after(Some(4), 10).is_empty());
        assert!(ledger.events_after(Some(9), 10).is_empty());
        assert!(ledger.events_after(Some(u64::MAX), 10).is_empty());
        assert_eq!(ledger.next_event_position(), 5);
    }
}
