//! Ledger state commands: create a ledger and apply single operations to it.

use std::path::Path;

use eyre::{Context as _, ensure};
use serde::Serialize;
use tracing::info;
use zkb_core::base::{Address, Field};
use zkb_core::schema::ledger::{LedgerId, LedgerVariant};
use zkb_ledger::{DynLedger, LedgerParams, WithdrawRequest};
use zkb_tree::HasherKind;

use super::{print_json, read_json};
use crate::common::{CommitmentSource, NoteFile, ProofFile};
use crate::state::{load_ledger, lock_state, new_ledger, save_ledger};

/// Summary printed by `ledger status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStatus {
    /// Deployment name.
    pub id: LedgerId,
    /// Custody variant.
    pub variant: LedgerVariant,
    /// Tree hasher.
    pub hasher: HasherKind,
    /// Custody account.
    pub custody: Address,
    /// Account allowed to add commitments, if restricted.
    pub relayer: Option<Address>,
    /// Tree depth.
    pub depth: u8,
    /// Inserted commitments.
    pub leaf_count: u64,
    /// Maximum number of commitments.
    pub capacity: u64,
    /// Latest root.
    pub current_root: Field,
    /// Roots accepted for withdrawals, newest first.
    pub known_roots: Vec<Field>,
    /// Deposit counter.
    pub nonce: u64,
    /// Number of events emitted.
    pub events: u64,
    /// Whitelisted assets.
    pub assets: Vec<Address>,
}

impl LedgerStatus {
    /// Summarize `ledger`.
    #[must_use]
    pub fn of(ledger: &DynLedger) -> Self {
        let params = ledger.params();
        let tree = ledger.tree();
        Self {
            id: params.id.clone(),
            variant: ledger.variant(),
            hasher: *tree.hasher(),
            custody: params.address,
            relayer: params.relayer,
            depth: tree.depth(),
            leaf_count: tree.leaf_count(),
            capacity: tree.capacity(),
            current_root: tree.current_root(),
            known_roots: tree.root_history(),
            nonce: ledger.nonce(),
            events: ledger.next_event_position(),
            assets: ledger.assets().whitelisted().copied().collect(),
        }
    }
}

async fn update<R>(
    state: &Path,
    f: impl FnOnce(&mut DynLedger) -> eyre::Result<R> + Send,
) -> eyre::Result<R> {
    let _lock = lock_state(state).await?;
    let mut ledger = load_ledger(state).await?;
    let result = f(&mut ledger)?;
    save_ledger(state, &ledger).await?;
    Ok(result)
}

/// Create a new, empty ledger state file.
///
/// # Errors
/// Returns an error if `state` already exists, the parameters are invalid or
/// the file cannot be written.
pub async fn ledger_init(
    state: &Path,
    params: LedgerParams,
    variant: LedgerVariant,
    hasher: HasherKind,
) -> eyre::Result<()> {
    let _lock = lock_state(state).await?;
    ensure!(
        !tokio::fs::try_exists(state).await?,
        "Refusing to overwrite existing ledger state {}",
        state.display()
    );
    let ledger = new_ledger(params, variant, hasher)?;
    save_ledger(state, &ledger).await?;
    info!(
        file = ?state,
        ledger = %ledger.id(),
        %variant,
        %hasher,
        custody = %ledger.params().address,
        root = %ledger.current_root(),
        "Ledger created"
    );
    Ok(())
}

/// Whitelist an asset.
///
/// # Errors
/// Returns an error if `caller` is not the ledger owner or the state file
/// cannot be read or written.
pub async fn ledger_whitelist(state: &Path, caller: Address, asset: Address) -> eyre::Result<()> {
    update(state, |ledger| Ok(ledger.whitelist_asset(caller, asset)?)).await
}

/// Credit new units of an asset to an account.
///
/// # Errors
/// Returns an error on a zero amount, a balance overflow or a state file error.
pub async fn ledger_mint(
    state: &Path,
    asset: Address,
    account: Address,
    amount: u128,
) -> eyre::Result<()> {
    update(state, |ledger| Ok(ledger.mint_to(asset, account, amount)?)).await?;
    info!(%asset, %account, %amount, "Minted");
    Ok(())
}

/// Let `spender` move up to `amount` of `owner`'s asset. The spender defaults
/// to the ledger's custody account, which is what a lock-release deposit draws on.
///
/// # Errors
/// Returns an error if the state file cannot be read or written.
pub async fn ledger_approve(
    state: &Path,
    asset: Address,
    owner: Address,
    spender: Option<Address>,
    amount: u128,
) -> eyre::Result<()> {
    let spender = update(state, |ledger| {
        let spender = spender.unwrap_or(ledger.params().address);
        ledger.approve(asset, owner, spender, amount);
        Ok(spender)
    })
    .await?;
    info!(%asset, %owner, %spender, %amount, "Allowance set");
    Ok(())
}

async fn resolve_commitment(source: &CommitmentSource) -> eyre::Result<Option<Field>> {
    match source {
        CommitmentSource::None => Ok(None),
        CommitmentSource::Value(commitment) => Ok(Some(*commitment)),
        CommitmentSource::Note(path) => {
            let note: NoteFile = read_json(path, "note").await?;
            Ok(Some(note.commitment))
        }
    }
}

/// Lock or burn value from `caller`, emitting a deposit event.
///
/// # Errors
/// Returns an error if the note cannot be read, the deposit is refused or the
/// state file cannot be read or written.
pub async fn ledger_deposit(
    state: &Path,
    commitment: &CommitmentSource,
    asset: Address,
    amount: u128,
    caller: Address,
) -> eyre::Result<()> {
    let commitment = resolve_commitment(commitment).await?;
    let nonce = update(state, |ledger| {
        Ok(ledger.deposit(commitment, asset, amount, caller)?)
    })
    .await?;
    match commitment {
        Some(commitment) => info!(nonce, %commitment, "Deposit recorded"),
        None => info!(nonce, "Deposit recorded without a commitment"),
    }
    Ok(())
}

/// Insert a commitment directly, as the relay would.
///
/// # Errors
/// Returns an error if `caller` is not the relayer, the commitment is already
/// present, the tree is full or the state file cannot be read or written.
pub async fn ledger_add_commitment(
    state: &Path,
    caller: Address,
    commitment: Field,
) -> eyre::Result<()> {
    let leaf_index = update(state, |ledger| Ok(ledger.add_commitment(caller, commitment)?)).await?;
    info!(%commitment, leaf_index, "Commitment added");
    Ok(())
}

/// Withdraw against a proof file built by `note prove`.
///
/// # Errors
/// Returns an error if the proof was built for another ledger, the withdrawal
/// is refused or a file cannot be read or written.
pub async fn ledger_withdraw(
    state: &Path,
    proof: &Path,
    asset: Address,
    amount: u128,
    recipient: Address,
) -> eyre::Result<()> {
    let proof_file: ProofFile = read_json(proof, "proof").await?;
    let request = WithdrawRequest {
        proof: proof_file
            .proof
            .to_bytes()
            .context("Failed to encode proof")?,
        public_signals: proof_file.public_signals,
        root: proof_file.root,
        nullifier: proof_file.nullifier,
        asset,
        amount,
        recipient,
    };

    update(state, |ledger| {
        ensure!(
            *ledger.id() == proof_file.ledger,
            "Proof was built against ledger {}, not {}",
            proof_file.ledger,
            ledger.id()
        );
        Ok(ledger.withdraw(&request)?)
    })
    .await?;
    info!(nullifier = %request.nullifier, %recipient, %amount, "Withdrawal complete");
    Ok(())
}

/// Print the ledger summary.
///
/// # Errors
/// Returns an error if the state file cannot be read.
pub async fn ledger_status(state: &Path) -> eyre::Result<()> {
    let ledger = load_ledger(state).await?;
    print_json(&LedgerStatus::of(&ledger))
}

#[derive(Serialize)]
struct SpentOutput {
    nullifier: Field,
    spent: bool,
}

/// Print whether a nullifier has been consumed.
///
/// # Errors
/// Returns an error if the state file cannot be read.
pub async fn ledger_is_spent(state: &Path, nullifier: Field) -> eyre::Result<()> {
    let ledger = load_ledger(state).await?;
    print_json(&SpentOutput {
        nullifier,
        spent: ledger.is_spent(&nullifier),
    })
}

#[derive(Serialize)]
struct BalanceOutput {
    asset: Address,
    account: Address,
    balance: u128,
    total_supply: u128,
}

/// Print an account's balance of an asset.
///
/// # Errors
/// Returns an error if the state file cannot be read.
pub async fn ledger_balance(state: &Path, asset: Address, account: Address) -> eyre::Result<()> {
    let ledger = load_ledger(state).await?;
    print_json(&BalanceOutput {
        asset,
        account,
        balance: ledger.balance_of(&asset, &account),
        total_supply: ledger.total_supply(&asset),
    })
}

#[cfg(test)]
mod tests {
    use test_utils::address;
    use zkb_ledger::{Note, prove_membership};

    use super::*;
    use crate::state::custody_address;

    const OWNER: Address = address!(1);
    const RELAYER: Address = address!(0xee);
    const ASSET: Address = address!(0xa0);
    const ALICE: Address = address!(0xa1);

    async fn init(dir: &Path, variant: LedgerVariant) -> std::path::PathBuf {
        let path = dir.join("ledger.json");
        let id = LedgerId::from("a");
        let params = LedgerParams {
            relayer: Some(RELAYER),
            depth: 5,
            root_history_size: 4,
            ..LedgerParams::new(id.clone(), OWNER, custody_address(&id))
        };
        ledger_init(&path, params, variant, HasherKind::Sha256)
            .await
            .expect("init");
        ledger_whitelist(&path, OWNER, ASSET)
            .await
            .expect("whitelist");
        path
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init(dir.path(), LedgerVariant::BurnMint).await;
        let params = LedgerParams::new(LedgerId::from("a"), OWNER, OWNER);
        let error = ledger_init(&path, params, LedgerVariant::BurnMint, HasherKind::Sha256)
            .await
            .expect_err("existing file");
        assert!(error.to_string().contains("Refusing to overwrite"));
    }

    #[tokio::test]
    async fn deposit_locks_into_custody() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init(dir.path(), LedgerVariant::LockRelease).await;
        ledger_mint(&path, ASSET, ALICE, 100).await.expect("mint");
        ledger_approve(&path, ASSET, ALICE, None, 100)
            .await
            .expect("approve");

        let note = Note::random();
        let note_path = dir.path().join("note.json");
        let json = serde_json::to_string(&NoteFile::new(&note, HasherKind::Sha256)).expect("json");
        tokio::fs::write(&note_path, json).await.expect("write note");

        ledger_deposit(&path, &CommitmentSource::Note(note_path), ASSET, 60, ALICE)
            .await
            .expect("deposit");

        let ledger = load_ledger(&path).await.expect("load");
        assert_eq!(ledger.nonce(), 1);
        assert_eq!(ledger.balance_of(&ASSET, &ALICE), 40);
        assert_eq!(ledger.balance_of(&ASSET, &ledger.params().address), 60);
        let deposit = ledger.events_after(None, 10).into_iter().find_map(|record| {
            record.event.as_deposit().copied()
        });
        assert_eq!(
            deposit.and_then(|deposit| deposit.commitment),
            Some(note.commitment(&HasherKind::Sha256))
        );
    }

    #[tokio::test]
    async fn refused_operation_leaves_state_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init(dir.path(), LedgerVariant::BurnMint).await;
        let before = tokio::fs::read_to_string(&path).await.expect("read");

        let error = ledger_add_commitment(&path, ALICE, Field::from_u64(1))
            .await
            .expect_err("not the relayer");
        assert!(error.to_string().contains("not authorized"));
        assert_eq!(tokio::fs::read_to_string(&path).await.expect("read"), before);
    }

    #[tokio::test]
    async fn withdraw_with_proof_file_mints_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init(dir.path(), LedgerVariant::BurnMint).await;
        let note = Note::random();
        let commitment = note.commitment(&HasherKind::Sha256);
        ledger_add_commitment(&path, RELAYER, commitment)
            .await
            .expect("insert");

        let ledger = load_ledger(&path).await.expect("load");
        let witness = prove_membership(&note, ledger.tree(), None).expect("prove");
        let proof_path = dir.path().join("proof.json");
        let proof = ProofFile::new(ledger.id().clone(), witness);
        let json = serde_json::to_string(&proof).expect("json");
        tokio::fs::write(&proof_path, json).await.expect("write proof");

        ledger_withdraw(&path, &proof_path, ASSET, 100, ALICE)
            .await
            .expect("withdraw");
        let ledger = load_ledger(&path).await.expect("load");
        assert_eq!(ledger.balance_of(&ASSET, &ALICE), 100);
        assert!(ledger.is_spent(&proof.nullifier));

        let error = ledger_withdraw(&path, &proof_path, ASSET, 100, ALICE)
            .await
            .expect_err("replay");
        assert!(error.to_string().contains("already spent"));
    }

    #[tokio::test]
    async fn updates_wait_for_state_lock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init(dir.path(), LedgerVariant::BurnMint).await;

        let held = lock_state(&path).await.expect("lock");
        let insert = tokio::spawn({
            let path = path.clone();
            async move { ledger_add_commitment(&path, RELAYER, Field::from_u64(9)).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!insert.is_finished());
        assert_eq!(load_ledger(&path).await.expect("load").leaf_count(), 0);

        drop(held);
        insert.await.expect("join").expect("insert");
        assert_eq!(load_ledger(&path).await.expect("load").leaf_count(), 1);
    }

    #[tokio::test]
    async fn status_reflects_ledger() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init(dir.path(), LedgerVariant::BurnMint).await;
        ledger_add_commitment(&path, RELAYER, Field::from_u64(7))
            .await
            .expect("insert");
        let first_root = load_ledger(&path).await.expect("load").current_root();
        ledger_add_commitment(&path, RELAYER, Field::from_u64(8))
            .await
            .expect("insert");

        let status = LedgerStatus::of(&load_ledger(&path).await.expect("load"));
        assert_eq!(status.leaf_count, 2);
        assert_eq!(status.capacity, 32);
        assert_eq!(status.assets, vec![ASSET]);
        assert_eq!(status.relayer, Some(RELAYER));
        assert_eq!(status.known_roots.first(), Some(&status.current_root));
        assert_eq!(status.known_roots.get(1), Some(&first_root));
        assert_eq!(status.events, 2);
    }
}
