//! Ledger subcommands.

use std::path::PathBuf;

use zkb_core::base::{Address, Field};
use zkb_core::schema::ledger::{LedgerId, LedgerVariant};
use zkb_ledger::LedgerParams;
use zkb_sdk::common::CommitmentSource;
use zkb_sdk::state::custody_address;
use zkb_tree::{DEFAULT_ROOT_HISTORY_SIZE, DEFAULT_TREE_DEPTH, HasherKind};

use super::constants::{
    DEFAULT_HASHER, ZKB_ACCOUNT, ZKB_AMOUNT, ZKB_ASSET, ZKB_CALLER, ZKB_COMMITMENT, ZKB_CUSTODY,
    ZKB_HASHER, ZKB_LEDGER_ID, ZKB_LEDGER_VARIANT, ZKB_NOTE_FILE, ZKB_NULLIFIER, ZKB_OWNER,
    ZKB_PROOF_FILE, ZKB_RECIPIENT, ZKB_RELAYER, ZKB_ROOT_HISTORY, ZKB_SPENDER, ZKB_STATE_FILE,
    ZKB_TREE_DEPTH,
};

/// Ledger state file shared by every ledger subcommand.
#[derive(Debug, clap::Args)]
pub struct StateArgs {
    /// Ledger state file (JSON).
    #[arg(long, env = ZKB_STATE_FILE)]
    pub state: PathBuf,
}

/// Arguments for `zkb ledger init`.
#[derive(Debug, clap::Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Deployment name, used in relay checkpoint keys.
    #[arg(long, env = ZKB_LEDGER_ID)]
    pub id: String,

    /// Custody variant (lock-release or burn-mint).
    #[arg(long, env = ZKB_LEDGER_VARIANT)]
    pub variant: LedgerVariant,

    /// Account allowed to whitelist assets.
    #[arg(long, env = ZKB_OWNER)]
    pub owner: Address,

    /// Custody account. Derived from the ledger name if omitted.
    #[arg(long, env = ZKB_CUSTODY)]
    pub custody: Option<Address>,

    /// Only account allowed to add commitments. Anyone may if omitted.
    #[arg(long, env = ZKB_RELAYER)]
    pub relayer: Option<Address>,

    /// Commitment tree depth.
    #[arg(
        long,
        env = ZKB_TREE_DEPTH,
        default_value_t = DEFAULT_TREE_DEPTH,
        value_parser = clap::value_parser!(u8).range(1..=32)
    )]
    pub depth: u8,

    /// Number of recent roots accepted for withdrawals.
    #[arg(long, env = ZKB_ROOT_HISTORY, default_value_t = DEFAULT_ROOT_HISTORY_SIZE)]
    pub root_history: usize,

    /// Tree hasher (sha256 or blake2s).
    #[arg(long, env = ZKB_HASHER, default_value = DEFAULT_HASHER)]
    pub hasher: HasherKind,
}

impl InitArgs {
    /// Ledger parameters described by these arguments.
    pub fn params(&self) -> LedgerParams {
        let id = LedgerId::new(self.id.clone());
        let custody = self.custody.unwrap_or_else(|| custody_address(&id));
        LedgerParams {
            relayer: self.relayer,
            depth: self.depth,
            root_history_size: self.root_history,
            ..LedgerParams::new(id, self.owner, custody)
        }
    }
}

/// Arguments for `zkb ledger deposit`.
#[derive(Debug, clap::Args)]
pub struct DepositArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Asset to deposit.
    #[arg(long, env = ZKB_ASSET)]
    pub asset: Address,

    /// Amount to lock or burn.
    #[arg(long, env = ZKB_AMOUNT)]
    pub amount: u128,

    /// Depositing account.
    #[arg(long, env = ZKB_CALLER)]
    pub caller: Address,

    /// Commitment to mirror into the peer ledger.
    #[arg(long, env = ZKB_COMMITMENT, conflicts_with = "note")]
    pub commitment: Option<Field>,

    /// Note file whose commitment is mirrored into the peer ledger.
    #[arg(long, env = ZKB_NOTE_FILE)]
    pub note: Option<PathBuf>,
}

impl DepositArgs {
    /// Where the deposit takes its commitment from.
    pub fn commitment_source(&self) -> CommitmentSource {
        match (&self.commitment, &self.note) {
            (Some(commitment), _) => CommitmentSource::Value(*commitment),
            (None, Some(note)) => CommitmentSource::Note(note.clone()),
            (None, None) => CommitmentSource::None,
        }
    }
}

/// Arguments for `zkb ledger withdraw`.
#[derive(Debug, clap::Args)]
pub struct WithdrawArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Proof file written by `zkb note prove`.
    #[arg(long, env = ZKB_PROOF_FILE)]
    pub proof: PathBuf,

    /// Asset to release or mint.
    #[arg(long, env = ZKB_ASSET)]
    pub asset: Address,

    /// Amount to withdraw.
    #[arg(long, env = ZKB_AMOUNT)]
    pub amount: u128,

    /// Account credited with the amount.
    #[arg(long, env = ZKB_RECIPIENT)]
    pub recipient: Address,
}

/// Ledger command group.
#[derive(Debug, clap::Subcommand)]
pub enum LedgerCommands {
    /// Create an empty ledger state file.
    Init {
        #[command(flatten)]
        args: InitArgs,
    },
    /// Whitelist an asset (owner only).
    Whitelist {
        #[command(flatten)]
        state: StateArgs,
        /// Calling account.
        #[arg(long, env = ZKB_CALLER)]
        caller: Address,
        /// Asset to whitelist.
        #[arg(long, env = ZKB_ASSET)]
        asset: Address,
    },
    /// Credit new units of an asset to an account.
    Mint {
        #[command(flatten)]
        state: StateArgs,
        /// Asset to mint.
        #[arg(long, env = ZKB_ASSET)]
        asset: Address,
        /// Account to credit.
        #[arg(long, env = ZKB_ACCOUNT)]
        account: Address,
        /// Amount to mint.
        #[arg(long, env = ZKB_AMOUNT)]
        amount: u128,
    },
    /// Allow a spender to move an account's asset.
    Approve {
        #[command(flatten)]
        state: StateArgs,
        /// Asset to approve.
        #[arg(long, env = ZKB_ASSET)]
        asset: Address,
        /// Account granting the allowance.
        #[arg(long, env = ZKB_ACCOUNT)]
        owner: Address,
        /// Spender. Defaults to the ledger's custody account.
        #[arg(long, env = ZKB_SPENDER)]
        spender: Option<Address>,
        /// Allowance.
        #[arg(long, env = ZKB_AMOUNT)]
        amount: u128,
    },
    /// Lock or burn value and emit a deposit event.
    Deposit {
        #[command(flatten)]
        args: DepositArgs,
    },
    /// Insert a commitment by hand, as the relay would.
    AddCommitment {
        #[command(flatten)]
        state: StateArgs,
        /// Calling account; must be the relayer if one is set.
        #[arg(long, env = ZKB_CALLER)]
        caller: Address,
        /// Commitment to insert.
        #[arg(long, env = ZKB_COMMITMENT)]
        commitment: Field,
    },
    /// Withdraw against a membership proof.
    Withdraw {
        #[command(flatten)]
        args: WithdrawArgs,
    },
    /// Print a summary of the ledger.
    Status {
        #[command(flatten)]
        state: StateArgs,
    },
    /// Print whether a nullifier has been spent.
    IsSpent {
        #[command(flatten)]
        state: StateArgs,
        /// Nullifier to look up.
        #[arg(long, env = ZKB_NULLIFIER)]
        nullifier: Field,
    },
    /// Print an account's balance.
    Balance {
        #[command(flatten)]
        state: StateArgs,
        /// Asset to query.
        #[arg(long, env = ZKB_ASSET)]
        asset: Address,
        /// Account to query.
        #[arg(long, env = ZKB_ACCOUNT)]
        account: Address,
    },
}
