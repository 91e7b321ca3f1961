use thiserror::Error;
use zkb_core::base::{Address, Field};
use zkb_tree::TreeError;

/// Errors returned by ledger operations.
///
/// Every error rejects a single operation and leaves the ledger unchanged.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// The commitment tree has no free leaf.
    #[error("Commitment tree is full ({capacity} leaves)")]
    TreeFull {
        /// Number of leaves the tree can hold.
        capacity: u64,
    },

    /// Tree parameters are invalid.
    #[error("Invalid tree: {0}")]
    InvalidTree(TreeError),

    /// The commitment was already inserted.
    #[error("Commitment {0} is already registered")]
    DuplicateCommitment(Field),

    /// The asset is not whitelisted on this ledger.
    #[error("Asset {0} is not whitelisted")]
    AssetNotWhitelisted(Address),

    /// The root is not in the retained root history.
    #[error("Root {0} is not a known root")]
    UnknownRoot(Field),

    /// The nullifier was consumed by an earlier withdrawal.
    #[error("Nullifier {0} is already spent")]
    NullifierAlreadySpent(Field),

    /// The proof or its public signals do not verify.
    #[error("Invalid withdrawal proof")]
    InvalidProof,

    /// An account holds less than the operation needs.
    #[error("Insufficient balance of {asset} for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        /// Asset being moved.
        asset: Address,
        /// Account being debited.
        account: Address,
        /// Requested amount.
        needed: u128,
        /// Current balance.
        available: u128,
    },

    /// A spender is allowed less than the operation needs.
    #[error(
        "Insufficient allowance of {asset} from {owner} to {spender}: need {needed}, have {available}"
    )]
    InsufficientAllowance {
        /// Asset being moved.
        asset: Address,
        /// Owner of the funds.
        owner: Address,
        /// Account spending on the owner's behalf.
        spender: Address,
        /// Requested amount.
        needed: u128,
        /// Current allowance.
        available: u128,
    },

    /// Amounts must be positive.
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// The caller may not perform this operation.
    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        /// Account that attempted the call.
        caller: Address,
        /// Operation that was attempted.
        action: &'static str,
    },

    /// A balance or supply would exceed `u128::MAX`.
    #[error("Balance of {asset} would overflow")]
    BalanceOverflow {
        /// Asset whose balance or supply overflows.
        asset: Address,
    },

    /// Another thread panicked while holding the ledger lock.
    #[error("Ledger lock is poisoned")]
    LedgerPoisoned,
}

impl From<TreeError> for LedgerError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::TreeFull { capacity } => Self::TreeFull { capacity },
            other @ (TreeError::LeafNotFound(_)
            | TreeError::DepthTooLarge(_)
            | TreeError::EmptyRootHistory) => Self::InvalidTree(other),
        }
    }
}
