//! Events emitted by a commitment ledger.
//!
//! Events are appended to a per-ledger log and addressed by their position in
//! that log. The relay uses positions as its cursor.

use serde::{Deserialize, Serialize};

use crate::base::{Address, Field};

/// Zero-based position of an event in a ledger's event log.
pub type EventPosition = u64;

/// Emitted when value is locked or burned on a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    /// Commitment to mirror into the peer ledger, if the depositor supplied one.
    pub commitment: Option<Field>,
    /// Asset that was deposited.
    pub asset: Address,
    /// Deposited amount.
    pub amount: u128,
    /// Ledger-wide deposit counter after this deposit. Starts at 1.
    pub nonce: u64,
}

/// Emitted when a commitment is inserted into a ledger's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentAdded {
    /// Inserted commitment.
    pub commitment: Field,
    /// Index assigned to the commitment.
    pub leaf_index: u64,
}

/// Emitted when a withdrawal succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    /// Nullifier consumed by the withdrawal.
    pub nullifier: Field,
    /// Asset that was released or minted.
    pub asset: Address,
    /// Released amount.
    pub amount: u128,
    /// Account credited with the amount.
    pub recipient: Address,
}

/// Any event a ledger can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerEvent {
    /// See [`DepositEvent`].
    Deposit(DepositEvent),
    /// See [`CommitmentAdded`].
    CommitmentAdded(CommitmentAdded),
    /// See [`WithdrawalEvent`].
    Withdrawal(WithdrawalEvent),
}

impl LedgerEvent {
    /// The deposit payload, if this is a deposit event.
    #[must_use]
    pub const fn as_deposit(&self) -> Option<&DepositEvent> {
        match self {
            Self::Deposit(deposit) => Some(deposit),
            Self::CommitmentAdded(_) | Self::Withdrawal(_) => None,
        }
    }
}

/// An event together with its log position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position of the event in the ledger's log.
    pub position: EventPosition,
    /// The event itself.
    pub event: LedgerEvent,
}
