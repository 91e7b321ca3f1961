//! How a ledger takes deposited value and gives it back on withdrawal.

use std::fmt;

use zkb_core::base::Address;
use zkb_core::schema::ledger::LedgerVariant;

use crate::assets::AssetBook;
use crate::error::LedgerError;

/// Value movement on deposit and withdrawal.
///
/// Implementations must be all-or-nothing: on error the book is unchanged.
pub trait Custody: Clone + fmt::Debug + Send + Sync + 'static {
    /// Which variant this custody implements.
    fn variant(&self) -> LedgerVariant;

    /// Take `amount` of `asset` from `depositor` for the ledger at `ledger`.
    ///
    /// # Errors
    /// Returns an error if the depositor cannot cover the amount.
    fn take(
        &self,
        book: &mut AssetBook,
        asset: Address,
        depositor: Address,
        ledger: Address,
        amount: u128,
    ) -> Result<(), LedgerError>;

    /// Give `amount` of `asset` to `recipient` from the ledger at `ledger`.
    ///
    /// # Errors
    /// Returns an error if the ledger cannot cover the amount.
    fn release(
        &self,
        book: &mut AssetBook,
        asset: Address,
        ledger: Address,
        recipient: Address,
        amount: u128,
    ) -> Result<(), LedgerError>;
}

/// Deposits move value into the ledger's own account using the depositor's
/// allowance; withdrawals pay out of that account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockRelease;

impl Custody for LockRelease {
    fn variant(&self) -> LedgerVariant {
        LedgerVariant::LockRelease
    }

    fn take(
        &self,
        book: &mut AssetBook,
        asset: Address,
        depositor: Address,
        ledger: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        book.transfer_from(asset, ledger, depositor, ledger, amount)
    }

    fn release(
        &self,
        book: &mut AssetBook,
        asset: Address,
        ledger: Address,
        recipient: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        book.transfer(asset, ledger, recipient, amount)
    }
}

/// Deposits burn the depositor's balance; withdrawals mint new supply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurnMint;

impl Custody for BurnMint {
    fn variant(&self) -> LedgerVariant {
        LedgerVariant::BurnMint
    }

    fn take(
        &self,
        book: &mut AssetBook,
        asset: Address,
        depositor: Address,
        _ledger: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        book.burn(asset, depositor, amount)
    }

    fn release(
        &self,
        book: &mut AssetBook,
        asset: Address,
        _ledger: Address,
        recipient: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        book.mint(asset, recipient, amount)
    }
}

/// Runtime selection between the two custody strategies.
impl Custody for LedgerVariant {
    fn variant(&self) -> LedgerVariant {
        *self
    }

    fn take(
        &self,
        book: &mut AssetBook,
        asset: Address,
        depositor: Address,
        ledger: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        match self {
            Self::LockRelease => LockRelease.take(book, asset, depositor, ledger, amount),
            Self::BurnMint => BurnMint.take(book, asset, depositor, ledger, amount),
        }
    }

    fn release(
        &self,
        book: &mut AssetBook,
        asset: Address,
        ledger: Address,
        recipient: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        match self {
            Self::LockRelease => LockRelease.release(book, asset, ledger, recipient, amount),
            Self::BurnMint => BurnMint.release(book, asset, ledger, recipient, amount),
        }
    }
}
