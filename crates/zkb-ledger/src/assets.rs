//! Per-asset balances, allowances, supply and the whitelist.
//!
//! Every mutating method validates first and only then writes, so a failed
//! call leaves the book untouched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use zkb_core::base::Address;

use crate::error::LedgerError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct AssetState {
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
    /// owner -> spender -> amount
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
}

impl AssetState {
    fn balance(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or_default()
    }

    fn set_balance(&mut self, account: Address, amount: u128) {
        if amount == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }
}

/// Token bookkeeping for every asset a ledger has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBook {
    whitelist: BTreeSet<Address>,
    assets: BTreeMap<Address, AssetState>,
}

impl AssetBook {
    /// Allow `asset` to be deposited and withdrawn.
    pub fn whitelist(&mut self, asset: Address) {
        self.whitelist.insert(asset);
    }

    /// Whether `asset` is whitelisted.
    #[must_use]
    pub fn is_whitelisted(&self, asset: &Address) -> bool {
        self.whitelist.contains(asset)
    }

    /// Whitelisted assets in ascending order.
    pub fn whitelisted(&self) -> impl Iterator<Item = &Address> {
        self.whitelist.iter()
    }

    /// Balance of `account`.
    #[must_use]
    pub fn balance_of(&self, asset: &Address, account: &Address) -> u128 {
        self.assets
            .get(asset)
            .map(|state| state.balance(account))
            .unwrap_or_default()
    }

    /// Amount `spender` may move out of `owner`'s balance.
    #[must_use]
    pub fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> u128 {
        self.assets
            .get(asset)
            .map(|state| state.allowance(owner, spender))
            .unwrap_or_default()
    }

    /// Total supply of `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: &Address) -> u128 {
        self.assets
            .get(asset)
            .map(|state| state.total_supply)
            .unwrap_or_default()
    }

    /// Create `amount` new units for `to`.
    ///
    /// # Errors
    /// Returns [`LedgerError::BalanceOverflow`] if the supply or balance overflows.
    pub fn mint(&mut self, asset: Address, to: Address, amount: u128) -> Result<(), LedgerError> {
        let state = self.assets.get(&asset);
        let supply = state.map_or(0, |state| state.total_supply);
        let balance = state.map_or(0, |state| state.balance(&to));
        let new_supply = supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { asset })?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { asset })?;

        let state = self.assets.entry(asset).or_default();
        state.total_supply = new_supply;
        state.set_balance(to, new_balance);
        Ok(())
    }

    /// Destroy `amount` units held by `from`.
    ///
    /// # Errors
    /// Returns [`LedgerError::InsufficientBalance`] if `from` holds less than `amount`.
    pub fn burn(&mut self, asset: Address, from: Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(&asset, &from);
        let new_balance = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                asset,
                account: from,
                needed: amount,
                available,
            })?;

        let state = self.assets.entry(asset).or_default();
        state.total_supply = state.total_supply.saturating_sub(amount);
        state.set_balance(from, new_balance);
        Ok(())
    }

    /// Set the amount `spender` may move out of `owner`'s balance.
    pub fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: u128) {
        let spenders = self
            .assets
            .entry(asset)
            .or_default()
            .allowances
            .entry(owner)
            .or_default();
        if amount == 0 {
            spenders.remove(&spender);
        } else {
            spenders.insert(spender, amount);
        }
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// Returns an error if `from` holds less than `amount` or `to` would overflow.
    pub fn transfer(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let available = self.balance_of(&asset, &from);
        let new_from = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                asset,
                account: from,
                needed: amount,
                available,
            })?;
        if from == to {
            return Ok(());
        }
        let new_to = self
            .balance_of(&asset, &to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { asset })?;

        let state = self.assets.entry(asset).or_default();
        state.set_balance(from, new_from);
        state.set_balance(to, new_to);
        Ok(())
    }

    /// Move `amount` from `owner` to `to` on behalf of `spender`, consuming allowance.
    ///
    /// # Errors
    /// Returns an error if the allowance or the balance is insufficient.
    pub fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let allowed = self.allowance(&asset, &owner, &spender);
        let new_allowance =
            allowed
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientAllowance {
                    asset,
                    owner,
                    spender,
                    needed: amount,
                    available: allowed,
                })?;

        self.transfer(asset, owner, to, amount)?;
        self.approve(asset, owner, spender, new_allowance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_utils::address;

    use super::*;

    const ASSET: Address = Address::from_tag(0xa0);

    #[test]
    fn mint_and_burn_track_supply() {
        let mut book = AssetBook::default();
        book.mint(ASSET, address!(1), 100).expect("mint");
        book.mint(ASSET, address!(2), 50).expect("mint");
        assert_eq!(book.total_supply(&ASSET), 150);

        book.burn(ASSET, address!(1), 40).expect("burn");
        assert_eq!(book.balance_of(&ASSET, &address!(1)), 60);
        assert_eq!(book.total_supply(&ASSET), 110);

        let err = book.burn(ASSET, address!(2), 51).expect_err("overdraw");
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                asset: ASSET,
                account: address!(2),
                needed: 51,
                available: 50,
            }
        );
        assert_eq!(book.total_supply(&ASSET), 110);
    }

    #[test]
    fn mint_overflow_leaves_book_unchanged() {
        let mut book = AssetBook::default();
        book.mint(ASSET, address!(1), u128::MAX).expect("mint");
        let before = book.clone();
        assert_eq!(
            book.mint(ASSET, address!(2), 1),
            Err(LedgerError::BalanceOverflow { asset: ASSET })
        );
        assert_eq!(book, before);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut book = AssetBook::default();
        book.mint(ASSET, address!(1), 100).expect("mint");
        book.approve(ASSET, address!(1), address!(9), 70);

        book.transfer_from(ASSET, address!(9), address!(1), address!(9), 30)
            .expect("within allowance");
        assert_eq!(book.allowance(&ASSET, &address!(1), &address!(9)), 40);
        assert_eq!(book.balance_of(&ASSET, &address!(9)), 30);

        let err = book
            .transfer_from(ASSET, address!(9), address!(1), address!(9), 41)
            .expect_err("exceeds allowance");
        assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));
        assert_eq!(book.balance_of(&ASSET, &address!(1)), 70);
    }

    #[test]
    fn transfer_from_without_funds_keeps_allowance() {
        let mut book = AssetBook::default();
        book.mint(ASSET, address!(1), 10).expect("mint");
        book.approve(ASSET, address!(1), address!(9), 100);
        let err = book
            .transfer_from(ASSET, address!(9), address!(1), address!(9), 20)
            .expect_err("exceeds balance");
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(book.allowance(&ASSET, &address!(1), &address!(9)), 100);
    }

    #[test]
    fn whitelist_is_per_asset() {
        let mut book = AssetBook::default();
        book.whitelist(ASSET);
        assert!(book.is_whitelisted(&ASSET));
        assert!(!book.is_whitelisted(&address!(0xa1)));
        assert_eq!(book.whitelisted().count(), 1);
    }

    #[test]
    fn book_roundtrips_through_json() {
        let mut book = AssetBook::default();
        book.whitelist(ASSET);
        book.mint(ASSET, address!(1), 5).expect("mint");
        book.approve(ASSET, address!(1), address!(2), 3);
        let json = serde_json::to_string(&book).expect("serialize");
        let back: AssetBook = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, book);
    }
}
