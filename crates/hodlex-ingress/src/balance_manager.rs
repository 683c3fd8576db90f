//! In-memory balance ledger.
//!
//! Tracks one spendable balance per (account, asset). Module accounts
//! such as the escrow holder are ordinary accounts here. All mutations
//! are atomic: either the full operation succeeds or the balance is
//! unchanged.

use std::collections::BTreeMap;

use hodlex_types::{AccountId, Asset, HodlexError, Result};
use rust_decimal::Decimal;
use tracing::debug;

use crate::keepers::BankKeeper;

/// Reference [`BankKeeper`] backed by an ordered map.
#[derive(Debug, Clone, Default)]
pub struct BalanceManager {
    balances: BTreeMap<(AccountId, Asset), Decimal>,
}

impl BalanceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit funds from outside the ledger (genesis, deposits).
    pub fn deposit(&mut self, account: &AccountId, asset: &str, amount: Decimal) {
        *self
            .balances
            .entry((account.clone(), asset.to_string()))
            .or_default() += amount;
    }

    fn debit(&mut self, account: &AccountId, asset: &str, amount: Decimal) -> Result<()> {
        let available = self.balance(account, asset);
        if available < amount {
            return Err(HodlexError::InsufficientBalance {
                asset: asset.to_string(),
                needed: amount,
                available,
            });
        }
        let key = (account.clone(), asset.to_string());
        let remaining = available - amount;
        if remaining.is_zero() {
            self.balances.remove(&key);
        } else {
            self.balances.insert(key, remaining);
        }
        Ok(())
    }

    /// Every non-zero balance in (account, asset) order.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &str, Decimal)> {
        self.balances
            .iter()
            .map(|((account, asset), amount)| (account, asset.as_str(), *amount))
    }
}

fn ensure_non_negative(amount: Decimal) -> Result<()> {
    if amount.is_sign_negative() {
        return Err(HodlexError::Bank(format!("negative amount {amount}")));
    }
    Ok(())
}

impl BankKeeper for BalanceManager {
    fn balance(&self, account: &AccountId, asset: &str) -> Decimal {
        self.balances
            .get(&(account.clone(), asset.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, asset: &str, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        if amount.is_zero() {
            return Ok(());
        }
        self.debit(from, asset, amount)?;
        self.deposit(to, asset, amount);
        debug!(%from, %to, asset, %amount, "transfer");
        Ok(())
    }

    fn mint(&mut self, to: &AccountId, asset: &str, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        self.deposit(to, asset, amount);
        Ok(())
    }

    fn burn(&mut self, from: &AccountId, asset: &str, amount: Decimal) -> Result<()> {
        ensure_non_negative(amount)?;
        self.debit(from, asset, amount)
    }

    fn total_supply(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }
}
