//! Escrow manager: the fund/share locking layer.
//!
//! Every open order has one [`EscrowRecord`]. Funds move from the owner
//! into the escrow module account on lock, out of escrow directly to
//! counterparties on settle, and back to the owner on unlock. The
//! escrow account's bank balance of an asset always equals the sum of
//! `outstanding()` over records in that asset. Running totals per asset
//! and per `(owner, asset)` are kept alongside the records so neither
//! the audit nor the concentration check has to walk every order.
//!
//! ## Checkpoints
//!
//! Multi-step operations (place-and-match, swaps) open a checkpoint.
//! Inside it, every record change and every transfer is journaled.
//! [`EscrowManager::rollback`] replays compensating transfers in reverse
//! and restores records exactly; [`EscrowManager::commit`] discards the
//! journal. A compensating transfer that fails is an invariant
//! violation and panics.

use std::collections::BTreeMap;

use hodlex_types::constants::{BENEFICIAL_REFERENCE_KIND_ORDER, DEFAULT_SHARE_CLASS};
use hodlex_types::{
    AccountId, Asset, BeneficialOwnership, EscrowRecord, HodlexError, Order, OrderId, OrderSide,
    Result,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::keepers::{BankKeeper, EquityRegistry};

#[derive(Debug, Clone)]
enum UndoEntry {
    Transfer {
        from: AccountId,
        to: AccountId,
        asset: Asset,
        amount: Decimal,
    },
    Record {
        order_id: OrderId,
        previous: Option<EscrowRecord>,
    },
}

/// Tracks per-order escrow and moves funds through the bank.
#[derive(Debug, Clone)]
pub struct EscrowManager {
    escrow_account: AccountId,
    records: BTreeMap<OrderId, EscrowRecord>,
    totals: BTreeMap<Asset, Decimal>,
    owner_totals: BTreeMap<(AccountId, Asset), Decimal>,
    journal: Option<Vec<UndoEntry>>,
}

impl EscrowManager {
    #[must_use]
    pub fn new(escrow_account: AccountId) -> Self {
        Self {
            escrow_account,
            records: BTreeMap::new(),
            totals: BTreeMap::new(),
            owner_totals: BTreeMap::new(),
            journal: None,
        }
    }

    #[must_use]
    pub fn escrow_account(&self) -> &AccountId {
        &self.escrow_account
    }

    // =================================================================
    // Checkpoints
    // =================================================================

    /// Start journaling. Checkpoints do not nest.
    pub fn checkpoint(&mut self) -> Result<()> {
        if self.journal.is_some() {
            return Err(HodlexError::Internal("escrow checkpoint already open".into()));
        }
        self.journal = Some(Vec::new());
        Ok(())
    }

    /// Keep every change made since the checkpoint.
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every change made since the checkpoint.
    ///
    /// # Panics
    /// If a compensating transfer fails; escrow accounting can no longer
    /// be trusted at that point.
    pub fn rollback(&mut self, bank: &mut dyn BankKeeper) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        let steps = journal.len();
        for entry in journal.into_iter().rev() {
            match entry {
                UndoEntry::Transfer {
                    from,
                    to,
                    asset,
                    amount,
                } => {
                    if let Err(err) = bank.transfer(&to, &from, &asset, amount) {
                        panic!(
                            "escrow rollback failed to return {amount} {asset} from {to} to {from}: {err}"
                        );
                    }
                }
                UndoEntry::Record { order_id, previous } => {
                    let current = match previous {
                        Some(record) => {
                            self.shift(&record.owner, &record.asset, record.outstanding());
                            self.records.insert(order_id, record)
                        }
                        None => self.records.remove(&order_id),
                    };
                    if let Some(current) = current {
                        self.shift(&current.owner, &current.asset, -current.outstanding());
                    }
                }
            }
        }
        warn!(steps, "escrow rolled back");
    }

    #[must_use]
    pub fn in_checkpoint(&self) -> bool {
        self.journal.is_some()
    }

    /// Move the running totals for `owner`'s `asset` by `delta`.
    fn shift(&mut self, owner: &AccountId, asset: &str, delta: Decimal) {
        if delta.is_zero() {
            return;
        }
        let total = self.totals.entry(asset.to_string()).or_default();
        *total += delta;
        if total.is_zero() {
            self.totals.remove(asset);
        }
        let key = (owner.clone(), asset.to_string());
        let owned = self.owner_totals.entry(key.clone()).or_default();
        *owned += delta;
        if owned.is_zero() {
            self.owner_totals.remove(&key);
        }
    }

    fn journal_record(&mut self, order_id: OrderId) {
        let previous = self.records.get(&order_id).cloned();
        if let Some(journal) = self.journal.as_mut() {
            journal.push(UndoEntry::Record { order_id, previous });
        }
    }

    /// Journaled transfer through the bank.
    pub fn transfer(
        &mut self,
        bank: &mut dyn BankKeeper,
        from: &AccountId,
        to: &AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        bank.transfer(from, to, asset, amount)?;
        if let Some(journal) = self.journal.as_mut() {
            journal.push(UndoEntry::Transfer {
                from: from.clone(),
                to: to.clone(),
                asset: asset.to_string(),
                amount,
            });
        }
        Ok(())
    }

    // =================================================================
    // Lock / unlock / settle
    // =================================================================

    /// Move `amount` of `asset` from `owner` into escrow for `order_id`.
    pub fn lock(
        &mut self,
        bank: &mut dyn BankKeeper,
        order_id: OrderId,
        owner: &AccountId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        if amount.is_sign_negative() {
            return Err(HodlexError::Internal(format!("negative lock for {order_id}")));
        }
        if let Some(existing) = self.records.get(&order_id) {
            if existing.asset != asset || &existing.owner != owner {
                return Err(HodlexError::Internal(format!(
                    "escrow for {order_id} already holds {} of {}",
                    existing.asset, existing.owner
                )));
            }
        }
        let available = bank.balance(owner, asset);
        if available < amount {
            return Err(HodlexError::InsufficientBalance {
                asset: asset.to_string(),
                needed: amount,
                available,
            });
        }

        let escrow = self.escrow_account.clone();
        self.transfer(bank, owner, &escrow, asset, amount)?;
        self.journal_record(order_id);
        self.records
            .entry(order_id)
            .or_insert_with(|| EscrowRecord::new(order_id, owner.clone(), asset.to_string()))
            .locked += amount;
        self.shift(owner, asset, amount);
        debug!(%order_id, %owner, asset, %amount, "escrow locked");
        Ok(())
    }

    /// Return `amount` of an order's escrow to its owner.
    pub fn unlock(&mut self, bank: &mut dyn BankKeeper, order_id: OrderId, amount: Decimal) -> Result<()> {
        let record = self.require(order_id, amount)?;
        let (owner, asset) = (record.owner.clone(), record.asset.clone());
        let escrow = self.escrow_account.clone();
        self.transfer(bank, &escrow, &owner, &asset, amount)?;
        self.journal_record(order_id);
        if let Some(r) = self.records.get_mut(&order_id) {
            r.released += amount;
        }
        self.shift(&owner, &asset, -amount);
        debug!(%order_id, %owner, %asset, %amount, "escrow unlocked");
        Ok(())
    }

    /// Pay `amount` of an order's escrow straight to `counterparty`.
    pub fn settle(
        &mut self,
        bank: &mut dyn BankKeeper,
        order_id: OrderId,
        counterparty: &AccountId,
        amount: Decimal,
    ) -> Result<()> {
        let record = self.require(order_id, amount)?;
        let (owner, asset) = (record.owner.clone(), record.asset.clone());
        let escrow = self.escrow_account.clone();
        self.transfer(bank, &escrow, counterparty, &asset, amount)?;
        self.journal_record(order_id);
        if let Some(r) = self.records.get_mut(&order_id) {
            r.settled += amount;
        }
        self.shift(&owner, &asset, -amount);
        debug!(%order_id, %counterparty, %asset, %amount, "escrow settled");
        Ok(())
    }

    /// Release anything above `required` back to the owner. Returns the
    /// amount released.
    pub fn release_excess(
        &mut self,
        bank: &mut dyn BankKeeper,
        order_id: OrderId,
        required: Decimal,
    ) -> Result<Decimal> {
        let excess = self.outstanding(order_id) - required;
        if excess > Decimal::ZERO {
            self.unlock(bank, order_id, excess)?;
            Ok(excess)
        } else {
            Ok(Decimal::ZERO)
        }
    }

    /// Return all outstanding escrow and drop the record. Used when an
    /// order reaches a terminal status.
    pub fn release_all(&mut self, bank: &mut dyn BankKeeper, order_id: OrderId) -> Result<Decimal> {
        let outstanding = self.outstanding(order_id);
        if outstanding > Decimal::ZERO {
            self.unlock(bank, order_id, outstanding)?;
        }
        self.close(order_id)?;
        Ok(outstanding)
    }

    /// Drop a fully drained record.
    pub fn close(&mut self, order_id: OrderId) -> Result<()> {
        match self.records.get(&order_id) {
            None => Ok(()),
            Some(r) if r.outstanding().is_zero() => {
                self.journal_record(order_id);
                self.records.remove(&order_id);
                Ok(())
            }
            Some(r) => Err(HodlexError::Internal(format!(
                "closing escrow for {order_id} with {} {} outstanding",
                r.outstanding(),
                r.asset
            ))),
        }
    }

    fn require(&self, order_id: OrderId, amount: Decimal) -> Result<&EscrowRecord> {
        let record = self.records.get(&order_id).ok_or(HodlexError::InsufficientEscrow {
            order_id,
            needed: amount,
            available: Decimal::ZERO,
        })?;
        if amount.is_sign_negative() || record.outstanding() < amount {
            return Err(HodlexError::InsufficientEscrow {
                order_id,
                needed: amount,
                available: record.outstanding(),
            });
        }
        Ok(record)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn record(&self, order_id: OrderId) -> Option<&EscrowRecord> {
        self.records.get(&order_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &EscrowRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn outstanding(&self, order_id: OrderId) -> Decimal {
        self.records
            .get(&order_id)
            .map_or(Decimal::ZERO, EscrowRecord::outstanding)
    }

    /// Sum of outstanding escrow in `asset` across all orders.
    #[must_use]
    pub fn total_outstanding(&self, asset: &str) -> Decimal {
        self.totals.get(asset).copied().unwrap_or_default()
    }

    /// Outstanding escrow in `asset` committed by `owner`.
    #[must_use]
    pub fn owner_outstanding(&self, owner: &AccountId, asset: &str) -> Decimal {
        self.owner_totals
            .get(&(owner.clone(), asset.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Assets with escrow outstanding.
    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.totals.keys().map(String::as_str)
    }

    // =================================================================
    // Beneficial ownership (best effort)
    // =================================================================

    /// Record that the seller of escrowed equity keeps the economic
    /// rights. Non-equity and buy orders are ignored. Failure is logged
    /// and reported as `false`; it never fails the order.
    pub fn register_beneficial(&self, equity: &mut dyn EquityRegistry, order: &Order) -> bool {
        if order.side != OrderSide::Sell || order.remaining().is_zero() {
            return false;
        }
        let Some(company_id) = equity.symbol_to_company_id(&order.market.base) else {
            return false;
        };
        let entry = BeneficialOwnership {
            escrow_holder: self.escrow_account.clone(),
            company_id,
            share_class: DEFAULT_SHARE_CLASS.to_string(),
            true_owner: order.owner.clone(),
            quantity: order.remaining(),
            reference_id: order.id.to_string(),
            reference_kind: BENEFICIAL_REFERENCE_KIND_ORDER.to_string(),
        };
        match equity.register_beneficial_owner(entry) {
            Ok(()) => {
                debug!(order_id = %order.id, owner = %order.owner, quantity = %order.remaining(), "beneficial owner registered");
                true
            }
            Err(err) => {
                warn!(order_id = %order.id, owner = %order.owner, error = %err, "beneficial owner registration failed");
                false
            }
        }
    }

    /// Always attempted when an equity sell order leaves the book.
    pub fn deregister_beneficial(&self, equity: &mut dyn EquityRegistry, order: &Order) {
        if order.side != OrderSide::Sell || equity.symbol_to_company_id(&order.market.base).is_none() {
            return;
        }
        if let Err(err) = equity.deregister_beneficial_owner(&order.id.to_string()) {
            warn!(order_id = %order.id, owner = %order.owner, error = %err, "beneficial owner deregistration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use hodlex_types::{CompanyId, OrderSide};

    use super::*;
    use crate::balance_manager::BalanceManager;
    use crate::equity_registry::InMemoryEquityRegistry;

    fn escrow_acct() -> AccountId {
        AccountId::new("module/trading-escrow")
    }

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn setup() -> (EscrowManager, BalanceManager) {
        let mut bank = BalanceManager::new();
        bank.deposit(&alice(), "HODL", Decimal::new(1_000, 0));
        (EscrowManager::new(escrow_acct()), bank)
    }

    #[test]
    fn lock_moves_funds_into_escrow() {
        let (mut em, mut bank) = setup();
        em.lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(400, 0)).unwrap();
        assert_eq!(bank.balance(&alice(), "HODL"), Decimal::new(600, 0));
        assert_eq!(bank.balance(&escrow_acct(), "HODL"), Decimal::new(400, 0));
        assert_eq!(em.outstanding(OrderId(1)), Decimal::new(400, 0));
        assert_eq!(em.total_outstanding("HODL"), Decimal::new(400, 0));
    }

    #[test]
    fn lock_insufficient_changes_nothing() {
        let (mut em, mut bank) = setup();
        let err = em
            .lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(2_000, 0))
            .unwrap_err();
        assert!(matches!(err, HodlexError::InsufficientBalance { .. }));
        assert!(em.record(OrderId(1)).is_none());
        assert_eq!(bank.balance(&alice(), "HODL"), Decimal::new(1_000, 0));
    }

    #[test]
    fn settle_then_release_all() {
        let (mut em, mut bank) = setup();
        let bob = AccountId::new("bob");
        em.lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(400, 0)).unwrap();
        em.settle(&mut bank, OrderId(1), &bob, Decimal::new(150, 0)).unwrap();
        assert_eq!(bank.balance(&bob, "HODL"), Decimal::new(150, 0));

        let released = em.release_all(&mut bank, OrderId(1)).unwrap();
        assert_eq!(released, Decimal::new(250, 0));
        assert_eq!(bank.balance(&alice(), "HODL"), Decimal::new(850, 0));
        assert!(em.record(OrderId(1)).is_none());
        assert_eq!(bank.balance(&escrow_acct(), "HODL"), Decimal::ZERO);
    }

    #[test]
    fn double_unlock_rejected() {
        let (mut em, mut bank) = setup();
        em.lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(100, 0)).unwrap();
        em.unlock(&mut bank, OrderId(1), Decimal::new(100, 0)).unwrap();
        let err = em.unlock(&mut bank, OrderId(1), Decimal::new(1, 0)).unwrap_err();
        assert!(matches!(err, HodlexError::InsufficientEscrow { .. }));
    }

    #[test]
    fn release_excess_keeps_requirement() {
        let (mut em, mut bank) = setup();
        em.lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(100, 0)).unwrap();
        let released = em.release_excess(&mut bank, OrderId(1), Decimal::new(60, 0)).unwrap();
        assert_eq!(released, Decimal::new(40, 0));
        assert_eq!(em.outstanding(OrderId(1)), Decimal::new(60, 0));
        assert_eq!(
            em.release_excess(&mut bank, OrderId(1), Decimal::new(60, 0)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn rollback_restores_exact_state() {
        let (mut em, mut bank) = setup();
        let bob = AccountId::new("bob");
        em.lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(100, 0)).unwrap();
        let before_record = em.record(OrderId(1)).cloned();

        em.checkpoint().unwrap();
        em.lock(&mut bank, OrderId(2), &alice(), "HODL", Decimal::new(300, 0)).unwrap();
        em.settle(&mut bank, OrderId(1), &bob, Decimal::new(40, 0)).unwrap();
        em.settle(&mut bank, OrderId(2), &bob, Decimal::new(300, 0)).unwrap();
        em.close(OrderId(2)).unwrap();
        em.rollback(&mut bank);

        assert!(!em.in_checkpoint());
        assert_eq!(em.record(OrderId(1)).cloned(), before_record);
        assert!(em.record(OrderId(2)).is_none());
        assert_eq!(bank.balance(&alice(), "HODL"), Decimal::new(900, 0));
        assert_eq!(bank.balance(&bob, "HODL"), Decimal::ZERO);
        assert_eq!(bank.balance(&escrow_acct(), "HODL"), Decimal::new(100, 0));        assert_eq!(em.total_outstanding("HODL"), Decimal::new(100, 0));
        assert_eq!(em.owner_outstanding(&alice(), "HODL"), Decimal::new(100, 0));
    }

    #[test]
    fn running_totals_follow_records() {
        let (mut em, mut bank) = setup();
        let bob = AccountId::new("bob");
        bank.deposit(&bob, "HODL", Decimal::new(500, 0));
        em.lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(100, 0)).unwrap();
        em.lock(&mut bank, OrderId(2), &bob, "HODL", Decimal::new(250, 0)).unwrap();
        em.settle(&mut bank, OrderId(1), &bob, Decimal::new(30, 0)).unwrap();
        em.unlock(&mut bank, OrderId(2), Decimal::new(50, 0)).unwrap();

        assert_eq!(em.total_outstanding("HODL"), Decimal::new(270, 0));
        assert_eq!(em.owner_outstanding(&alice(), "HODL"), Decimal::new(70, 0));
        assert_eq!(em.owner_outstanding(&bob, "HODL"), Decimal::new(200, 0));
        assert_eq!(em.assets().collect::<Vec<_>>(), vec!["HODL"]);

        em.release_all(&mut bank, OrderId(1)).unwrap();
        em.release_all(&mut bank, OrderId(2)).unwrap();
        assert_eq!(em.total_outstanding("HODL"), Decimal::ZERO);
        assert_eq!(em.owner_outstanding(&bob, "HODL"), Decimal::ZERO);
        assert!(em.assets().next().is_none());
    }

    #[test]
    fn commit_discards_journal() {
        let (mut em, mut bank) = setup();
        em.checkpoint().unwrap();
        assert!(em.checkpoint().is_err(), "checkpoints do not nest");
        em.lock(&mut bank, OrderId(1), &alice(), "HODL", Decimal::new(100, 0)).unwrap();
        em.commit();
        em.rollback(&mut bank);
        assert_eq!(em.outstanding(OrderId(1)), Decimal::new(100, 0));
    }

    #[test]
    fn beneficial_registration_for_equity_sells_only() {
        let em = EscrowManager::new(escrow_acct());
        let mut reg = InMemoryEquityRegistry::new();
        reg.list_company("APPLE", CompanyId("apple-inc".into()), Decimal::new(1_000_000, 0));

        let sell = Order::dummy_limit(7, "alice", OrderSide::Sell, Decimal::new(150, 0), Decimal::new(100, 0));
        assert!(em.register_beneficial(&mut reg, &sell));
        let entry = reg.beneficial_entry("order:7").unwrap();
        assert_eq!(entry.true_owner, alice());
        assert_eq!(entry.escrow_holder, escrow_acct());
        assert_eq!(entry.quantity, Decimal::new(100, 0));

        let buy = Order::dummy_limit(8, "bob", OrderSide::Buy, Decimal::new(150, 0), Decimal::new(100, 0));
        assert!(!em.register_beneficial(&mut reg, &buy));

        em.deregister_beneficial(&mut reg, &sell);
        assert!(reg.beneficial_entry("order:7").is_none());
        // A second attempt only logs.
        em.deregister_beneficial(&mut reg, &sell);
    }
}
