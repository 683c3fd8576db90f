//! Escrow conservation invariant checker.
//!
//! ```text
//! ∀ open order: escrow(order) == requirement(order)
//! ∀ asset:      bank(escrow_account, asset) == Σ escrow(order in asset)
//! ```
//!
//! [`EscrowConservation::verify_orders`] checks the orders one
//! transaction touched and the assets it moved, and runs after every
//! mutating operation. [`EscrowConservation::verify`] sweeps every open
//! order and record, and runs once per block.
//!
//! A mismatch means funds were double-released, leaked, or never locked.
//! The engine treats a failure here as a bug and halts.

use std::collections::{BTreeMap, BTreeSet};

use hodlex_ingress::{BankKeeper, EscrowManager};
use hodlex_types::{Asset, HodlexError, Order, OrderId, Result};
use rust_decimal::Decimal;

/// Tracks which assets can ever sit in escrow and audits them.
#[derive(Debug, Clone, Default)]
pub struct EscrowConservation {
    assets: BTreeSet<Asset>,
}

impl EscrowConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include `asset` in every future sweep.
    pub fn track(&mut self, asset: &str) {
        if !self.assets.contains(asset) {
            self.assets.insert(asset.to_string());
        }
    }

    pub fn tracked_assets(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(String::as_str)
    }

    /// Audit the orders and assets one operation touched: each open order
    /// holds exactly its requirement, each closed order holds nothing, and
    /// the escrow account's balance of each asset matches what is owed.
    ///
    /// # Errors
    /// [`HodlexError::Internal`] describing the first mismatch found.
    pub fn verify_orders<'o, 'a>(
        &self,
        bank: &dyn BankKeeper,
        escrow: &EscrowManager,
        open: impl IntoIterator<Item = &'o Order>,
        closed: impl IntoIterator<Item = OrderId>,
        assets: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for order in open {
            check_order(escrow, order)?;
        }
        for order_id in closed {
            if let Some(record) = escrow.record(order_id) {
                return Err(violation(format!(
                    "escrow for {order_id} holds {} {} with no open order",
                    record.outstanding(),
                    record.asset
                )));
            }
        }
        for asset in assets {
            check_asset(bank, escrow, asset)?;
        }
        Ok(())
    }

    /// Audit escrow against every open order.
    ///
    /// # Errors
    /// [`HodlexError::Internal`] describing the first mismatch found.
    pub fn verify<'o>(
        &self,
        bank: &dyn BankKeeper,
        escrow: &EscrowManager,
        open_orders: impl IntoIterator<Item = &'o Order>,
    ) -> Result<()> {
        let mut expected: BTreeMap<OrderId, &Order> = BTreeMap::new();
        for order in open_orders {
            expected.insert(order.id, order);
        }
        for order in expected.values() {
            check_order(escrow, order)?;
        }

        let mut recorded: BTreeMap<&str, Decimal> = BTreeMap::new();
        for record in escrow.records() {
            if !expected.contains_key(&record.order_id) {
                return Err(violation(format!(
                    "escrow for {} holds {} {} with no open order",
                    record.order_id,
                    record.outstanding(),
                    record.asset
                )));
            }
            *recorded.entry(record.asset.as_str()).or_default() += record.outstanding();
        }

        let assets: BTreeSet<&str> = self
            .tracked_assets()
            .chain(escrow.assets())
            .chain(recorded.keys().copied())
            .collect();
        for asset in assets {
            let summed = recorded.get(asset).copied().unwrap_or_default();
            if summed != escrow.total_outstanding(asset) {
                return Err(violation(format!(
                    "records sum to {summed} {asset}, running total is {}",
                    escrow.total_outstanding(asset)
                )));
            }
            check_asset(bank, escrow, asset)?;
        }
        Ok(())
    }
}

fn check_order(escrow: &EscrowManager, order: &Order) -> Result<()> {
    let Some(record) = escrow.record(order.id) else {
        return Err(violation(format!("open {} has no escrow", order.id)));
    };
    if record.owner != order.owner || &record.asset != order.committed_asset() {
        return Err(violation(format!(
            "escrow for {} holds {} of {}, order commits {} of {}",
            order.id,
            record.asset,
            record.owner,
            order.committed_asset(),
            order.owner
        )));
    }
    let Some(required) = order.escrow_requirement() else {
        return Err(violation(format!("open {} has no limit price", order.id)));
    };
    if record.outstanding() != required {
        return Err(violation(format!(
            "escrow for {} is {} {}, requirement is {}",
            order.id,
            record.outstanding(),
            record.asset,
            required
        )));
    }
    Ok(())
}

fn check_asset(bank: &dyn BankKeeper, escrow: &EscrowManager, asset: &str) -> Result<()> {
    let held = bank.balance(escrow.escrow_account(), asset);
    let owed = escrow.total_outstanding(asset);
    if held != owed {
        return Err(violation(format!(
            "escrow account holds {held} {asset}, orders are owed {owed}"
        )));
    }
    Ok(())
}

fn violation(reason: String) -> HodlexError {
    HodlexError::Internal(format!("escrow conservation violated: {reason}"))
}

/// Sum of what open orders commit, per asset.
#[must_use]
pub fn committed_by_asset<'o>(open_orders: impl IntoIterator<Item = &'o Order>) -> BTreeMap<Asset, Decimal> {
    let mut totals: BTreeMap<Asset, Decimal> = BTreeMap::new();
    for order in open_orders {
        if let Some(required) = order.escrow_requirement() {
            *totals.entry(order.committed_asset().to_string()).or_default() += required;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use hodlex_ingress::BalanceManager;
    use hodlex_types::{AccountId, OrderSide};

    use super::*;

    const NO_ORDERS: [&Order; 0] = [];
    const NO_IDS: [OrderId; 0] = [];
    const NO_ASSETS: [&str; 0] = [];

    fn d(v: i64) -> Decimal {
        Decimal::new(v, 0)
    }

    fn setup() -> (BalanceManager, EscrowManager, Vec<Order>, EscrowConservation) {
        let mut bank = BalanceManager::new();
        bank.deposit(&AccountId::new("alice"), "APPLE", d(100));
        bank.deposit(&AccountId::new("bob"), "HODL", d(10_000));
        let mut escrow = EscrowManager::new(AccountId::new("module/trading-escrow"));
        let sell = Order::dummy_limit(1, "alice", OrderSide::Sell, d(150), d(40));
        let buy = Order::dummy_limit(2, "bob", OrderSide::Buy, d(140), d(10));
        for o in [&sell, &buy] {
            escrow
                .lock(&mut bank, o.id, &o.owner, o.committed_asset(), o.escrow_requirement().unwrap())
                .unwrap();
        }
        let mut cons = EscrowConservation::new();
        cons.track("APPLE");
        cons.track("HODL");
        (bank, escrow, vec![sell, buy], cons)
    }

    #[test]
    fn balanced_escrow_passes() {
        let (bank, escrow, orders, cons) = setup();
        assert!(cons.verify(&bank, &escrow, &orders).is_ok());
        let totals = committed_by_asset(&orders);
        assert_eq!(totals["APPLE"], d(40));
        assert_eq!(totals["HODL"], d(1_400));
    }

    #[test]
    fn over_release_detected() {
        let (mut bank, mut escrow, orders, cons) = setup();
        escrow.unlock(&mut bank, OrderId(1), d(5)).unwrap();
        let err = cons.verify(&bank, &escrow, &orders).unwrap_err();
        assert!(matches!(err, HodlexError::Internal(_)));
    }

    #[test]
    fn orphan_record_detected() {
        let (bank, escrow, orders, cons) = setup();
        assert!(cons.verify(&bank, &escrow, &orders[..1]).is_err());
    }

    #[test]
    fn stray_funds_in_escrow_account_detected() {
        let (mut bank, escrow, orders, cons) = setup();
        bank.deposit(escrow.escrow_account(), "HODL", Decimal::new(1, 8));
        assert!(cons.verify(&bank, &escrow, &orders).is_err());
    }

    #[test]
    fn touched_orders_checked_without_full_sweep() {
        let (mut bank, mut escrow, orders, cons) = setup();
        assert!(cons
            .verify_orders(&bank, &escrow, &orders[..1], NO_IDS, ["APPLE"])
            .is_ok());

        // A closed order must not keep a record.
        assert!(cons
            .verify_orders(&bank, &escrow, NO_ORDERS, [OrderId(2)], NO_ASSETS)
            .is_err());

        escrow.unlock(&mut bank, OrderId(2), d(5)).unwrap();
        // Order 1 and APPLE are untouched and still balance.
        assert!(cons
            .verify_orders(&bank, &escrow, &orders[..1], NO_IDS, ["APPLE"])
            .is_ok());
        assert!(cons
            .verify_orders(&bank, &escrow, &orders[1..], NO_IDS, ["HODL"])
            .is_err());
    }

    #[test]
    fn stray_funds_seen_by_scoped_audit() {
        let (mut bank, escrow, orders, cons) = setup();
        bank.deposit(escrow.escrow_account(), "HODL", Decimal::new(1, 8));
        assert!(cons
            .verify_orders(&bank, &escrow, &orders, NO_IDS, ["HODL"])
            .is_err());
    }

    #[test]
    fn missing_escrow_detected() {
        let (bank, escrow, mut orders, cons) = setup();
        orders.push(Order::dummy_limit(3, "carol", OrderSide::Sell, d(151), d(1)));
        assert!(cons.verify(&bank, &escrow, &orders).is_err());
    }
}
