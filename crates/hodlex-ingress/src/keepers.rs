//! Capability traits for the collaborators the trading core consumes.
//!
//! Balance custody, the equity registry, price feeds and governance
//! parameters live outside the core. Each is reached through one narrow
//! trait handed to the engine at construction time; calls are
//! synchronous and immediately visible to later calls in the same
//! transaction.

use std::collections::BTreeMap;

use hodlex_types::{AccountId, BeneficialOwnership, CompanyId, Result, TradingParams};
use rust_decimal::Decimal;

/// Fungible balance ledger.
pub trait BankKeeper {
    /// Spendable balance of `asset` held by `account`.
    fn balance(&self, account: &AccountId, asset: &str) -> Decimal;

    /// Move `amount` between accounts. Fails without side effects if
    /// `from` holds less than `amount`.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, asset: &str, amount: Decimal) -> Result<()>;

    /// Create new units (stable-unit module only).
    fn mint(&mut self, to: &AccountId, asset: &str, amount: Decimal) -> Result<()>;

    /// Destroy units (stable-unit module only).
    fn burn(&mut self, from: &AccountId, asset: &str, amount: Decimal) -> Result<()>;

    /// Sum of all balances of `asset`.
    fn total_supply(&self, asset: &str) -> Decimal;
}

/// Share-ownership records and beneficial-owner bookkeeping.
pub trait EquityRegistry {
    /// `None` for assets that are not registered equities.
    fn symbol_to_company_id(&self, symbol: &str) -> Option<CompanyId>;

    /// Total outstanding shares of the company.
    fn outstanding_shares(&self, company: &CompanyId) -> Option<Decimal>;

    fn register_beneficial_owner(&mut self, entry: BeneficialOwnership) -> Result<()>;

    fn deregister_beneficial_owner(&mut self, reference_id: &str) -> Result<()>;
}

/// External reference prices.
pub trait PriceOracle {
    /// Current price of `symbol` in the stable unit.
    fn current_price(&self, symbol: &str) -> Option<Decimal>;
}

/// Governance parameter storage.
pub trait ParamStore {
    fn trading_params(&self) -> TradingParams;
}

// ---------------------------------------------------------------------------
// Simple implementations
// ---------------------------------------------------------------------------

/// A fixed price table.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    prices: BTreeMap<String, Decimal>,
}

impl StaticOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn set_price(&mut self, symbol: &str, price: Decimal) {
        self.prices.insert(symbol.to_string(), price);
    }
}

impl PriceOracle for StaticOracle {
    fn current_price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }
}

/// Parameters held in memory; governance swaps them between blocks.
#[derive(Debug, Clone, Default)]
pub struct FixedParams {
    params: TradingParams,
}

impl FixedParams {
    #[must_use]
    pub fn new(params: TradingParams) -> Self {
        Self { params }
    }

    pub fn set(&mut self, params: TradingParams) {
        self.params = params;
    }
}

impl ParamStore for FixedParams {
    fn trading_params(&self) -> TradingParams {
        self.params.clone()
    }
}

/// The full set of collaborators handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct Keepers<B, E, O, P> {
    pub bank: B,
    pub equity: E,
    pub oracle: O,
    pub params: P,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_oracle_lookup() {
        let oracle = StaticOracle::new().with_price("APPLE", Decimal::new(150, 0));
        assert_eq!(oracle.current_price("APPLE"), Some(Decimal::new(150, 0)));
        assert_eq!(oracle.current_price("GHOST"), None);
    }

    #[test]
    fn fixed_params_hot_swap() {
        let mut store = FixedParams::default();
        assert_eq!(store.trading_params(), TradingParams::default());
        let tighter = TradingParams {
            circuit_breaker_threshold: Decimal::new(5, 2),
            ..TradingParams::default()
        };
        store.set(tighter.clone());
        assert_eq!(store.trading_params(), tighter);
    }
}
