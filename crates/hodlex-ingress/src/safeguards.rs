//! Trading safeguards: the hard gate between a match plan and escrow.
//!
//! Three checks, run in this order and short-circuiting on the first
//! failure, all read-only:
//!
//! 1. **Wash trade**: no fill may pair an owner with itself.
//! 2. **Circuit breaker**: no fill may move the reference price by more
//!    than the governance threshold.
//! 3. **Concentration**: a buyer of a registered equity may not end up
//!    holding more than the ceiling fraction of outstanding shares. For
//!    an incoming sell the buyers are the resting bids it fills.
//!
//! Tripping the breaker is reported as [`BreakerTrip`] inside the error
//! path so the caller can halt the market.

use std::collections::BTreeMap;

use hodlex_matchcore::MatchPlan;
use hodlex_types::{AccountId, HodlexError, Market, Order, OrderSide, Result, TradingParams};
use rust_decimal::Decimal;
use tracing::warn;

use crate::escrow::EscrowManager;
use crate::keepers::{BankKeeper, EquityRegistry};

/// Price move that tripped a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerTrip {
    pub reference: Decimal,
    pub attempted: Decimal,
}

/// Stateless gate configured from the current block's parameters.
#[derive(Debug, Clone)]
pub struct TradingSafeguards<'a> {
    params: &'a TradingParams,
}

impl<'a> TradingSafeguards<'a> {
    #[must_use]
    pub fn new(params: &'a TradingParams) -> Self {
        Self { params }
    }

    /// Run all checks for an incoming order's plan.
    pub fn check_plan(
        &self,
        incoming: &Order,
        plan: &MatchPlan,
        market: &Market,
        bank: &dyn BankKeeper,
        equity: &dyn EquityRegistry,
        escrow: &EscrowManager,
    ) -> Result<()> {
        Self::check_wash(incoming, plan)?;
        for fill in &plan.fills {
            self.check_circuit_breaker(market, fill.price)?;
        }
        for (buyer, quantity) in Self::buyers(incoming, plan) {
            self.check_concentration(buyer, &market.pair.base, quantity, bank, equity, escrow)?;
        }
        Ok(())
    }

    /// Base quantity each buyer in the plan receives, in account order.
    fn buyers<'p>(incoming: &'p Order, plan: &'p MatchPlan) -> BTreeMap<&'p AccountId, Decimal> {
        let mut buyers = BTreeMap::new();
        match incoming.side {
            OrderSide::Buy if !plan.filled_quantity.is_zero() => {
                buyers.insert(&incoming.owner, plan.filled_quantity);
            }
            OrderSide::Buy => {}
            OrderSide::Sell => {
                for fill in &plan.fills {
                    *buyers.entry(&fill.maker_owner).or_insert(Decimal::ZERO) += fill.quantity;
                }
            }
        }
        buyers
    }

    /// Reject any fill where buyer and seller are the same account.
    pub fn check_wash(incoming: &Order, plan: &MatchPlan) -> Result<()> {
        if plan.fills.iter().any(|f| f.maker_owner == incoming.owner) {
            warn!(owner = %incoming.owner, order_id = %incoming.id, "wash trade rejected");
            return Err(HodlexError::WashTrade {
                owner: incoming.owner.to_string(),
            });
        }
        Ok(())
    }

    /// Fractional move of `price` away from the market's reference.
    #[must_use]
    pub fn price_move(reference: Decimal, price: Decimal) -> Decimal {
        if reference <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (price - reference).abs() / reference
    }

    pub fn check_circuit_breaker(&self, market: &Market, price: Decimal) -> Result<()> {
        let moved = Self::price_move(market.last_price, price);
        if moved > self.params.circuit_breaker_threshold {
            return Err(HodlexError::CircuitBreakerTripped {
                market: market.pair.symbol(),
                price,
                reference: market.last_price,
            });
        }
        Ok(())
    }

    /// Project `holder`'s stake in `symbol` after receiving `incoming`
    /// more shares. Non-equities pass.
    pub fn check_concentration(
        &self,
        holder: &AccountId,
        symbol: &str,
        incoming: Decimal,
        bank: &dyn BankKeeper,
        equity: &dyn EquityRegistry,
        escrow: &EscrowManager,
    ) -> Result<()> {
        let Some(company) = equity.symbol_to_company_id(symbol) else {
            return Ok(());
        };
        let outstanding = equity.outstanding_shares(&company).unwrap_or_default();
        if outstanding <= Decimal::ZERO {
            return Ok(());
        }
        let held = bank.balance(holder, symbol) + escrow.owner_outstanding(holder, symbol);
        let projected = (held + incoming) / outstanding;
        if projected > self.params.concentration_ceiling {
            warn!(%holder, symbol, %projected, "concentration ceiling exceeded");
            return Err(HodlexError::ConcentrationLimitExceeded {
                holder: holder.to_string(),
                symbol: symbol.to_string(),
                projected,
                ceiling: self.params.concentration_ceiling,
            });
        }
        Ok(())
    }
}

/// Extract the trip details from a breaker error.
#[must_use]
pub fn breaker_trip(err: &HodlexError) -> Option<BreakerTrip> {
    match err {
        HodlexError::CircuitBreakerTripped {
            price, reference, ..
        } => Some(BreakerTrip {
            reference: *reference,
            attempted: *price,
        }),
        _ => None,
    }
}
