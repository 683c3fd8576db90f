//! Continuous price-time priority matching.
//!
//! Matching is split into a pure planning step and an application step
//! owned by the caller. [`plan_match`] walks the opposite side of one
//! book and returns the fills an incoming order would produce without
//! touching the book, so safeguards, escrow and Fill-or-Kill checks can
//! all reject before any state changes.
//!
//! ## Rules
//!
//! - Best price first; equal prices fill in sequence order.
//! - Every fill executes at the **resting** order's price.
//! - A market order (no limit price) crosses any resting price.
//! - Expired GTD makers are skipped and reported as stale so the caller
//!   can expire them.

use chrono::{DateTime, Utc};
use hodlex_types::{AccountId, HodlexError, Order, OrderId, Result, TimeInForce};
use rust_decimal::Decimal;

use crate::OrderBook;

/// One prospective fill against a resting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFill {
    pub maker_order_id: OrderId,
    pub maker_owner: AccountId,
    /// The resting order's price.
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PlannedFill {
    #[must_use]
    pub fn gross_value(&self) -> Decimal {
        self.price * self.quantity
    }
}

/// The outcome of matching an incoming order against a book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPlan {
    pub fills: Vec<PlannedFill>,
    pub filled_quantity: Decimal,
    pub gross_value: Decimal,
    /// Unfilled quantity of the incoming order.
    pub remaining: Decimal,
    /// Expired makers encountered while walking the book.
    pub stale: Vec<OrderId>,
}

impl MatchPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Price of the last fill, which becomes the new reference price.
    #[must_use]
    pub fn last_price(&self) -> Option<Decimal> {
        self.fills.last().map(|f| f.price)
    }
}

/// Plan the fills for `incoming` against `book` at block time `now`.
///
/// Fill-or-Kill orders that the book cannot fully satisfy are rejected
/// here, before anything is mutated.
pub fn plan_match(book: &OrderBook, incoming: &Order, now: DateTime<Utc>) -> Result<MatchPlan> {
    let mut plan = MatchPlan {
        remaining: incoming.remaining(),
        ..MatchPlan::default()
    };

    for maker in book.best_opposite(incoming.side) {
        if plan.remaining.is_zero() {
            break;
        }
        if maker.is_expired(now) {
            plan.stale.push(maker.id);
            continue;
        }
        // Resting orders always carry a price; levels are sorted, so the
        // first non-crossing maker ends the walk.
        let Some(price) = maker.price else { continue };
        if !incoming.crosses(price) {
            break;
        }

        let quantity = plan.remaining.min(maker.remaining());
        plan.remaining -= quantity;
        plan.filled_quantity += quantity;
        plan.gross_value += price * quantity;
        plan.fills.push(PlannedFill {
            maker_order_id: maker.id,
            maker_owner: maker.owner.clone(),
            price,
            quantity,
        });
    }

    if incoming.time_in_force == TimeInForce::Fok && !plan.remaining.is_zero() {
        return Err(HodlexError::FillOrKillUnfillable {
            requested: incoming.remaining(),
            available: plan.filled_quantity,
        });
    }
    Ok(plan)
}

/// Quantity the book could give `incoming` right now.
#[must_use]
pub fn available_liquidity(book: &OrderBook, incoming: &Order, now: DateTime<Utc>) -> Decimal {
    book.best_opposite(incoming.side)
        .filter(|maker| !maker.is_expired(now))
        .take_while(|maker| maker.price.is_some_and(|p| incoming.crosses(p)))
        .map(Order::remaining)
        .sum()
}
