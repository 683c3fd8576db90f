//! Order types for the Hodlex trading core.
//!
//! An order is owned by the book while it rests and archived once it
//! reaches a terminal status. `filled_quantity` never exceeds `quantity`,
//! and `status == Filled` exactly when the two are equal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::PRICE_PRECISION;
use crate::{AccountId, Asset, MarketPair, OrderId, fee_round_up};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The kind of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
    AtomicSwap,
    Fractional,
    /// Synthesized by the strategy monitor.
    Programmatic,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
            Self::AtomicSwap => write!(f, "ATOMIC_SWAP"),
            Self::Fractional => write!(f, "FRACTIONAL"),
            Self::Programmatic => write!(f, "PROGRAMMATIC"),
        }
    }
}

/// Order lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-till-cancelled.
    Gtc,
    /// Good-till-date; requires `expires_at`.
    Gtd,
    /// Immediate-or-cancel.
    Ioc,
    /// Fill-or-kill.
    Fok,
}

impl TimeInForce {
    /// Whether an unfilled residual may rest on the book.
    #[must_use]
    pub fn rests(self) -> bool {
        matches!(self, Self::Gtc | Self::Gtd)
    }
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gtc => write!(f, "GTC"),
            Self::Gtd => write!(f, "GTD"),
            Self::Ioc => write!(f, "IOC"),
            Self::Fok => write!(f, "FOK"),
        }
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    Rejected,
}

impl OrderStatus {
    /// Terminal orders are archived and never mutated again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Expired | Self::Rejected
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Which book an order lives in. Fractional orders match only among
/// themselves so whole-unit orders never acquire non-integer fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Lane {
    Whole,
    Fractional,
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whole => write!(f, "whole"),
            Self::Fractional => write!(f, "fractional"),
        }
    }
}

/// Core order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub market: MarketPair,
    pub owner: AccountId,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
    pub quantity: Decimal,
    /// Absent for market orders.
    pub price: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub filled_quantity: Decimal,
    /// Sum of `fill_qty * fill_price` over all fills.
    pub filled_value: Decimal,
    /// Cumulative fees charged to this order.
    pub fees_paid: Decimal,
    /// Fee rate in force when the order was admitted.
    pub fee_rate: Decimal,
    pub average_price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    #[must_use]
    pub fn lane(&self) -> Lane {
        if self.kind == OrderKind::Fractional {
            Lane::Fractional
        } else {
            Lane::Whole
        }
    }

    /// The asset this order commits to escrow.
    #[must_use]
    pub fn committed_asset(&self) -> &Asset {
        match self.side {
            OrderSide::Buy => &self.market.quote,
            OrderSide::Sell => &self.market.base,
        }
    }

    /// Whether this order, as the incoming side, crosses a resting price.
    /// Orders without a limit price cross anything.
    #[must_use]
    pub fn crosses(&self, resting_price: Decimal) -> bool {
        match (self.price, self.side) {
            (None, _) => true,
            (Some(limit), OrderSide::Buy) => limit >= resting_price,
            (Some(limit), OrderSide::Sell) => limit <= resting_price,
        }
    }

    /// GTD orders expire once the block time reaches `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.time_in_force == TimeInForce::Gtd && self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Record a fill. Fees are tracked separately by settlement.
    pub fn apply_fill(&mut self, quantity: Decimal, price: Decimal, now: DateTime<Utc>) {
        debug_assert!(quantity <= self.remaining(), "overfill of {}", self.id);
        self.filled_quantity += quantity;
        self.filled_value += quantity * price;
        self.average_price = (self.filled_value / self.filled_quantity).round_dp(PRICE_PRECISION);
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = now;
    }

    /// Total fee owed once cumulative fill value reaches `cumulative_gross`.
    #[must_use]
    pub fn fee_owed(&self, cumulative_gross: Decimal) -> Decimal {
        fee_round_up(cumulative_gross * self.fee_rate)
    }

    /// Escrow a resting order must hold to complete at its limit price:
    /// the remaining base quantity for sells, and for buys the remaining
    /// notional plus the fee still owed on it. `None` for orders without
    /// a limit price, whose escrow is sized to their match plan.
    #[must_use]
    pub fn escrow_requirement(&self) -> Option<Decimal> {
        match self.side {
            OrderSide::Sell => Some(self.remaining()),
            OrderSide::Buy => {
                let price = self.price?;
                let notional = price * self.remaining();
                Some(notional + self.fee_owed(self.filled_value + notional) - self.fees_paid)
            }
        }
    }

    #[must_use]
    pub fn fill_ratio(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.filled_quantity / self.quantity
        }
    }
}

/// An order submission as received from the transaction layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub market: MarketPair,
    pub owner: AccountId,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl OrderRequest {
    #[must_use]
    pub fn limit(
        market: MarketPair,
        owner: AccountId,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            market,
            owner,
            side,
            kind: OrderKind::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity,
            price: Some(price),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn market(market: MarketPair, owner: AccountId, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            market,
            owner,
            side,
            kind: OrderKind::Market,
            time_in_force: TimeInForce::Ioc,
            quantity,
            price: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn fractional(
        market: MarketPair,
        owner: AccountId,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            kind: OrderKind::Fractional,
            ..Self::limit(market, owner, side, quantity, price)
        }
    }

    #[must_use]
    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.time_in_force = TimeInForce::Gtd;
        self.expires_at = Some(expires_at);
        self
    }

    /// Materialize the request as a fresh open order.
    #[must_use]
    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            market: self.market,
            owner: self.owner,
            side: self.side,
            kind: self.kind,
            time_in_force: self.time_in_force,
            quantity: self.quantity,
            price: self.price,
            expires_at: self.expires_at,
            filled_quantity: Decimal::ZERO,
            filled_value: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            fee_rate: Decimal::ZERO,
            average_price: Decimal::ZERO,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy_limit(id: u64, owner: &str, side: OrderSide, price: Decimal, qty: Decimal) -> Self {
        OrderRequest::limit(
            MarketPair::new("APPLE", "HODL"),
            AccountId::new(owner),
            side,
            qty,
            price,
        )
        .into_order(OrderId(id), DateTime::<Utc>::default())
    }

    pub fn dummy_market(id: u64, owner: &str, side: OrderSide, qty: Decimal) -> Self {
        OrderRequest::market(
            MarketPair::new("APPLE", "HODL"),
            AccountId::new(owner),
            side,
            qty,
        )
        .into_order(OrderId(id), DateTime::<Utc>::default())
    }
}
