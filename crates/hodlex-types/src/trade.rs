//! Trade records.
//!
//! A [`Trade`] is the immutable record of one fill. The trade log is
//! append-only; trades are never modified after creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, MarketPair, OrderId, TradeId};

/// How the trade came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeKind {
    /// An incoming order matched a resting order.
    BookMatch,
    /// An atomic swap against the swap reserve. `market` is `from/to`,
    /// `quantity` is the input amount, `price` the realized rate and
    /// `gross_value` the output amount. The reserve is the counterparty
    /// and has no order record, so both order IDs name the trader's swap
    /// order; this is not a self-trade.
    Swap,
}

/// A single executed fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub kind: TradeKind,
    pub market: MarketPair,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer: AccountId,
    pub seller: AccountId,
    /// Executed quantity in base units.
    pub quantity: Decimal,
    /// Execution price (always the resting order's price for book matches).
    pub price: Decimal,
    /// `quantity * price` in quote units.
    pub gross_value: Decimal,
    pub buyer_fee: Decimal,
    pub seller_fee: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Total fees collected by the protocol on this fill.
    #[must_use]
    pub fn total_fees(&self) -> Decimal {
        self.buyer_fee + self.seller_fee
    }

    /// Whether the given order took part in this trade.
    #[must_use]
    pub fn involves(&self, order_id: OrderId) -> bool {
        self.buy_order_id == order_id || self.sell_order_id == order_id
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} @ {} = {} ({} <- {})",
            self.id, self.market, self.quantity, self.price, self.gross_value, self.buyer, self.seller,
        )
    }
}
