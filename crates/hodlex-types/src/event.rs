//! Structured events emitted by every mutating operation.
//!
//! Each event carries the operation kind, the acting account, the market
//! or symbols touched, quantities, the resulting price and a stable
//! reference ID for downstream indexing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, MarketPair, OrderId, OrderSide, StrategyId, TradeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    MarketListed {
        market: MarketPair,
        reference_price: Decimal,
    },
    MarketDeactivated {
        market: MarketPair,
    },
    MarketReactivated {
        market: MarketPair,
    },
    OrderPlaced {
        order_id: OrderId,
        owner: AccountId,
        market: MarketPair,
        side: OrderSide,
        quantity: Decimal,
        price: Option<Decimal>,
    },
    TradeExecuted {
        trade_id: TradeId,
        market: MarketPair,
        buyer: AccountId,
        seller: AccountId,
        quantity: Decimal,
        price: Decimal,
    },
    OrderCancelled {
        order_id: OrderId,
        owner: AccountId,
        market: MarketPair,
        /// Unfilled quantity released back to the owner.
        released_quantity: Decimal,
    },
    OrderExpired {
        order_id: OrderId,
        owner: AccountId,
        market: MarketPair,
        released_quantity: Decimal,
    },
    SwapExecuted {
        order_id: OrderId,
        trade_id: TradeId,
        trader: AccountId,
        from_symbol: String,
        to_symbol: String,
        input: Decimal,
        output: Decimal,
        rate: Decimal,
        slippage: Decimal,
    },
    CircuitBreakerTripped {
        market: MarketPair,
        reference_price: Decimal,
        attempted_price: Decimal,
    },
    CircuitBreakerReset {
        market: MarketPair,
    },
    StrategyCreated {
        strategy_id: StrategyId,
        owner: AccountId,
        name: String,
    },
    StrategyTriggered {
        strategy_id: StrategyId,
        owner: AccountId,
        orders: Vec<OrderId>,
        notional: Decimal,
    },
    StrategyDeactivated {
        strategy_id: StrategyId,
        owner: AccountId,
    },
}

impl EngineEvent {
    /// Stable operation name used as the indexed event type.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MarketListed { .. } => "market_listed",
            Self::MarketDeactivated { .. } => "market_deactivated",
            Self::MarketReactivated { .. } => "market_reactivated",
            Self::OrderPlaced { .. } => "order_placed",
            Self::TradeExecuted { .. } => "trade_executed",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::OrderExpired { .. } => "order_expired",
            Self::SwapExecuted { .. } => "swap_executed",
            Self::CircuitBreakerTripped { .. } => "circuit_breaker_tripped",
            Self::CircuitBreakerReset { .. } => "circuit_breaker_reset",
            Self::StrategyCreated { .. } => "strategy_created",
            Self::StrategyTriggered { .. } => "strategy_triggered",
            Self::StrategyDeactivated { .. } => "strategy_deactivated",
        }
    }

    /// The account on whose behalf the operation ran, if any.
    #[must_use]
    pub fn actor(&self) -> Option<&AccountId> {
        match self {
            Self::OrderPlaced { owner, .. }
            | Self::OrderCancelled { owner, .. }
            | Self::OrderExpired { owner, .. }
            | Self::StrategyCreated { owner, .. }
            | Self::StrategyTriggered { owner, .. }
            | Self::StrategyDeactivated { owner, .. } => Some(owner),
            Self::TradeExecuted { buyer, .. } => Some(buyer),
            Self::SwapExecuted { trader, .. } => Some(trader),
            Self::MarketListed { .. }
            | Self::MarketDeactivated { .. }
            | Self::MarketReactivated { .. }
            | Self::CircuitBreakerTripped { .. }
            | Self::CircuitBreakerReset { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_actor() {
        let ev = EngineEvent::OrderCancelled {
            order_id: OrderId(4),
            owner: AccountId::new("alice"),
            market: MarketPair::new("APPLE", "HODL"),
            released_quantity: Decimal::new(100, 0),
        };
        assert_eq!(ev.kind(), "order_cancelled");
        assert_eq!(ev.actor(), Some(&AccountId::new("alice")));

        let ev = EngineEvent::CircuitBreakerReset {
            market: MarketPair::new("APPLE", "HODL"),
        };
        assert_eq!(ev.kind(), "circuit_breaker_reset");
        assert!(ev.actor().is_none());
    }
}
