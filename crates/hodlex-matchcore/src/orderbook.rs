//! The order book for a single market lane.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Decimal>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<Decimal, PriceLevel>` -- lowest price first
//!
//! Each level orders its resting orders by sequence, so the book is
//! indexed by `(side, price, sequence)` and never looks outside its own
//! market. An auxiliary `HashMap<OrderId, (Side, Price)>` enables
//! O(log N) lookup and cancellation.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use hodlex_types::*;
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

/// Aggregated view of one price level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    pub orders: usize,
}

/// Top-of-book snapshot, best levels first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDepth {
    pub market: MarketPair,
    pub lane: Lane,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// The order book for a single `(market, lane)`.
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub market: MarketPair,
    pub lane: Lane,
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<Decimal, PriceLevel>,
    /// Fast lookup: `OrderId -> (side, price)`.
    index: HashMap<OrderId, (OrderSide, Decimal)>,
}

impl OrderBook {
    #[must_use]
    pub fn new(market: MarketPair, lane: Lane) -> Self {
        Self {
            market,
            lane,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion
    // =================================================================

    /// Rest an order at its limit price.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if self.index.contains_key(&order.id) {
            return Err(HodlexError::Internal(format!(
                "duplicate order {} in {} book",
                order.id, self.market
            )));
        }
        let Some(price) = order.price else {
            return Err(HodlexError::InvalidOrder {
                reason: format!("{} has no limit price and cannot rest", order.id),
            });
        };

        self.index.insert(order.id, (order.side, price));
        match order.side {
            OrderSide::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .insert(order),
            OrderSide::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .insert(order),
        }
        Ok(())
    }

    // =================================================================
    // Removal
    // =================================================================

    /// Remove an order by ID. Returns the removed order.
    pub fn remove(&mut self, order_id: OrderId) -> Result<Order> {
        let (side, price) = self
            .index
            .remove(&order_id)
            .ok_or(HodlexError::OrderNotFound(order_id))?;

        let order = match side {
            OrderSide::Buy => {
                let level = self
                    .bids
                    .get_mut(&Reverse(price))
                    .ok_or(HodlexError::OrderNotFound(order_id))?;
                let order = level
                    .remove(order_id)
                    .ok_or(HodlexError::OrderNotFound(order_id))?;
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                order
            }
            OrderSide::Sell => {
                let level = self
                    .asks
                    .get_mut(&price)
                    .ok_or(HodlexError::OrderNotFound(order_id))?;
                let order = level
                    .remove(order_id)
                    .ok_or(HodlexError::OrderNotFound(order_id))?;
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                order
            }
        };
        Ok(order)
    }

    // =================================================================
    // Lookup
    // =================================================================

    #[must_use]
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        let (side, price) = self.index.get(&order_id)?;
        match side {
            OrderSide::Buy => self.bids.get(&Reverse(*price))?.get(order_id),
            OrderSide::Sell => self.asks.get(price)?.get(order_id),
        }
    }

    /// Mutable access to a resting order. Callers must not change its
    /// side or price; those are part of the index key.
    pub fn get_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        let (side, price) = self.index.get(&order_id)?;
        match side {
            OrderSide::Buy => self.bids.get_mut(&Reverse(*price))?.get_mut(order_id),
            OrderSide::Sell => self.asks.get_mut(price)?.get_mut(order_id),
        }
    }

    #[must_use]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Resting orders an incoming order of side `incoming` would meet,
    /// best price first, then earliest sequence.
    pub fn best_opposite(&self, incoming: OrderSide) -> Box<dyn Iterator<Item = &Order> + '_> {
        match incoming {
            OrderSide::Buy => Box::new(self.asks.values().flat_map(PriceLevel::iter)),
            OrderSide::Sell => Box::new(self.bids.values().flat_map(PriceLevel::iter)),
        }
    }

    /// All resting orders: bids best-first, then asks best-first.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.bids
            .values()
            .flat_map(PriceLevel::iter)
            .chain(self.asks.values().flat_map(PriceLevel::iter))
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Spread = best_ask - best_bid. `None` if either side is empty.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Aggregate the best `levels` price levels on each side.
    #[must_use]
    pub fn depth(&self, levels: usize) -> BookDepth {
        let summarize = |level: &PriceLevel| DepthLevel {
            price: level.price,
            quantity: level.total_quantity(),
            orders: level.len(),
        };
        BookDepth {
            market: self.market.clone(),
            lane: self.lane,
            bids: self.bids.values().take(levels).map(summarize).collect(),
            asks: self.asks.values().take(levels).map(summarize).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use hodlex_types::*;
    use rust_decimal::Decimal;

    use super::*;

    fn book() -> OrderBook {
        OrderBook::new(MarketPair::new("APPLE", "HODL"), Lane::Whole)
    }

    fn order(id: u64, side: OrderSide, price: i64, qty: i64) -> Order {
        Order::dummy_limit(id, "alice", side, Decimal::new(price, 0), Decimal::new(qty, 0))
    }

    #[test]
    fn insert_and_query_best_bid_ask() {
        let mut book = book();
        book.insert(order(1, OrderSide::Buy, 100, 1)).unwrap();
        book.insert(order(2, OrderSide::Buy, 99, 1)).unwrap();
        book.insert(order(3, OrderSide::Sell, 101, 1)).unwrap();
        book.insert(order(4, OrderSide::Sell, 102, 1)).unwrap();

        assert_eq!(book.best_bid(), Some(Decimal::new(100, 0)));
        assert_eq!(book.best_ask(), Some(Decimal::new(101, 0)));
        assert_eq!(book.spread(), Some(Decimal::ONE));
        assert_eq!(book.order_count(), 4);
    }

    #[test]
    fn best_opposite_is_price_then_time() {
        let mut book = book();
        book.insert(order(5, OrderSide::Sell, 101, 1)).unwrap();
        book.insert(order(2, OrderSide::Sell, 100, 1)).unwrap();
        book.insert(order(7, OrderSide::Sell, 100, 1)).unwrap();
        book.insert(order(1, OrderSide::Buy, 99, 1)).unwrap();
        book.insert(order(3, OrderSide::Buy, 99, 1)).unwrap();
        book.insert(order(4, OrderSide::Buy, 98, 1)).unwrap();

        let asks: Vec<u64> = book.best_opposite(OrderSide::Buy).map(|o| o.id.0).collect();
        assert_eq!(asks, vec![2, 7, 5]);
        let bids: Vec<u64> = book.best_opposite(OrderSide::Sell).map(|o| o.id.0).collect();
        assert_eq!(bids, vec![1, 3, 4]);
    }

    #[test]
    fn remove_cleans_empty_levels() {
        let mut book = book();
        book.insert(order(1, OrderSide::Buy, 100, 1)).unwrap();
        let removed = book.remove(OrderId(1)).unwrap();
        assert_eq!(removed.id, OrderId(1));
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert!(matches!(
            book.remove(OrderId(1)),
            Err(HodlexError::OrderNotFound(_))
        ));
    }

    #[test]
    fn duplicate_insert_rejected() {
        let mut book = book();
        book.insert(order(1, OrderSide::Sell, 100, 1)).unwrap();
        assert!(book.insert(order(1, OrderSide::Sell, 100, 1)).is_err());
    }

    #[test]
    fn market_orders_cannot_rest() {
        let mut book = book();
        let o = Order::dummy_market(1, "alice", OrderSide::Buy, Decimal::ONE);
        assert!(matches!(book.insert(o), Err(HodlexError::InvalidOrder { .. })));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut book = book();
        book.insert(order(1, OrderSide::Sell, 150, 100)).unwrap();
        let o = book.get_mut(OrderId(1)).unwrap();
        o.apply_fill(Decimal::new(30, 0), Decimal::new(150, 0), o.created_at);
        assert_eq!(book.get(OrderId(1)).unwrap().remaining(), Decimal::new(70, 0));
    }

    #[test]
    fn depth_snapshot() {
        let mut book = book();
        book.insert(order(1, OrderSide::Buy, 100, 3)).unwrap();
        book.insert(order(2, OrderSide::Buy, 100, 2)).unwrap();
        book.insert(order(3, OrderSide::Buy, 99, 1)).unwrap();
        book.insert(order(4, OrderSide::Sell, 101, 4)).unwrap();

        let d = book.depth(1);
        assert_eq!(d.bids.len(), 1);
        assert_eq!(d.bids[0].quantity, Decimal::new(5, 0));
        assert_eq!(d.bids[0].orders, 2);
        assert_eq!(d.asks[0].price, Decimal::new(101, 0));
    }
}
