//! A single price level in the order book.
//!
//! Orders at the same price are keyed by their sequence number, so
//! iteration order is time priority and removal of any order is
//! O(log n) instead of a linear scan.

use std::collections::BTreeMap;

use hodlex_types::{Order, OrderId};
use rust_decimal::Decimal;

/// A single price level containing all resting orders at that price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price at this level.
    pub price: Decimal,
    /// Orders by sequence (first = oldest = highest priority).
    orders: BTreeMap<u64, Order>,
}

impl PriceLevel {
    /// Create a new empty price level.
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: BTreeMap::new(),
        }
    }

    /// Add an order. Its sequence places it in time priority.
    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.id.sequence(), order);
    }

    /// Remove a specific order by ID.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        self.orders.remove(&order_id.sequence())
    }

    #[must_use]
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id.sequence())
    }

    pub fn get_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&order_id.sequence())
    }

    /// Peek at the highest-priority order.
    #[must_use]
    pub fn front(&self) -> Option<&Order> {
        self.orders.values().next()
    }

    /// Orders in time priority.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Total remaining quantity across all orders at this level.
    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.orders.values().map(Order::remaining).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }
}
