//! Identifiers used throughout Hodlex.
//!
//! Order, trade and strategy IDs are plain monotonically increasing
//! counters held in engine state. Replicated execution must derive the
//! same ID from the same state on every node, so nothing here draws on
//! process lifetime, randomness or wall-clock time.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Unique order identifier. Also the price-time sequence number: a
/// smaller ID always arrived earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl OrderId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The sequence number used for time priority.
    #[must_use]
    pub fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TradeId
// ---------------------------------------------------------------------------

/// Unique trade identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl TradeId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trade:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// StrategyId
// ---------------------------------------------------------------------------

/// Unique trading-strategy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StrategyId(pub u64);

impl StrategyId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strategy:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A ledger account address. User accounts and module accounts (escrow,
/// fee collector, swap reserve) share the same address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ---------------------------------------------------------------------------
// CompanyId
// ---------------------------------------------------------------------------

/// Equity registry identifier of an issuing company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CompanyId(pub String);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MarketPair
// ---------------------------------------------------------------------------

/// A trading pair (e.g., APPLE/HODL). The base is the traded asset, the
/// quote is what prices are denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketPair {
    pub base: String,
    pub quote: String,
}

impl MarketPair {
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Parse a `BASE/QUOTE` symbol.
    #[must_use]
    pub fn parse(symbol: &str) -> Option<Self> {
        let (base, quote) = symbol.split_once('/')?;
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return None;
        }
        Some(Self::new(base, quote))
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Type alias for asset identifiers (e.g., "HODL", "APPLE").
pub type Asset = String;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_next_is_monotonic() {
        let a = OrderId(7);
        assert_eq!(a.next(), OrderId(8));
        assert!(a < a.next());
        assert_eq!(a.sequence(), 7);
    }

    #[test]
    fn ids_display() {
        assert_eq!(OrderId(3).to_string(), "order:3");
        assert_eq!(TradeId(4).to_string(), "trade:4");
        assert_eq!(StrategyId(5).to_string(), "strategy:5");
        assert_eq!(AccountId::new("hodl1alice").to_string(), "hodl1alice");
    }

    #[test]
    fn market_pair_symbol() {
        let pair = MarketPair::new("APPLE", "HODL");
        assert_eq!(pair.symbol(), "APPLE/HODL");
        assert_eq!(MarketPair::parse("APPLE/HODL"), Some(pair));
    }

    #[test]
    fn market_pair_parse_rejects_garbage() {
        assert!(MarketPair::parse("APPLE").is_none());
        assert!(MarketPair::parse("/HODL").is_none());
        assert!(MarketPair::parse("A/B/C").is_none());
    }
}
