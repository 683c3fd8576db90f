//! Market records.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::STATS_WINDOW_SECS;
use crate::MarketPair;

/// A listed trading pair. Markets are never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub pair: MarketPair,
    /// Reference price: the last traded price, or the listing price before
    /// the first trade.
    pub last_price: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    pub volume_24h: Decimal,
    /// Start of the current statistics window.
    pub window_start: DateTime<Utc>,
    pub active: bool,
    /// Circuit-breaker state: halted while `now < halted_until`.
    pub halted_until: Option<DateTime<Utc>>,
    pub listed_at: DateTime<Utc>,
}

impl Market {
    #[must_use]
    pub fn new(pair: MarketPair, reference_price: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            pair,
            last_price: reference_price,
            high_24h: reference_price,
            low_24h: reference_price,
            volume_24h: Decimal::ZERO,
            window_start: now,
            active: true,
            halted_until: None,
            listed_at: now,
        }
    }

    #[must_use]
    pub fn is_halted(&self, now: DateTime<Utc>) -> bool {
        self.halted_until.is_some_and(|until| now < until)
    }

    /// Fold a trade into the reference price and rolling statistics.
    pub fn record_trade(&mut self, price: Decimal, quantity: Decimal, now: DateTime<Utc>) {
        if now - self.window_start >= Duration::seconds(STATS_WINDOW_SECS) {
            self.window_start = now;
            self.high_24h = price;
            self.low_24h = price;
            self.volume_24h = Decimal::ZERO;
        }
        self.last_price = price;
        self.high_24h = self.high_24h.max(price);
        self.low_24h = self.low_24h.min(price);
        self.volume_24h += quantity;
    }
}

/// Per-market listing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub base: String,
    pub quote: String,
    /// Initial reference price.
    pub reference_price: Decimal,
}

impl MarketConfig {
    #[must_use]
    pub fn pair(&self) -> MarketPair {
        MarketPair::new(self.base.clone(), self.quote.clone())
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }
}
