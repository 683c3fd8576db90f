//! Market registry.
//!
//! One [`Market`] per listed pair, keyed by pair in an ordered map so
//! iteration (and therefore the state digest) is identical on every node.
//! Markets are never removed; deactivation only blocks new orders.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hodlex_types::{HodlexError, Market, MarketConfig, MarketPair, Result};
use rust_decimal::Decimal;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: BTreeMap<MarketPair, Market>,
}

impl MarketRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List a new pair at its reference price.
    pub fn list(&mut self, config: &MarketConfig, now: DateTime<Utc>) -> Result<&Market> {
        let pair = config.pair();
        if pair.base == pair.quote {
            return Err(HodlexError::InvalidParams(format!(
                "market {} trades an asset against itself",
                config.symbol()
            )));
        }
        if config.reference_price <= Decimal::ZERO {
            return Err(HodlexError::InvalidParams(format!(
                "market {} needs a positive reference price",
                config.symbol()
            )));
        }
        if self.markets.contains_key(&pair) {
            return Err(HodlexError::MarketExists(config.symbol()));
        }
        info!(market = %pair, reference_price = %config.reference_price, "market listed");
        Ok(self
            .markets
            .entry(pair.clone())
            .or_insert_with(|| Market::new(pair, config.reference_price, now)))
    }

    pub fn get(&self, pair: &MarketPair) -> Result<&Market> {
        self.markets
            .get(pair)
            .ok_or_else(|| HodlexError::MarketNotFound(pair.symbol()))
    }

    fn get_mut(&mut self, pair: &MarketPair) -> Result<&mut Market> {
        self.markets
            .get_mut(pair)
            .ok_or_else(|| HodlexError::MarketNotFound(pair.symbol()))
    }

    #[must_use]
    pub fn contains(&self, pair: &MarketPair) -> bool {
        self.markets.contains_key(pair)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn deactivate(&mut self, pair: &MarketPair) -> Result<()> {
        self.get_mut(pair)?.active = false;
        info!(market = %pair, "market deactivated");
        Ok(())
    }

    pub fn reactivate(&mut self, pair: &MarketPair) -> Result<()> {
        self.get_mut(pair)?.active = true;
        info!(market = %pair, "market reactivated");
        Ok(())
    }

    /// Fold an executed trade into the market's price and statistics.
    pub fn record_trade(
        &mut self,
        pair: &MarketPair,
        price: Decimal,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let market = self.get_mut(pair)?;
        market.record_trade(price, quantity, now);
        debug!(market = %pair, %price, %quantity, "market stats updated");
        Ok(())
    }

    /// Unknown pairs are reported as not halted; admission rejects them
    /// separately.
    #[must_use]
    pub fn is_halted(&self, pair: &MarketPair, now: DateTime<Utc>) -> bool {
        self.markets.get(pair).is_some_and(|m| m.is_halted(now))
    }

    /// Halt `pair` until `until`.
    pub fn halt(&mut self, pair: &MarketPair, until: DateTime<Utc>) -> Result<()> {
        self.get_mut(pair)?.halted_until = Some(until);
        Ok(())
    }

    /// Clear every breaker whose cool-down has elapsed. Returns the pairs
    /// that resumed trading, in key order.
    pub fn reset_elapsed_breakers(&mut self, now: DateTime<Utc>) -> Vec<MarketPair> {
        let mut reset = Vec::new();
        for market in self.markets.values_mut() {
            if market.halted_until.is_some_and(|until| now >= until) {
                market.halted_until = None;
                reset.push(market.pair.clone());
            }
        }
        reset
    }

    /// The market quoting `symbol` in `quote`, if listed.
    #[must_use]
    pub fn quoted_in(&self, symbol: &str, quote: &str) -> Option<&Market> {
        self.markets.get(&MarketPair::new(symbol, quote))
    }
}
