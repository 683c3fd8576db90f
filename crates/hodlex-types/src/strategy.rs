//! Programmatic trading strategies evaluated once per block.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, MarketPair, OrderSide, StrategyId};

/// Comparison operator of a trigger condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Comparison {
    #[must_use]
    pub fn holds(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Gte => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Lte => lhs <= rhs,
            Self::Eq => lhs == rhs,
        }
    }
}

/// A stateless price predicate.
///
/// Absolute conditions compare the current price against `threshold`.
/// Relative conditions compare the fractional change from `baseline`
/// (e.g. `-0.05` for a 5% drop) against `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCondition {
    /// Asset symbol whose price is observed (e.g. "APPLE").
    pub symbol: String,
    pub threshold: Decimal,
    pub comparison: Comparison,
    pub relative: bool,
    /// Captured at strategy creation when not supplied.
    pub baseline: Option<Decimal>,
}

impl TriggerCondition {
    /// Evaluate against the current price. A relative condition without a
    /// positive baseline never fires.
    #[must_use]
    pub fn evaluate(&self, current: Decimal) -> bool {
        if self.relative {
            match self.baseline {
                Some(base) if base > Decimal::ZERO => {
                    self.comparison.holds((current - base) / base, self.threshold)
                }
                _ => false,
            }
        } else {
            self.comparison.holds(current, self.threshold)
        }
    }
}

/// What kind of order an action submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Market,
    Limit,
}

/// An order template submitted when all conditions hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAction {
    pub kind: ActionKind,
    pub market: MarketPair,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Limit actions are priced at `current * (1 + price_offset)`.
    pub price_offset: Decimal,
}

/// A stored strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingStrategy {
    pub id: StrategyId,
    pub owner: AccountId,
    pub name: String,
    pub conditions: Vec<TriggerCondition>,
    pub actions: Vec<StrategyAction>,
    pub max_exposure: Decimal,
    /// Notional still available to submitted actions.
    pub remaining_exposure: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub executions: u64,
}

impl TradingStrategy {
    #[must_use]
    pub fn exposure_used(&self) -> Decimal {
        self.max_exposure - self.remaining_exposure
    }
}

/// Strategy creation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRequest {
    pub owner: AccountId,
    pub name: String,
    pub conditions: Vec<TriggerCondition>,
    pub actions: Vec<StrategyAction>,
    pub max_exposure: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(threshold: Decimal, comparison: Comparison, relative: bool, baseline: Option<Decimal>) -> TriggerCondition {
        TriggerCondition {
            symbol: "APPLE".into(),
            threshold,
            comparison,
            relative,
            baseline,
        }
    }

    #[test]
    fn absolute_condition() {
        let c = cond(Decimal::new(140, 0), Comparison::Lt, false, None);
        assert!(c.evaluate(Decimal::new(139, 0)));
        assert!(!c.evaluate(Decimal::new(140, 0)));
    }

    #[test]
    fn relative_condition_uses_baseline() {
        // fires on a drop of 5% or more from 100
        let c = cond(Decimal::new(-5, 2), Comparison::Lte, true, Some(Decimal::new(100, 0)));
        assert!(c.evaluate(Decimal::new(95, 0)));
        assert!(c.evaluate(Decimal::new(90, 0)));
        assert!(!c.evaluate(Decimal::new(96, 0)));
    }

    #[test]
    fn relative_condition_without_baseline_never_fires() {
        let c = cond(Decimal::ZERO, Comparison::Gte, true, None);
        assert!(!c.evaluate(Decimal::new(100, 0)));
        let c = cond(Decimal::ZERO, Comparison::Gte, true, Some(Decimal::ZERO));
        assert!(!c.evaluate(Decimal::new(100, 0)));
    }

    #[test]
    fn comparison_operators() {
        let one = Decimal::ONE;
        let two = Decimal::TWO;
        assert!(Comparison::Gt.holds(two, one));
        assert!(Comparison::Gte.holds(one, one));
        assert!(Comparison::Lte.holds(one, two));
        assert!(Comparison::Eq.holds(one, one));
        assert!(!Comparison::Eq.holds(one, two));
    }
}
