//! Strategy storage and evaluation.
//!
//! The monitor owns every [`TradingStrategy`] and decides which ones are
//! due. Turning a due strategy's actions into orders is done by the
//! engine, which submits them through the ordinary placement path.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hodlex_types::constants::PRICE_PRECISION;
use hodlex_types::{
    AccountId, ActionKind, HodlexError, OrderKind, OrderRequest, Result, StrategyAction, StrategyId, StrategyRequest,
    TradingStrategy,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct StrategyMonitor {
    strategies: BTreeMap<StrategyId, TradingStrategy>,
    next_id: StrategyId,
}

impl Default for StrategyMonitor {
    fn default() -> Self {
        Self {
            strategies: BTreeMap::new(),
            next_id: StrategyId(1),
        }
    }
}

impl StrategyMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a strategy. Relative conditions without a
    /// baseline capture the current price of their symbol.
    pub fn create(
        &mut self,
        request: StrategyRequest,
        price_of: impl Fn(&str) -> Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<StrategyId> {
        validate(&request)?;
        let mut conditions = request.conditions;
        for condition in conditions.iter_mut().filter(|c| c.relative && c.baseline.is_none()) {
            let baseline = price_of(&condition.symbol)
                .ok_or_else(|| HodlexError::PriceUnavailable(condition.symbol.clone()))?;
            condition.baseline = Some(baseline);
        }

        let id = self.next_id;
        self.next_id = id.next();
        self.strategies.insert(
            id,
            TradingStrategy {
                id,
                owner: request.owner,
                name: request.name,
                conditions,
                actions: request.actions,
                max_exposure: request.max_exposure,
                remaining_exposure: request.max_exposure,
                active: true,
                created_at: now,
                executions: 0,
            },
        );
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: StrategyId) -> Option<&TradingStrategy> {
        self.strategies.get(&id)
    }

    pub fn get_mut(&mut self, id: StrategyId) -> Result<&mut TradingStrategy> {
        self.strategies
            .get_mut(&id)
            .ok_or(HodlexError::StrategyNotFound(id))
    }

    /// Look up a strategy on behalf of `owner`.
    pub fn owned(&self, owner: &AccountId, id: StrategyId) -> Result<&TradingStrategy> {
        let strategy = self.strategies.get(&id).ok_or(HodlexError::StrategyNotFound(id))?;
        if &strategy.owner != owner {
            return Err(HodlexError::NotOwner(owner.to_string()));
        }
        Ok(strategy)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradingStrategy> {
        self.strategies.values()
    }

    pub fn owned_by<'a>(&'a self, owner: &'a AccountId) -> impl Iterator<Item = &'a TradingStrategy> {
        self.strategies.values().filter(move |s| &s.owner == owner)
    }

    /// Stop a strategy at its owner's request.
    pub fn deactivate(&mut self, owner: &AccountId, id: StrategyId) -> Result<()> {
        if !self.owned(owner, id)?.active {
            return Err(HodlexError::InvalidStrategy {
                reason: format!("{id} is already inactive"),
            });
        }
        self.get_mut(id)?.active = false;
        Ok(())
    }

    /// Active strategies whose conditions all hold at the given prices,
    /// in ID order.
    pub fn due(&self, price_of: impl Fn(&str) -> Option<Decimal>) -> Vec<StrategyId> {
        self.strategies
            .values()
            .filter(|s| s.active && conditions_hold(s, &price_of))
            .map(|s| s.id)
            .collect()
    }
}

/// Whether every condition holds. A condition whose symbol has no price
/// does not hold.
pub fn conditions_hold(strategy: &TradingStrategy, price_of: impl Fn(&str) -> Option<Decimal>) -> bool {
    strategy
        .conditions
        .iter()
        .all(|c| price_of(&c.symbol).is_some_and(|price| c.evaluate(price)))
}

/// The order an action submits at `current` price, with its notional.
/// Strategy orders carry [`OrderKind::Programmatic`]; limit actions rest
/// GTC at `current × (1 + price_offset)`, market actions execute IOC.
pub fn action_order(action: &StrategyAction, owner: &AccountId, current: Decimal) -> (OrderRequest, Decimal) {
    let (request, notional) = match action.kind {
        ActionKind::Market => (
            OrderRequest::market(action.market.clone(), owner.clone(), action.side, action.quantity),
            action.quantity * current,
        ),
        ActionKind::Limit => {
            let price = (current * (Decimal::ONE + action.price_offset)).round_dp(PRICE_PRECISION);
            (
                OrderRequest::limit(action.market.clone(), owner.clone(), action.side, action.quantity, price),
                action.quantity * price,
            )
        }
    };
    (
        OrderRequest {
            kind: OrderKind::Programmatic,
            ..request
        },
        notional,
    )
}

fn validate(request: &StrategyRequest) -> Result<()> {
    let fail = |reason: String| Err(HodlexError::InvalidStrategy { reason });
    if request.name.trim().is_empty() {
        return fail("name must not be empty".into());
    }
    if request.conditions.is_empty() {
        return fail("at least one trigger condition is required".into());
    }
    if request.actions.is_empty() {
        return fail("at least one action is required".into());
    }
    if request.max_exposure <= Decimal::ZERO {
        return fail(format!("max exposure must be positive, got {}", request.max_exposure));
    }
    for action in &request.actions {
        if action.quantity <= Decimal::ZERO {
            return fail(format!("action quantity must be positive, got {}", action.quantity));
        }
        if action.kind == ActionKind::Limit && action.price_offset <= -Decimal::ONE {
            return fail(format!("price offset {} leaves no positive price", action.price_offset));
        }
    }
    Ok(())
}
