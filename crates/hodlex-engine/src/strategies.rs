//! Strategy management and per-block execution.

use hodlex_ingress::{BankKeeper, EquityRegistry, ParamStore, PriceOracle};
use hodlex_types::{AccountId, EngineEvent, HodlexError, OrderId, Result, StrategyId, StrategyRequest};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::engine::TradingEngine;
use crate::strategy_monitor::{action_order, conditions_hold};

impl<B, E, O, P> TradingEngine<B, E, O, P>
where
    B: BankKeeper,
    E: EquityRegistry,
    O: PriceOracle,
    P: ParamStore,
{
    pub fn create_strategy(&mut self, request: StrategyRequest) -> Result<StrategyId> {
        let owner = request.owner.clone();
        let name = request.name.clone();
        let now = self.ctx.time;
        // Moved out so the price closure can borrow the engine.
        let mut monitor = std::mem::take(&mut self.strategies);
        let created = monitor.create(request, |symbol: &str| self.price_of(symbol).ok(), now);
        self.strategies = monitor;
        let id = created?;
        info!(strategy_id = %id, %owner, %name, "strategy created");
        self.events.push(EngineEvent::StrategyCreated {
            strategy_id: id,
            owner,
            name,
        });
        Ok(id)
    }

    pub fn deactivate_strategy(&mut self, owner: &AccountId, id: StrategyId) -> Result<()> {
        self.strategies.deactivate(owner, id)?;
        info!(strategy_id = %id, %owner, "strategy deactivated");
        self.events.push(EngineEvent::StrategyDeactivated {
            strategy_id: id,
            owner: owner.clone(),
        });
        Ok(())
    }

    /// Evaluate one strategy now, on its owner's request. Returns the
    /// orders it submitted; empty when its conditions do not hold.
    pub fn execute_strategy(&mut self, owner: &AccountId, id: StrategyId) -> Result<Vec<OrderId>> {
        let strategy = self.strategies.owned(owner, id)?;
        if !strategy.active {
            return Err(HodlexError::InvalidStrategy {
                reason: format!("{id} is inactive"),
            });
        }
        if !conditions_hold(strategy, |s| self.price_of(s).ok()) {
            return Ok(Vec::new());
        }
        self.fire_strategy(id)
    }

    /// Block hook: fire every active strategy whose conditions hold.
    pub(crate) fn run_strategies(&mut self) {
        let due = self.strategies.due(|s| self.price_of(s).ok());
        for id in due {
            if let Err(err) = self.fire_strategy(id) {
                warn!(strategy_id = %id, error = %err, "strategy evaluation failed");
            }
        }
    }

    /// Submit a strategy's actions within its remaining exposure.
    fn fire_strategy(&mut self, id: StrategyId) -> Result<Vec<OrderId>> {
        let strategy = self
            .strategies
            .get(id)
            .cloned()
            .ok_or(HodlexError::StrategyNotFound(id))?;

        let mut remaining = strategy.remaining_exposure;
        let mut submitted = Vec::new();
        let mut notional_total = Decimal::ZERO;
        for action in &strategy.actions {
            let current = match self.markets.get(&action.market) {
                Ok(market) => market.last_price,
                Err(err) => {
                    warn!(strategy_id = %id, market = %action.market, error = %err, "strategy action skipped");
                    continue;
                }
            };
            let (request, notional) = action_order(action, &strategy.owner, current);
            if notional > remaining {
                warn!(strategy_id = %id, %notional, %remaining, "strategy action exceeds exposure budget");
                continue;
            }
            match self.place_programmatic(request) {
                Ok(order_id) => {
                    remaining -= notional;
                    notional_total += notional;
                    submitted.push(order_id);
                }
                Err(err) => {
                    warn!(strategy_id = %id, market = %action.market, error = %err, "strategy order rejected");
                }
            }
        }

        let record = self.strategies.get_mut(id)?;
        record.remaining_exposure = remaining;
        if !submitted.is_empty() {
            record.executions += 1;
            info!(strategy_id = %id, orders = submitted.len(), notional = %notional_total, "strategy triggered");
            self.events.push(EngineEvent::StrategyTriggered {
                strategy_id: id,
                owner: strategy.owner.clone(),
                orders: submitted.clone(),
                notional: notional_total,
            });
        }
        let record = self.strategies.get_mut(id)?;
        if record.remaining_exposure <= Decimal::ZERO && record.active {
            record.active = false;
            info!(strategy_id = %id, "strategy exposure exhausted");
            self.events.push(EngineEvent::StrategyDeactivated {
                strategy_id: id,
                owner: strategy.owner,
            });
        }
        Ok(submitted)
    }
}
