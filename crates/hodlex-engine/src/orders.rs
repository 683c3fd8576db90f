//! Order placement, cancellation and expiry.
//!
//! ## Placement
//!
//! ```text
//! admit ─▶ plan_match ─▶ safeguards ─▶ ┌ checkpoint ───────────────┐ ─▶ apply
//!   │          │             │         │ lock · settle fills ·     │     books, markets,
//!   ▼          ▼             ▼         │ release residual · expire │     trades, events
//! reject    reject FOK    reject       └ rollback on any error ────┘
//! ```
//!
//! Everything before the checkpoint is read-only (a tripped circuit
//! breaker halts the market, which is the intended effect of the
//! rejection). Inside the checkpoint only escrow and bank balances move,
//! and they are journaled. Makers are settled on copies; books, markets
//! and the trade log change only after the checkpoint commits.

use hodlex_ingress::{BankKeeper, EquityRegistry, ParamStore, PriceOracle, TradingSafeguards, breaker_trip};
use hodlex_matchcore::{MatchPlan, plan_match};
use hodlex_settlement::FillSettler;
use hodlex_types::{
    AccountId, EngineEvent, HodlexError, MarketPair, Order, OrderId, OrderRequest, OrderSide, OrderStatus,
    Result, Trade,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::admission::{admit, admit_programmatic};
use crate::engine::{BookKey, TradingEngine, invariant};

/// Result of settling a plan inside the checkpoint.
struct Execution {
    makers: Vec<Order>,
    trades: Vec<Trade>,
    stale: Vec<OrderId>,
}

impl<B, E, O, P> TradingEngine<B, E, O, P>
where
    B: BankKeeper,
    E: EquityRegistry,
    O: PriceOracle,
    P: ParamStore,
{
    // =================================================================
    // Placement entry points
    // =================================================================

    /// Place a GTC limit order.
    pub fn place_limit_order(
        &mut self,
        owner: &AccountId,
        market: &MarketPair,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderId> {
        self.place_order(OrderRequest::limit(market.clone(), owner.clone(), side, quantity, price))
    }

    /// Place an immediate-or-cancel market order.
    pub fn place_market_order(
        &mut self,
        owner: &AccountId,
        market: &MarketPair,
        side: OrderSide,
        quantity: Decimal,
    ) -> Result<OrderId> {
        self.place_order(OrderRequest::market(market.clone(), owner.clone(), side, quantity))
    }

    /// Place a GTC limit order in the fractional lane.
    pub fn place_fractional_order(
        &mut self,
        owner: &AccountId,
        market: &MarketPair,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderId> {
        self.place_order(OrderRequest::fractional(market.clone(), owner.clone(), side, quantity, price))
    }

    /// Admit, match, settle and (if it has a resting lifetime) rest an
    /// order. Returns the new order's ID.
    pub fn place_order(&mut self, request: OrderRequest) -> Result<OrderId> {
        admit(&request, self.markets.get(&request.market)?, &self.params, self.ctx.time)?;
        self.place_admitted(request)
    }

    /// Place an order synthesized by a strategy.
    pub(crate) fn place_programmatic(&mut self, request: OrderRequest) -> Result<OrderId> {
        admit_programmatic(&request, self.markets.get(&request.market)?, &self.params, self.ctx.time)?;
        self.place_admitted(request)
    }

    fn place_admitted(&mut self, request: OrderRequest) -> Result<OrderId> {
        let now = self.ctx.time;
        let mut order = request.into_order(self.next_order_id, now);
        order.fee_rate = self.params.fee_rate_for(order.side);
        let key: BookKey = (order.market.clone(), order.lane());

        let plan = plan_match(self.book(&key)?, &order, now)?;
        self.check_safeguards(&order, &plan)?;
        let lock = self.lock_amount(&order, &plan)?;

        self.escrow.checkpoint()?;
        let execution = match self.execute(&key, &mut order, &plan, lock) {
            Ok(execution) => {
                self.escrow.commit();
                execution
            }
            Err(err) => {
                self.escrow.rollback(&mut self.keepers.bank);
                warn!(order_id = %order.id, owner = %order.owner, error = %err, "order rolled back");
                return Err(err);
            }
        };

        let order_id = order.id;
        let touched: Vec<OrderId> = std::iter::once(order_id)
            .chain(plan.fills.iter().map(|f| f.maker_order_id))
            .chain(plan.stale.iter().copied())
            .collect();
        self.next_order_id = order_id.next();
        self.apply(&key, order, execution);
        self.audit_touched(touched, [key.0.base.as_str(), key.0.quote.as_str()]);
        Ok(order_id)
    }

    // =================================================================
    // Pre-escrow checks
    // =================================================================

    fn check_safeguards(&mut self, order: &Order, plan: &MatchPlan) -> Result<()> {
        let market = self.markets.get(&order.market)?;
        let verdict = TradingSafeguards::new(&self.params).check_plan(
            order,
            plan,
            market,
            &self.keepers.bank,
            &self.keepers.equity,
            &self.escrow,
        );
        if let Err(err) = &verdict {
            if let Some(trip) = breaker_trip(err) {
                let until = self.ctx.time + self.params.cooldown();
                self.markets.halt(&order.market, until)?;
                warn!(
                    market = %order.market,
                    reference = %trip.reference,
                    attempted = %trip.attempted,
                    %until,
                    "circuit breaker tripped"
                );
                self.events.push(EngineEvent::CircuitBreakerTripped {
                    market: order.market.clone(),
                    reference_price: trip.reference,
                    attempted_price: trip.attempted,
                });
            }
        }
        verdict
    }

    /// Escrow the incoming order must post before settling.
    fn lock_amount(&self, order: &Order, plan: &MatchPlan) -> Result<Decimal> {
        match order.escrow_requirement() {
            Some(required) => Ok(required),
            // Market buys have no limit; post exactly what the plan spends.
            None if order.side == OrderSide::Buy => Ok(plan.gross_value + order.fee_owed(plan.gross_value)),
            None => Err(HodlexError::Internal(format!("{} has no escrow requirement", order.id))),
        }
    }

    // =================================================================
    // Inside the checkpoint
    // =================================================================

    fn execute(&mut self, key: &BookKey, order: &mut Order, plan: &MatchPlan, lock: Decimal) -> Result<Execution> {
        let now = self.ctx.time;
        let committed = order.committed_asset().clone();
        self.escrow
            .lock(&mut self.keepers.bank, order.id, &order.owner, &committed, lock)?;

        let book = self
            .books
            .get(key)
            .ok_or_else(|| HodlexError::MarketNotFound(key.0.symbol()))?;
        let mut makers = Vec::with_capacity(plan.fills.len());
        let mut trades = Vec::with_capacity(plan.fills.len());
        let mut trade_id = self.next_trade_id;

        for fill in &plan.fills {
            let mut maker = book
                .get(fill.maker_order_id)
                .cloned()
                .ok_or(HodlexError::OrderNotFound(fill.maker_order_id))?;
            let (buy, sell) = match order.side {
                OrderSide::Buy => (&mut *order, &mut maker),
                OrderSide::Sell => (&mut maker, &mut *order),
            };
            let settled = FillSettler::new(&mut self.keepers.bank, &mut self.escrow, &self.fee_collector)
                .settle(buy, sell, fill.quantity, fill.price, now)?;
            trades.push(settled.into_trade(trade_id, buy, sell, now));
            trade_id = trade_id.next();
            if maker.is_filled() {
                self.escrow.release_all(&mut self.keepers.bank, maker.id)?;
            }
            makers.push(maker);
        }

        let rests = order.time_in_force.rests() && order.price.is_some();
        if order.is_filled() || !rests {
            self.escrow.release_all(&mut self.keepers.bank, order.id)?;
        }

        for id in &plan.stale {
            self.escrow.release_all(&mut self.keepers.bank, *id)?;
        }

        Ok(Execution {
            makers,
            trades,
            stale: plan.stale.clone(),
        })
    }

    // =================================================================
    // After commit
    // =================================================================

    fn apply(&mut self, key: &BookKey, mut order: Order, execution: Execution) {
        let now = self.ctx.time;
        self.events.push(EngineEvent::OrderPlaced {
            order_id: order.id,
            owner: order.owner.clone(),
            market: order.market.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.price,
        });

        for stale_id in execution.stale {
            let mut stale = self.retire(key, stale_id);
            let released = stale.remaining();
            stale.status = OrderStatus::Expired;
            stale.updated_at = now;
            self.deregister_beneficial(&stale);
            info!(order_id = %stale.id, owner = %stale.owner, "order expired");
            self.events.push(EngineEvent::OrderExpired {
                order_id: stale.id,
                owner: stale.owner.clone(),
                market: stale.market.clone(),
                released_quantity: released,
            });
            self.archive.insert(stale.id, stale);
        }

        for maker in execution.makers {
            if maker.is_filled() {
                self.retire(key, maker.id);
                self.deregister_beneficial(&maker);
                self.archive.insert(maker.id, maker);
            } else {
                self.register_beneficial(&maker);
                let book = invariant(self.book_mut(key), "maker book vanished");
                match book.get_mut(maker.id) {
                    Some(resting) => *resting = maker,
                    None => panic!("maker {} vanished from {} book", maker.id, key.0),
                }
            }
        }

        for trade in execution.trades {
            invariant(
                self.markets.record_trade(&trade.market, trade.price, trade.quantity, now),
                "recording trade",
            );
            self.next_trade_id = trade.id.next();
            info!(
                trade_id = %trade.id,
                market = %trade.market,
                buyer = %trade.buyer,
                seller = %trade.seller,
                quantity = %trade.quantity,
                price = %trade.price,
                "trade executed"
            );
            self.events.push(EngineEvent::TradeExecuted {
                trade_id: trade.id,
                market: trade.market.clone(),
                buyer: trade.buyer.clone(),
                seller: trade.seller.clone(),
                quantity: trade.quantity,
                price: trade.price,
            });
            self.trades.push(trade);
        }

        let rests = order.time_in_force.rests() && order.price.is_some();
        if order.is_filled() {
            info!(order_id = %order.id, owner = %order.owner, "order filled on entry");
            self.archive.insert(order.id, order);
        } else if rests {
            if let Some(at) = order.expires_at {
                self.expiries.insert((at, order.id));
            }
            self.register_beneficial(&order);
            self.open.insert(order.id, key.clone());
            info!(
                order_id = %order.id,
                owner = %order.owner,
                market = %order.market,
                side = %order.side,
                remaining = %order.remaining(),
                "order resting"
            );
            let book = invariant(self.book_mut(key), "order book vanished");
            invariant(book.insert(order), "resting order");
        } else {
            let released = order.remaining();
            order.status = OrderStatus::Cancelled;
            order.updated_at = now;
            debug!(order_id = %order.id, %released, "unfilled residual cancelled");
            self.events.push(EngineEvent::OrderCancelled {
                order_id: order.id,
                owner: order.owner.clone(),
                market: order.market.clone(),
                released_quantity: released,
            });
            self.archive.insert(order.id, order);
        }
    }

    // =================================================================
    // Cancel & expire
    // =================================================================

    /// Cancel an open order on behalf of its owner and return its final
    /// record. An order whose GTD expiry has already passed is expired
    /// instead, and the expired record is returned.
    pub fn cancel_order(&mut self, owner: &AccountId, order_id: OrderId) -> Result<Order> {
        let Some(key) = self.open.get(&order_id).cloned() else {
            return Err(match self.archive.get(&order_id) {
                Some(done) => HodlexError::OrderNotCancellable {
                    order_id,
                    status: done.status,
                },
                None => HodlexError::OrderNotFound(order_id),
            });
        };
        let resting = self
            .book(&key)?
            .get(order_id)
            .ok_or(HodlexError::OrderNotFound(order_id))?;
        if &resting.owner != owner {
            return Err(HodlexError::NotOwner(owner.to_string()));
        }
        if resting.is_expired(self.ctx.time) {
            self.escrow.release_all(&mut self.keepers.bank, order_id)?;
            self.archive_expired(order_id);
            self.audit_touched([order_id], [key.0.base.as_str(), key.0.quote.as_str()]);
            return self
                .archive
                .get(&order_id)
                .cloned()
                .ok_or(HodlexError::OrderNotFound(order_id));
        }

        let released = self.escrow.release_all(&mut self.keepers.bank, order_id)?;
        let mut order = self.retire(&key, order_id);
        order.status = OrderStatus::Cancelled;
        order.updated_at = self.ctx.time;
        self.deregister_beneficial(&order);
        info!(%order_id, %owner, remaining = %order.remaining(), refunded = %released, "order cancelled");
        self.events.push(EngineEvent::OrderCancelled {
            order_id,
            owner: owner.clone(),
            market: order.market.clone(),
            released_quantity: order.remaining(),
        });
        self.audit_touched([order_id], [order.market.base.as_str(), order.market.quote.as_str()]);
        self.archive.insert(order_id, order.clone());
        Ok(order)
    }

    /// Archive a resting order whose escrow has already been refunded.
    pub(crate) fn archive_expired(&mut self, order_id: OrderId) {
        let Some(key) = self.open.get(&order_id).cloned() else {
            return;
        };
        let mut order = self.retire(&key, order_id);
        order.status = OrderStatus::Expired;
        order.updated_at = self.ctx.time;
        self.deregister_beneficial(&order);
        info!(%order_id, owner = %order.owner, "order expired");
        self.events.push(EngineEvent::OrderExpired {
            order_id,
            owner: order.owner.clone(),
            market: order.market.clone(),
            released_quantity: order.remaining(),
        });
        self.archive.insert(order_id, order);
    }

    // =================================================================
    // Book bookkeeping
    // =================================================================

    /// Remove an open order from its book and every index.
    fn retire(&mut self, key: &BookKey, order_id: OrderId) -> Order {
        self.open.remove(&order_id);
        let book = invariant(self.book_mut(key), "order book vanished");
        let order = invariant(book.remove(order_id), "removing resting order");
        if let Some(at) = order.expires_at {
            self.expiries.remove(&(at, order_id));
        }
        order
    }

    fn book_mut(&mut self, key: &BookKey) -> Result<&mut hodlex_matchcore::OrderBook> {
        self.books
            .get_mut(key)
            .ok_or_else(|| HodlexError::MarketNotFound(key.0.symbol()))
    }

    fn register_beneficial(&mut self, order: &Order) {
        self.escrow.register_beneficial(&mut self.keepers.equity, order);
    }

    fn deregister_beneficial(&mut self, order: &Order) {
        self.escrow.deregister_beneficial(&mut self.keepers.equity, order);
    }
}
