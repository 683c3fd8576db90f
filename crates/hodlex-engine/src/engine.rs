//! The trading engine: one state machine per replicated ledger.
//!
//! [`TradingEngine`] owns the market registry, the per-market order
//! books, escrow records, the trade log and stored strategies. It is
//! driven by exactly two kinds of call:
//!
//! - **block hooks** ([`TradingEngine::begin_block`]) that advance time,
//!   reload governance parameters, reset circuit breakers, sweep expired
//!   orders and run the strategy monitor;
//! - **transactions** (place, cancel, swap, strategy management) that run
//!   to completion or roll back before the next one starts.
//!
//! Every transaction ends with an escrow audit of the orders and assets
//! it touched; every block starts with a full sweep. A failed audit is a
//! bug, not bad input, and panics.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use hodlex_ingress::{BankKeeper, EquityRegistry, EscrowManager, Keepers, ParamStore, PriceOracle};
use hodlex_matchcore::{OrderBook, compute_trade_root};
use hodlex_settlement::EscrowConservation;
use hodlex_types::{
    AccountId, BlockContext, EngineEvent, EngineGenesis, HodlexError, Lane, MarketConfig, MarketPair, Order,
    OrderId, RecordDigest, Result, Trade, TradeId, TradingParams, encode_record,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::markets::MarketRegistry;
use crate::strategy_monitor::StrategyMonitor;

/// Where an open order rests.
pub(crate) type BookKey = (MarketPair, Lane);

pub struct TradingEngine<B, E, O, P> {
    pub(crate) keepers: Keepers<B, E, O, P>,
    pub(crate) params: TradingParams,
    pub(crate) ctx: BlockContext,

    pub(crate) markets: MarketRegistry,
    pub(crate) books: BTreeMap<BookKey, OrderBook>,
    /// Open order → its book.
    pub(crate) open: BTreeMap<OrderId, BookKey>,
    /// Terminal orders, read-only.
    pub(crate) archive: BTreeMap<OrderId, Order>,
    /// GTD orders by expiry.
    pub(crate) expiries: BTreeSet<(DateTime<Utc>, OrderId)>,
    pub(crate) trades: Vec<Trade>,
    pub(crate) strategies: StrategyMonitor,

    pub(crate) escrow: EscrowManager,
    pub(crate) conservation: EscrowConservation,
    pub(crate) fee_collector: AccountId,
    pub(crate) swap_reserve: AccountId,

    pub(crate) next_order_id: OrderId,
    pub(crate) next_trade_id: TradeId,
    pub(crate) events: Vec<EngineEvent>,
}

impl<B, E, O, P> TradingEngine<B, E, O, P>
where
    B: BankKeeper,
    E: EquityRegistry,
    O: PriceOracle,
    P: ParamStore,
{
    /// Build an engine from its collaborators and genesis configuration.
    pub fn new(keepers: Keepers<B, E, O, P>, genesis: &EngineGenesis, ctx: BlockContext) -> Result<Self> {
        genesis.validate()?;
        let params = keepers.params.trading_params();
        params.validate()?;

        let mut engine = Self {
            keepers,
            params,
            ctx,
            markets: MarketRegistry::new(),
            books: BTreeMap::new(),
            open: BTreeMap::new(),
            archive: BTreeMap::new(),
            expiries: BTreeSet::new(),
            trades: Vec::new(),
            strategies: StrategyMonitor::new(),
            escrow: EscrowManager::new(genesis.escrow_account.clone()),
            conservation: EscrowConservation::new(),
            fee_collector: genesis.fee_collector_account.clone(),
            swap_reserve: genesis.swap_reserve_account.clone(),
            next_order_id: OrderId(1),
            next_trade_id: TradeId(1),
            events: Vec::new(),
        };
        for config in &genesis.markets {
            engine.list_market(config)?;
        }
        info!(
            height = ctx.height,
            markets = engine.markets.len(),
            escrow = %genesis.escrow_account,
            "trading engine initialised"
        );
        Ok(engine)
    }

    // =================================================================
    // Block lifecycle
    // =================================================================

    /// Enter a new block: reload parameters, reset elapsed breakers,
    /// expire due GTD orders and evaluate strategies.
    ///
    /// Refunds for due orders are made first, under an escrow checkpoint.
    /// If one fails the block is not entered at all: time, parameters,
    /// breakers and books are left as they were.
    pub fn begin_block(&mut self, ctx: BlockContext) -> Result<()> {
        if ctx.time < self.ctx.time || ctx.height < self.ctx.height {
            return Err(HodlexError::InvalidParams(format!(
                "block {} at {} precedes block {} at {}",
                ctx.height, ctx.time, self.ctx.height, self.ctx.time
            )));
        }

        let due: Vec<OrderId> = self
            .expiries
            .iter()
            .take_while(|(at, _)| *at <= ctx.time)
            .map(|(_, id)| *id)
            .collect();
        self.escrow.checkpoint()?;
        for order_id in &due {
            if let Err(err) = self.escrow.release_all(&mut self.keepers.bank, *order_id) {
                self.escrow.rollback(&mut self.keepers.bank);
                warn!(height = ctx.height, %order_id, error = %err, "expiry refund failed, block not entered");
                return Err(err);
            }
        }
        self.escrow.commit();

        self.ctx = ctx;

        let params = self.keepers.params.trading_params();
        match params.validate() {
            Ok(()) => self.params = params,
            Err(err) => warn!(height = ctx.height, error = %err, "ignoring invalid trading params"),
        }

        for market in self.markets.reset_elapsed_breakers(ctx.time) {
            info!(%market, "circuit breaker reset");
            self.events.push(EngineEvent::CircuitBreakerReset { market });
        }

        for order_id in due {
            self.archive_expired(order_id);
        }

        self.run_strategies();
        self.audit_escrow();
        debug!(height = ctx.height, time = %ctx.time, "block started");
        Ok(())
    }

    // =================================================================
    // Markets
    // =================================================================

    /// List a new market with empty whole-unit and fractional books.
    pub fn list_market(&mut self, config: &MarketConfig) -> Result<()> {
        let pair = self.markets.list(config, self.ctx.time)?.pair.clone();
        for lane in [Lane::Whole, Lane::Fractional] {
            self.books
                .insert((pair.clone(), lane), OrderBook::new(pair.clone(), lane));
        }
        self.conservation.track(&pair.base);
        self.conservation.track(&pair.quote);
        self.events.push(EngineEvent::MarketListed {
            market: pair,
            reference_price: config.reference_price,
        });
        Ok(())
    }

    /// Stop admitting orders on `pair`. Resting orders stay cancellable.
    pub fn deactivate_market(&mut self, pair: &MarketPair) -> Result<()> {
        self.markets.deactivate(pair)?;
        self.events.push(EngineEvent::MarketDeactivated { market: pair.clone() });
        Ok(())
    }

    pub fn reactivate_market(&mut self, pair: &MarketPair) -> Result<()> {
        self.markets.reactivate(pair)?;
        self.events.push(EngineEvent::MarketReactivated { market: pair.clone() });
        Ok(())
    }

    // =================================================================
    // Prices
    // =================================================================

    /// Reference price of `symbol` in the stable unit: 1 for the stable
    /// unit itself, then the `symbol/stable` market, then the oracle.
    pub fn price_of(&self, symbol: &str) -> Result<Decimal> {
        if symbol == self.params.stable_symbol {
            return Ok(Decimal::ONE);
        }
        if let Some(market) = self.markets.quoted_in(symbol, &self.params.stable_symbol) {
            return Ok(market.last_price);
        }
        self.keepers
            .oracle
            .current_price(symbol)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| HodlexError::PriceUnavailable(symbol.to_string()))
    }

    // =================================================================
    // Events & digests
    // =================================================================

    /// Drain every event emitted since the last call.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events emitted since the last drain, without draining them.
    #[must_use]
    pub fn pending_events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// SHA-256 over the canonical encodings of every market, open order,
    /// trade and strategy, in key order.
    pub fn state_digest(&self) -> Result<RecordDigest> {
        let mut records: Vec<Vec<u8>> = Vec::new();
        for market in self.markets.iter() {
            records.push(encode_record(market)?);
        }
        for order in self.open_orders_in_id_order() {
            records.push(encode_record(order)?);
        }
        for trade in &self.trades {
            records.push(encode_record(trade)?);
        }
        for strategy in self.strategies.iter() {
            records.push(encode_record(strategy)?);
        }
        Ok(RecordDigest::of(
            b"hodlex:state:v1:",
            records.iter().map(Vec::as_slice),
        ))
    }

    /// Root over the append-only trade log.
    pub fn trade_root(&self) -> Result<RecordDigest> {
        compute_trade_root(&self.trades)
    }

    // =================================================================
    // Internal helpers
    // =================================================================

    pub(crate) fn open_orders_in_id_order(&self) -> impl Iterator<Item = &Order> {
        self.open
            .iter()
            .filter_map(|(id, key)| self.books.get(key).and_then(|book| book.get(*id)))
    }

    pub(crate) fn book(&self, key: &BookKey) -> Result<&OrderBook> {
        self.books
            .get(key)
            .ok_or_else(|| HodlexError::MarketNotFound(key.0.symbol()))
    }

    pub(crate) fn allocate_trade_id(&mut self) -> TradeId {
        let id = self.next_trade_id;
        self.next_trade_id = id.next();
        id
    }

    /// Panic if the orders and assets an operation touched no longer
    /// match escrow. Orders no longer open must hold nothing.
    pub(crate) fn audit_touched<'a>(
        &self,
        touched: impl IntoIterator<Item = OrderId>,
        assets: impl IntoIterator<Item = &'a str>,
    ) {
        let mut open = Vec::new();
        let mut closed = Vec::new();
        for order_id in touched {
            match self
                .open
                .get(&order_id)
                .and_then(|key| self.books.get(key))
                .and_then(|book| book.get(order_id))
            {
                Some(order) => open.push(order),
                None => closed.push(order_id),
            }
        }
        if let Err(err) = self
            .conservation
            .verify_orders(&self.keepers.bank, &self.escrow, open, closed, assets)
        {
            panic!("{err}");
        }
    }

    /// Panic if escrow no longer matches every open order.
    pub(crate) fn audit_escrow(&self) {
        if let Err(err) = self
            .conservation
            .verify(&self.keepers.bank, &self.escrow, self.open_orders_in_id_order())
        {
            panic!("{err}");
        }
    }
}

/// Abort on a post-commit bookkeeping failure; state can no longer be
/// trusted.
pub(crate) fn invariant<T>(result: Result<T>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{context}: {err}"),
    }
}
