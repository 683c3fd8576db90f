//! Read-only queries.

use hodlex_ingress::{BankKeeper, EquityRegistry, EscrowManager, Keepers, ParamStore, PriceOracle};
use hodlex_matchcore::BookDepth;
use hodlex_types::{
    AccountId, BlockContext, Lane, Market, MarketPair, Order, OrderId, Result, StrategyId, Trade, TradingParams,
    TradingStrategy,
};

use crate::engine::TradingEngine;

impl<B, E, O, P> TradingEngine<B, E, O, P>
where
    B: BankKeeper,
    E: EquityRegistry,
    O: PriceOracle,
    P: ParamStore,
{
    /// An order by ID, open or archived.
    #[must_use]
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        match self.open.get(&order_id) {
            Some(key) => self.books.get(key).and_then(|book| book.get(order_id)),
            None => self.archive.get(&order_id),
        }
    }

    /// Every open order of `owner`, in ID order.
    #[must_use]
    pub fn open_orders(&self, owner: &AccountId) -> Vec<&Order> {
        self.open_orders_in_id_order()
            .filter(|o| &o.owner == owner)
            .collect()
    }

    pub fn market(&self, pair: &MarketPair) -> Result<&Market> {
        self.markets.get(pair)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.iter()
    }

    /// Depth snapshot of one lane of a market's book.
    pub fn order_book(&self, pair: &MarketPair, lane: Lane, levels: usize) -> Result<BookDepth> {
        Ok(self.book(&(pair.clone(), lane))?.depth(levels))
    }

    #[must_use]
    pub fn strategy(&self, id: StrategyId) -> Option<&TradingStrategy> {
        self.strategies.get(id)
    }

    pub fn strategies_of<'a>(&'a self, owner: &'a AccountId) -> impl Iterator<Item = &'a TradingStrategy> {
        self.strategies.owned_by(owner)
    }

    /// The full trade log, oldest first.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn trades_for(&self, order_id: OrderId) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(move |t| t.involves(order_id))
    }

    #[must_use]
    pub fn escrow(&self) -> &EscrowManager {
        &self.escrow
    }

    #[must_use]
    pub fn keepers(&self) -> &Keepers<B, E, O, P> {
        &self.keepers
    }

    /// Collaborators are owned by the engine; the host mutates them
    /// (deposits, governance updates) between transactions.
    pub fn keepers_mut(&mut self) -> &mut Keepers<B, E, O, P> {
        &mut self.keepers
    }

    #[must_use]
    pub fn params(&self) -> &TradingParams {
        &self.params
    }

    #[must_use]
    pub fn context(&self) -> BlockContext {
        self.ctx
    }

    #[must_use]
    pub fn fee_collector(&self) -> &AccountId {
        &self.fee_collector
    }

    #[must_use]
    pub fn swap_reserve(&self) -> &AccountId {
        &self.swap_reserve
    }
}
