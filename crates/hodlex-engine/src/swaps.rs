//! Atomic swaps through the engine: price lookup, market-state checks,
//! concentration, execution and the order/trade records.

use hodlex_ingress::{BankKeeper, EquityRegistry, ParamStore, PriceOracle, TradingSafeguards};
use hodlex_settlement::{SwapExecutor, SwapQuote, SwapRequest, quote_swap};
use hodlex_types::{
    EngineEvent, HodlexError, MarketPair, OrderId, OrderKind, OrderRequest, OrderSide, OrderStatus, Result, TimeInForce,
    Trade, TradeId, TradeKind,
};
use rust_decimal::Decimal;

use crate::engine::TradingEngine;

/// What an executed swap produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub order_id: OrderId,
    pub trade_id: TradeId,
    pub quote: SwapQuote,
}

impl<B, E, O, P> TradingEngine<B, E, O, P>
where
    B: BankKeeper,
    E: EquityRegistry,
    O: PriceOracle,
    P: ParamStore,
{
    /// Units of `to` received per unit of `from` at current prices.
    pub fn exchange_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        hodlex_matchcore::exchange_rate(from, self.price_of(from)?, to, self.price_of(to)?)
    }

    /// Convert one asset into another at the live rate, provided it is
    /// within the caller's slippage tolerance of `expected_rate`.
    pub fn place_atomic_swap(&mut self, request: SwapRequest) -> Result<SwapOutcome> {
        request.validate(&self.params)?;
        self.check_swap_markets(&request)?;
        let quote = quote_swap(
            &request,
            self.price_of(&request.from_symbol)?,
            self.price_of(&request.to_symbol)?,
            &self.params,
        )?;
        TradingSafeguards::new(&self.params).check_concentration(
            &request.trader,
            &request.to_symbol,
            quote.output,
            &self.keepers.bank,
            &self.keepers.equity,
            &self.escrow,
        )?;

        let order_id = self.next_order_id;
        SwapExecutor::new(&mut self.keepers.bank, &mut self.escrow, &self.swap_reserve)
            .execute(order_id, &request, &quote)?;
        self.next_order_id = order_id.next();
        let trade_id = self.allocate_trade_id();
        self.conservation.track(&request.from_symbol);
        self.conservation.track(&request.to_symbol);

        let now = self.ctx.time;
        let pair = MarketPair::new(request.from_symbol.clone(), request.to_symbol.clone());
        let mut order = OrderRequest {
            market: pair.clone(),
            owner: request.trader.clone(),
            // The trader gives up `from` for `to`.
            side: OrderSide::Sell,
            kind: OrderKind::AtomicSwap,
            time_in_force: TimeInForce::Fok,
            quantity: request.quantity,
            price: Some(quote.rate),
            expires_at: None,
        }
        .into_order(order_id, now);
        order.filled_quantity = request.quantity;
        order.filled_value = quote.output;
        order.average_price = quote.rate;
        order.status = OrderStatus::Filled;
        self.archive.insert(order_id, order);

        // The reserve side has no order; both IDs point at the swap order.
        self.trades.push(Trade {
            id: trade_id,
            kind: TradeKind::Swap,
            market: pair,
            buy_order_id: order_id,
            sell_order_id: order_id,
            buyer: request.trader.clone(),
            seller: self.swap_reserve.clone(),
            quantity: request.quantity,
            price: quote.rate,
            gross_value: quote.output,
            buyer_fee: Decimal::ZERO,
            seller_fee: Decimal::ZERO,
            executed_at: now,
        });
        self.audit_touched([order_id], [request.from_symbol.as_str(), request.to_symbol.as_str()]);
        self.events.push(EngineEvent::SwapExecuted {
            order_id,
            trade_id,
            trader: request.trader,
            from_symbol: request.from_symbol,
            to_symbol: request.to_symbol,
            input: request.quantity,
            output: quote.output,
            rate: quote.rate,
            slippage: quote.slippage,
        });
        Ok(SwapOutcome {
            order_id,
            trade_id,
            quote,
        })
    }

    /// A swap may not touch a halted or inactive `symbol/stable` market.
    fn check_swap_markets(&self, request: &SwapRequest) -> Result<()> {
        for symbol in [&request.from_symbol, &request.to_symbol] {
            let Some(market) = self.markets.quoted_in(symbol, &self.params.stable_symbol) else {
                continue;
            };
            if !market.active {
                return Err(HodlexError::MarketInactive(market.pair.symbol()));
            }
            if market.is_halted(self.ctx.time) {
                return Err(HodlexError::MarketHalted(market.pair.symbol()));
            }
        }
        Ok(())
    }
}
