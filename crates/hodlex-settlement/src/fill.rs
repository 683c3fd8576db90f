//! Fill settlement.
//!
//! One planned fill between a buy and a sell order becomes four escrow
//! movements, all journaled by the [`EscrowManager`]:
//! 1. seller escrow → buyer: `quantity` of base
//! 2. buyer escrow → seller: `gross - seller_fee` of quote
//! 3. buyer escrow → fee collector: `buyer_fee + seller_fee` of quote
//! 4. buyer escrow → buyer: anything above the remaining requirement
//!
//! Fees are charged on cumulative fill value, so the per-fill fee is the
//! difference between the fee owed after this fill and the fees already
//! paid. Rounding therefore never accumulates in the trader's favour.

use chrono::{DateTime, Utc};
use hodlex_ingress::{BankKeeper, EscrowManager};
use hodlex_types::{
    AccountId, HodlexError, Order, OrderSide, Result, Trade, TradeId, TradeKind,
};
use rust_decimal::Decimal;
use tracing::debug;

/// Amounts moved by one settled fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledFill {
    pub quantity: Decimal,
    pub price: Decimal,
    pub gross_value: Decimal,
    pub buyer_fee: Decimal,
    pub seller_fee: Decimal,
    /// Buyer escrow returned because the fill printed below the limit.
    pub buyer_refund: Decimal,
}

impl SettledFill {
    /// Build the immutable trade record for this fill.
    #[must_use]
    pub fn into_trade(self, id: TradeId, buy: &Order, sell: &Order, executed_at: DateTime<Utc>) -> Trade {
        Trade {
            id,
            kind: TradeKind::BookMatch,
            market: buy.market.clone(),
            buy_order_id: buy.id,
            sell_order_id: sell.id,
            buyer: buy.owner.clone(),
            seller: sell.owner.clone(),
            quantity: self.quantity,
            price: self.price,
            gross_value: self.gross_value,
            buyer_fee: self.buyer_fee,
            seller_fee: self.seller_fee,
            executed_at,
        }
    }
}

/// Settles fills out of escrow.
pub struct FillSettler<'a> {
    bank: &'a mut dyn BankKeeper,
    escrow: &'a mut EscrowManager,
    fee_collector: &'a AccountId,
}

impl<'a> FillSettler<'a> {
    pub fn new(bank: &'a mut dyn BankKeeper, escrow: &'a mut EscrowManager, fee_collector: &'a AccountId) -> Self {
        Self {
            bank,
            escrow,
            fee_collector,
        }
    }

    /// Settle `quantity` at `price` between `buy` and `sell`, then apply
    /// the fill to both orders.
    ///
    /// Any transfer failure is reported as [`HodlexError::SettlementFailed`];
    /// the caller owns the checkpoint and must roll it back.
    pub fn settle(
        &mut self,
        buy: &mut Order,
        sell: &mut Order,
        quantity: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<SettledFill> {
        if buy.side != OrderSide::Buy || sell.side != OrderSide::Sell {
            return Err(HodlexError::Internal(format!(
                "fill between {} ({}) and {} ({}) has mismatched sides",
                buy.id, buy.side, sell.id, sell.side
            )));
        }
        if quantity <= Decimal::ZERO || quantity > buy.remaining() || quantity > sell.remaining() {
            return Err(HodlexError::Internal(format!(
                "fill of {quantity} exceeds remaining on {} or {}",
                buy.id, sell.id
            )));
        }

        let gross = quantity * price;
        let buyer_fee = buy.fee_owed(buy.filled_value + gross) - buy.fees_paid;
        let seller_fee = sell.fee_owed(sell.filled_value + gross) - sell.fees_paid;

        self.escrow
            .settle(self.bank, sell.id, &buy.owner, quantity)
            .map_err(settlement_failed)?;
        self.escrow
            .settle(self.bank, buy.id, &sell.owner, gross - seller_fee)
            .map_err(settlement_failed)?;
        self.escrow
            .settle(self.bank, buy.id, self.fee_collector, buyer_fee + seller_fee)
            .map_err(settlement_failed)?;

        buy.apply_fill(quantity, price, now);
        buy.fees_paid += buyer_fee;
        sell.apply_fill(quantity, price, now);
        sell.fees_paid += seller_fee;

        let buyer_refund = match buy.escrow_requirement() {
            Some(required) => self
                .escrow
                .release_excess(self.bank, buy.id, required)
                .map_err(settlement_failed)?,
            None => Decimal::ZERO,
        };

        debug!(
            buy_order = %buy.id,
            sell_order = %sell.id,
            %quantity,
            %price,
            %buyer_fee,
            %seller_fee,
            %buyer_refund,
            "fill settled"
        );
        Ok(SettledFill {
            quantity,
            price,
            gross_value: gross,
            buyer_fee,
            seller_fee,
            buyer_refund,
        })
    }
}

fn settlement_failed(err: HodlexError) -> HodlexError {
    HodlexError::SettlementFailed {
        reason: err.to_string(),
    }
}
