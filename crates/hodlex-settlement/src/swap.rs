//! Atomic swap executor.
//!
//! A swap converts `quantity` of one asset into another at the rate
//! implied by their reference prices, against a module-held reserve. It
//! never rests on a book.
//!
//! Quoting ([`quote_swap`]) is pure and runs before any mutation, so a
//! slippage or liquidity rejection leaves every balance untouched.
//! Execution ([`SwapExecutor::execute`]) runs inside its own escrow
//! checkpoint: the input is locked under the swap's order ID, paid to the
//! reserve, and the output paid out of the reserve. Any failure after the
//! lock rolls the checkpoint back before the error is returned.

use hodlex_ingress::{BankKeeper, EscrowManager};
use hodlex_matchcore::{check_slippage, exchange_rate, swap_output, validate_max_slippage};
use hodlex_types::{AccountId, HodlexError, OrderId, Result, TradingParams};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// A caller's conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub trader: AccountId,
    pub from_symbol: String,
    pub to_symbol: String,
    pub quantity: Decimal,
    /// Rate the caller saw when submitting.
    pub expected_rate: Decimal,
    /// Largest tolerated relative deviation from `expected_rate`.
    pub max_slippage: Decimal,
}

impl SwapRequest {
    /// Reject malformed requests before any price lookup.
    pub fn validate(&self, params: &TradingParams) -> Result<()> {
        if self.from_symbol == self.to_symbol {
            return Err(HodlexError::InvalidSwap {
                reason: format!("cannot swap {} into itself", self.from_symbol),
            });
        }
        if self.quantity <= Decimal::ZERO {
            return Err(HodlexError::InvalidSwap {
                reason: format!("quantity must be positive, got {}", self.quantity),
            });
        }
        if self.expected_rate <= Decimal::ZERO {
            return Err(HodlexError::InvalidSwap {
                reason: format!("expected rate must be positive, got {}", self.expected_rate),
            });
        }
        validate_max_slippage(self.max_slippage, params.max_swap_slippage)
    }
}

/// Execution terms computed from live prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub rate: Decimal,
    pub output: Decimal,
    pub slippage: Decimal,
}

/// Price the request at the live rate and enforce the slippage bound.
pub fn quote_swap(
    request: &SwapRequest,
    from_price: Decimal,
    to_price: Decimal,
    params: &TradingParams,
) -> Result<SwapQuote> {
    request.validate(params)?;
    let rate = exchange_rate(&request.from_symbol, from_price, &request.to_symbol, to_price)?;
    let slippage = check_slippage(rate, request.expected_rate, request.max_slippage).inspect_err(|err| {
        warn!(trader = %request.trader, from = %request.from_symbol, to = %request.to_symbol, %rate, error = %err, "swap rejected");
    })?;
    let output = swap_output(request.quantity, rate);
    if output <= Decimal::ZERO {
        return Err(HodlexError::InvalidSwap {
            reason: format!("{} {} converts to nothing", request.quantity, request.from_symbol),
        });
    }
    Ok(SwapQuote {
        rate,
        output,
        slippage,
    })
}

/// Moves swap funds between the trader and the reserve.
pub struct SwapExecutor<'a> {
    bank: &'a mut dyn BankKeeper,
    escrow: &'a mut EscrowManager,
    reserve: &'a AccountId,
}

impl<'a> SwapExecutor<'a> {
    pub fn new(bank: &'a mut dyn BankKeeper, escrow: &'a mut EscrowManager, reserve: &'a AccountId) -> Self {
        Self { bank, escrow, reserve }
    }

    /// Execute a quoted swap as one logical step.
    ///
    /// Fails with no side effects if the trader cannot cover the input or
    /// the reserve cannot cover the output. A failure between lock and
    /// payout is rolled back and reported as [`HodlexError::SwapRolledBack`].
    pub fn execute(&mut self, order_id: OrderId, request: &SwapRequest, quote: &SwapQuote) -> Result<()> {
        let reserve_balance = self.bank.balance(self.reserve, &request.to_symbol);
        if reserve_balance < quote.output {
            return Err(HodlexError::InsufficientLiquidity {
                asset: request.to_symbol.clone(),
                needed: quote.output,
            });
        }

        self.escrow.checkpoint()?;
        if let Err(err) = self.escrow.lock(
            self.bank,
            order_id,
            &request.trader,
            &request.from_symbol,
            request.quantity,
        ) {
            self.escrow.rollback(self.bank);
            return Err(err);
        }
        match self.pay_out(order_id, request, quote) {
            Ok(()) => {
                self.escrow.commit();
                info!(
                    %order_id,
                    trader = %request.trader,
                    from = %request.from_symbol,
                    to = %request.to_symbol,
                    input = %request.quantity,
                    output = %quote.output,
                    rate = %quote.rate,
                    "swap executed"
                );
                Ok(())
            }
            Err(err) => {
                self.escrow.rollback(self.bank);
                Err(HodlexError::SwapRolledBack {
                    reason: err.to_string(),
                })
            }
        }
    }

    fn pay_out(&mut self, order_id: OrderId, request: &SwapRequest, quote: &SwapQuote) -> Result<()> {
        self.escrow.settle(self.bank, order_id, self.reserve, request.quantity)?;
        self.escrow
            .transfer(self.bank, self.reserve, &request.trader, &request.to_symbol, quote.output)?;
        self.escrow.close(order_id)
    }
}
