//! Exchange-rate and slippage arithmetic for atomic swaps.
//!
//! Rates are derived on demand from reference prices and never stored;
//! a stale rate is worse than none.

use hodlex_types::constants::QTY_PRECISION;
use hodlex_types::{HodlexError, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// `price(from) / price(to)`: units of `to` received per unit of `from`.
pub fn exchange_rate(from_symbol: &str, from_price: Decimal, to_symbol: &str, to_price: Decimal) -> Result<Decimal> {
    if from_price <= Decimal::ZERO {
        return Err(HodlexError::PriceUnavailable(from_symbol.to_string()));
    }
    if to_price <= Decimal::ZERO {
        return Err(HodlexError::PriceUnavailable(to_symbol.to_string()));
    }
    from_price
        .checked_div(to_price)
        .ok_or_else(|| HodlexError::Internal(format!("rate overflow {from_symbol}->{to_symbol}")))
}

/// `|actual - expected| / expected`.
pub fn slippage(actual: Decimal, expected: Decimal) -> Result<Decimal> {
    if expected <= Decimal::ZERO {
        return Err(HodlexError::InvalidSwap {
            reason: format!("expected rate must be positive, got {expected}"),
        });
    }
    Ok((actual - expected).abs() / expected)
}

/// Output of swapping `quantity` at `rate`, truncated toward zero so the
/// trader never receives more than the exact product.
#[must_use]
pub fn swap_output(quantity: Decimal, rate: Decimal) -> Decimal {
    (quantity * rate).round_dp_with_strategy(QTY_PRECISION, RoundingStrategy::ToZero)
}

/// `0 <= max_slippage <= cap`.
pub fn validate_max_slippage(max_slippage: Decimal, cap: Decimal) -> Result<()> {
    if max_slippage < Decimal::ZERO || max_slippage > cap {
        return Err(HodlexError::InvalidSwap {
            reason: format!("max_slippage {max_slippage} outside [0, {cap}]"),
        });
    }
    Ok(())
}

/// Reject when realized slippage exceeds the caller's tolerance.
pub fn check_slippage(actual_rate: Decimal, expected_rate: Decimal, max_slippage: Decimal) -> Result<Decimal> {
    let actual = slippage(actual_rate, expected_rate)?;
    if actual > max_slippage {
        return Err(HodlexError::SlippageExceeded {
            actual,
            max: max_slippage,
        });
    }
    Ok(actual)
}
