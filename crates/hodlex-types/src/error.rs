//! Error types for the Hodlex trading core.
//!
//! All errors use the `HX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by how the transaction layer must treat them:
//! - 1xx: Validation (rejected before any mutation)
//! - 2xx: Economic safety (rejected after read-only computation, before escrow)
//! - 3xx: Resource (rejected at the locking step, prior escrow unwound)
//! - 4xx: Partial failure / settlement (compensating rollback performed)
//! - 5xx: Unsupported features (fail closed)
//! - 6xx: Collaborator (keeper) failures
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{OrderId, OrderStatus, StrategyId};

/// How the transaction layer should classify an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    EconomicSafety,
    Resource,
    PartialFailure,
    Unsupported,
    Collaborator,
    Internal,
}

/// Central error enum for all Hodlex operations.
#[derive(Debug, Error)]
pub enum HodlexError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The order failed validation (bad quantity, price, time-in-force, ...).
    #[error("HX_ERR_100: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The requested order does not exist.
    #[error("HX_ERR_101: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// No market is listed for this symbol pair.
    #[error("HX_ERR_102: Market not found: {0}")]
    MarketNotFound(String),

    /// The market exists but has been deactivated.
    #[error("HX_ERR_103: Market inactive: {0}")]
    MarketInactive(String),

    /// A market with this symbol pair is already listed.
    #[error("HX_ERR_104: Market already listed: {0}")]
    MarketExists(String),

    /// The order is in a terminal state and cannot be cancelled.
    #[error("HX_ERR_105: Order {order_id} cannot be cancelled: status {status}")]
    OrderNotCancellable {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The caller does not own the order or strategy it is acting on.
    #[error("HX_ERR_106: Not the owner of {0}")]
    NotOwner(String),

    /// Swap request is malformed (same asset, bad slippage bound, ...).
    #[error("HX_ERR_107: Invalid swap: {reason}")]
    InvalidSwap { reason: String },

    /// Strategy definition is malformed.
    #[error("HX_ERR_108: Invalid strategy: {reason}")]
    InvalidStrategy { reason: String },

    /// The requested strategy does not exist.
    #[error("HX_ERR_109: Strategy not found: {0}")]
    StrategyNotFound(StrategyId),

    /// Governance parameters are out of range.
    #[error("HX_ERR_110: Invalid parameters: {0}")]
    InvalidParams(String),

    /// No reference price is available for the symbol.
    #[error("HX_ERR_111: Price unavailable for {0}")]
    PriceUnavailable(String),

    /// A Fill-or-Kill order cannot be satisfied by the resting book.
    #[error("HX_ERR_112: Fill-or-kill order unfillable: requested {requested}, available {available}")]
    FillOrKillUnfillable {
        requested: Decimal,
        available: Decimal,
    },

    // =================================================================
    // Economic Safety Errors (2xx)
    // =================================================================
    /// Realized swap slippage exceeds the caller's tolerance.
    #[error("HX_ERR_200: Slippage exceeded: actual {actual}, max {max}")]
    SlippageExceeded { actual: Decimal, max: Decimal },

    /// The buyer's projected ownership would exceed the concentration ceiling.
    #[error("HX_ERR_201: Concentration limit exceeded for {holder} in {symbol}: projected {projected}, ceiling {ceiling}")]
    ConcentrationLimitExceeded {
        holder: String,
        symbol: String,
        projected: Decimal,
        ceiling: Decimal,
    },

    /// The trade would move the reference price beyond the breaker threshold.
    #[error("HX_ERR_202: Circuit breaker tripped on {market}: price {price} vs reference {reference}")]
    CircuitBreakerTripped {
        market: String,
        price: Decimal,
        reference: Decimal,
    },

    /// The market is halted by a previously tripped circuit breaker.
    #[error("HX_ERR_203: Market halted: {0}")]
    MarketHalted(String),

    /// Buyer and seller are the same account (wash trading).
    #[error("HX_ERR_204: Wash trade prevented: {owner} on both sides")]
    WashTrade { owner: String },

    // =================================================================
    // Resource Errors (3xx)
    // =================================================================
    /// Not enough spendable balance to lock or transfer.
    #[error("HX_ERR_300: Insufficient balance of {asset}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: String,
        needed: Decimal,
        available: Decimal,
    },

    /// Not enough escrow recorded for the order to settle or unlock.
    #[error("HX_ERR_301: Insufficient escrow for {order_id}: need {needed}, have {available}")]
    InsufficientEscrow {
        order_id: OrderId,
        needed: Decimal,
        available: Decimal,
    },

    /// The swap reserve cannot supply the requested output.
    #[error("HX_ERR_302: Insufficient liquidity for {asset}: need {needed}")]
    InsufficientLiquidity { asset: String, needed: Decimal },

    // =================================================================
    // Partial-Failure / Settlement Errors (4xx)
    // =================================================================
    /// Settlement of a fill failed after escrow; state was rolled back.
    #[error("HX_ERR_400: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    /// A swap failed after the input was locked; the input was unlocked.
    #[error("HX_ERR_401: Swap failed and was rolled back: {reason}")]
    SwapRolledBack { reason: String },

    // =================================================================
    // Unsupported (5xx)
    // =================================================================
    /// The requested feature is not available through this entry point.
    #[error("HX_ERR_500: Unsupported: {0}")]
    Unsupported(String),

    // =================================================================
    // Collaborator Errors (6xx)
    // =================================================================
    /// The balance ledger refused a transfer, mint or burn.
    #[error("HX_ERR_600: Bank error: {0}")]
    Bank(String),

    /// The equity registry refused an operation.
    #[error("HX_ERR_601: Equity registry error: {0}")]
    EquityRegistry(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("HX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("HX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid genesis, missing fields, etc.).
    #[error("HX_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl HodlexError {
    /// Classify the error per the propagation policy.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidOrder { .. }
            | Self::OrderNotFound(_)
            | Self::MarketNotFound(_)
            | Self::MarketInactive(_)
            | Self::MarketExists(_)
            | Self::OrderNotCancellable { .. }
            | Self::NotOwner(_)
            | Self::InvalidSwap { .. }
            | Self::InvalidStrategy { .. }
            | Self::StrategyNotFound(_)
            | Self::InvalidParams(_)
            | Self::PriceUnavailable(_)
            | Self::FillOrKillUnfillable { .. } => ErrorCategory::Validation,
            Self::SlippageExceeded { .. }
            | Self::ConcentrationLimitExceeded { .. }
            | Self::CircuitBreakerTripped { .. }
            | Self::MarketHalted(_)
            | Self::WashTrade { .. } => ErrorCategory::EconomicSafety,
            Self::InsufficientBalance { .. }
            | Self::InsufficientEscrow { .. }
            | Self::InsufficientLiquidity { .. } => ErrorCategory::Resource,
            Self::SettlementFailed { .. } | Self::SwapRolledBack { .. } => {
                ErrorCategory::PartialFailure
            }
            Self::Unsupported(_) => ErrorCategory::Unsupported,
            Self::Bank(_) | Self::EquityRegistry(_) => ErrorCategory::Collaborator,
            Self::Internal(_) | Self::Serialization(_) | Self::Configuration(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, HodlexError>;

impl From<serde_json::Error> for HodlexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<bincode::Error> for HodlexError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
