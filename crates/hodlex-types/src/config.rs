//! Governance parameters and genesis configuration.

use std::collections::BTreeSet;

use chrono::Duration;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::{self, FEE_PRECISION};
use crate::{AccountId, HodlexError, MarketConfig, OrderSide, Result};

/// Trading parameters owned by governance.
///
/// Read-only to the engine and re-read at every block boundary, so a
/// parameter change takes effect from the next block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingParams {
    /// Maximum fractional move of the reference price a single trade may cause.
    pub circuit_breaker_threshold: Decimal,
    /// How long a tripped market stays halted.
    pub circuit_breaker_cooldown_secs: i64,
    /// Maximum fraction of outstanding shares a single holder may reach.
    pub concentration_ceiling: Decimal,
    pub buyer_fee_rate: Decimal,
    pub seller_fee_rate: Decimal,
    /// Upper bound on caller-supplied swap slippage tolerance.
    pub max_swap_slippage: Decimal,
    /// Smallest tradable fraction for fractional orders.
    pub fractional_granularity: Decimal,
    /// Stable unit of account; its price is always 1.0.
    pub stable_symbol: String,
}

impl Default for TradingParams {
    fn default() -> Self {
        Self {
            circuit_breaker_threshold: Decimal::new(constants::DEFAULT_CIRCUIT_BREAKER_BPS, 4),
            circuit_breaker_cooldown_secs: constants::DEFAULT_CIRCUIT_BREAKER_COOLDOWN_SECS,
            concentration_ceiling: Decimal::new(constants::DEFAULT_CONCENTRATION_CEILING_PERMILLE, 3),
            buyer_fee_rate: Decimal::new(constants::DEFAULT_FEE_BPS, 4),
            seller_fee_rate: Decimal::new(constants::DEFAULT_FEE_BPS, 4),
            max_swap_slippage: Decimal::new(constants::MAX_SWAP_SLIPPAGE_BPS, 4),
            fractional_granularity: Decimal::new(1, constants::DEFAULT_FRACTIONAL_GRANULARITY_SCALE),
            stable_symbol: constants::DEFAULT_STABLE_SYMBOL.to_string(),
        }
    }
}

impl TradingParams {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: Decimal| {
            if v < Decimal::ZERO || v > Decimal::ONE {
                Err(HodlexError::InvalidParams(format!("{name} must be within [0, 1], got {v}")))
            } else {
                Ok(())
            }
        };
        unit("buyer_fee_rate", self.buyer_fee_rate)?;
        unit("seller_fee_rate", self.seller_fee_rate)?;
        unit("concentration_ceiling", self.concentration_ceiling)?;
        if self.circuit_breaker_threshold <= Decimal::ZERO {
            return Err(HodlexError::InvalidParams(
                "circuit_breaker_threshold must be positive".into(),
            ));
        }
        if self.circuit_breaker_cooldown_secs < 0 {
            return Err(HodlexError::InvalidParams(
                "circuit_breaker_cooldown_secs must not be negative".into(),
            ));
        }
        if self.max_swap_slippage < Decimal::ZERO
            || self.max_swap_slippage > Decimal::new(constants::MAX_SWAP_SLIPPAGE_BPS, 4)
        {
            return Err(HodlexError::InvalidParams(format!(
                "max_swap_slippage must be within [0, 0.5], got {}",
                self.max_swap_slippage
            )));
        }
        if self.fractional_granularity <= Decimal::ZERO || self.fractional_granularity > Decimal::ONE {
            return Err(HodlexError::InvalidParams(
                "fractional_granularity must be within (0, 1]".into(),
            ));
        }
        if self.stable_symbol.is_empty() {
            return Err(HodlexError::InvalidParams("stable_symbol is empty".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.circuit_breaker_cooldown_secs)
    }

    /// Fee rate charged to orders on `side`.
    #[must_use]
    pub fn fee_rate_for(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.buyer_fee_rate,
            OrderSide::Sell => self.seller_fee_rate,
        }
    }
}

/// Round toward the protocol: fees never round in the trader's favour.
#[must_use]
pub fn fee_round_up(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(FEE_PRECISION, RoundingStrategy::AwayFromZero)
}

/// Initial engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineGenesis {
    pub markets: Vec<MarketConfig>,
    /// Module account holding all order escrow.
    pub escrow_account: AccountId,
    /// Module account receiving trading fees.
    pub fee_collector_account: AccountId,
    /// Module account that is the counterparty of atomic swaps.
    pub swap_reserve_account: AccountId,
}

impl Default for EngineGenesis {
    fn default() -> Self {
        Self {
            markets: Vec::new(),
            escrow_account: AccountId::new(constants::DEFAULT_ESCROW_ACCOUNT),
            fee_collector_account: AccountId::new(constants::DEFAULT_FEE_COLLECTOR_ACCOUNT),
            swap_reserve_account: AccountId::new(constants::DEFAULT_SWAP_RESERVE_ACCOUNT),
        }
    }
}

impl EngineGenesis {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let genesis: Self = serde_json::from_str(json)?;
        genesis.validate()?;
        Ok(genesis)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for m in &self.markets {
            if m.base.is_empty() || m.quote.is_empty() || m.base == m.quote {
                return Err(HodlexError::Configuration(format!(
                    "invalid market pair {}",
                    m.symbol()
                )));
            }
            if m.reference_price <= Decimal::ZERO {
                return Err(HodlexError::Configuration(format!(
                    "reference price of {} must be positive",
                    m.symbol()
                )));
            }
            if !seen.insert(m.symbol()) {
                return Err(HodlexError::Configuration(format!(
                    "duplicate market {}",
                    m.symbol()
                )));
            }
        }
        let modules = [
            &self.escrow_account,
            &self.fee_collector_account,
            &self.swap_reserve_account,
        ];
        if modules.iter().any(|a| a.as_str().is_empty()) {
            return Err(HodlexError::Configuration("module account name is empty".into()));
        }
        Ok(())
    }
}
