//! # hodlex-matchcore
//!
//! **Pure deterministic matching for Hodlex.**
//!
//! MatchCore is the compute plane: it owns the per-market order book
//! index and computes what an incoming order would do to it. It has:
//!
//! - **Zero side effects**: no balance moves, no escrow, no safeguards
//! - **Deterministic output**: same book and order -> same plan on every node
//! - **Market sharding**: each `(market, lane)` has its own independent book
//! - **Swap math**: exchange rates and slippage derived from reference prices

pub mod determinism;
pub mod exchange_rate;
pub mod matcher;
pub mod orderbook;
pub mod price_level;

pub use determinism::{compute_trade_root, verify_trade_root};
pub use exchange_rate::{check_slippage, exchange_rate, slippage, swap_output, validate_max_slippage};
pub use matcher::{MatchPlan, PlannedFill, available_liquidity, plan_match};
pub use orderbook::{BookDepth, DepthLevel, OrderBook};
pub use price_level::PriceLevel;
