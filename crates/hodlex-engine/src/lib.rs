//! # hodlex-engine
//!
//! The **Hodlex** trading engine: the state machine a replicated ledger
//! drives once per block and once per transaction.
//!
//! - [`MarketRegistry`]: listed pairs, reference prices, 24h statistics
//!   and circuit-breaker halts
//! - [`TradingEngine`]: order placement, cancellation and expiry over
//!   per-market books, with escrow-first settlement and rollback
//! - atomic swaps between any two priced assets ([`SwapOutcome`])
//! - [`StrategyMonitor`]: stored programmatic strategies evaluated at
//!   every block boundary
//!
//! ## Transaction Lifecycle
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────────┐    ┌──────────┐
//! │  ADMIT   │───▶│   PLAN    │───▶│  SAFEGUARDS  │───▶│  SETTLE  │
//! │          │    │           │    │              │    │          │
//! │ market,  │    │ price-time│    │ wash, breaker│    │ escrow → │
//! │ qty, TIF │    │ walk      │    │ concentration│    │ balances │
//! └──────────┘    └───────────┘    └──────────────┘    └──────────┘
//!                                                         │ error
//!                                                         ▼
//!                                                     rollback
//! ```
//!
//! Every call is synchronous and deterministic: identical inputs on every
//! node produce identical books, balances, trades and events.

pub mod admission;
pub mod engine;
pub mod markets;
pub mod orders;
pub mod queries;
pub mod strategies;
pub mod strategy_monitor;
pub mod swaps;

pub use admission::admit;
pub use engine::TradingEngine;
pub use markets::MarketRegistry;
pub use strategy_monitor::{StrategyMonitor, action_order, conditions_hold};
pub use swaps::SwapOutcome;
