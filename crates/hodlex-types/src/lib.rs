//! # hodlex-types
//!
//! Shared types, errors, and configuration for the **Hodlex** trading core.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`TradeId`], [`StrategyId`], [`AccountId`], [`CompanyId`], [`MarketPair`]
//! - **Order model**: [`Order`], [`OrderRequest`], [`OrderSide`], [`OrderKind`], [`TimeInForce`], [`OrderStatus`], [`Lane`]
//! - **Trade model**: [`Trade`], [`TradeKind`]
//! - **Market model**: [`Market`], [`MarketConfig`]
//! - **Strategy model**: [`TradingStrategy`], [`TriggerCondition`], [`StrategyAction`]
//! - **Escrow model**: [`EscrowRecord`], [`BeneficialOwnership`]
//! - **Events**: [`EngineEvent`]
//! - **Configuration**: [`TradingParams`], [`EngineGenesis`], [`BlockContext`]
//! - **Encoding**: [`encode_record`], [`decode_record`], [`RecordDigest`]
//! - **Errors**: [`HodlexError`] with `HX_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod codec;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod escrow;
pub mod event;
pub mod ids;
pub mod market;
pub mod order;
pub mod strategy;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use hodlex_types::{Order, OrderSide, Trade, Market, ...};

pub use codec::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use escrow::*;
pub use event::*;
pub use ids::*;
pub use market::*;
pub use order::*;
pub use strategy::*;
pub use trade::*;

// Constants are accessed via `hodlex_types::constants::FOO`
// (not re-exported to avoid name collisions).
