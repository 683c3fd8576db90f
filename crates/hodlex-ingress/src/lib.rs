//! # hodlex-ingress
//!
//! **Guard plane**: everything that stands between a match plan and a
//! balance change.
//!
//! ## Architecture
//!
//! 1. **Keepers**: capability traits for the bank, the equity registry,
//!    the price oracle and governance parameters, plus in-memory
//!    implementations ([`BalanceManager`], [`InMemoryEquityRegistry`])
//! 2. **EscrowManager**: locks the committed side of every order, settles
//!    fills out of escrow, journals every step so a failed operation can
//!    be rolled back exactly, and keeps beneficial-ownership entries for
//!    escrowed equity
//! 3. **TradingSafeguards**: wash-trade, circuit-breaker and
//!    concentration checks, read-only and short-circuiting
//!
//! ## Order Flow
//!
//! ```text
//! plan_match() -> TradingSafeguards::check_plan() -> EscrowManager::checkpoint()
//!     -> lock() -> settle()* -> commit() | rollback()
//! ```

pub mod balance_manager;
pub mod equity_registry;
pub mod escrow;
pub mod keepers;
pub mod safeguards;

pub use balance_manager::BalanceManager;
pub use equity_registry::InMemoryEquityRegistry;
pub use escrow::EscrowManager;
pub use keepers::{BankKeeper, EquityRegistry, FixedParams, Keepers, ParamStore, PriceOracle, StaticOracle};
pub use safeguards::{BreakerTrip, TradingSafeguards, breaker_trip};
