//! # hodlex-settlement
//!
//! **Finality Plane**: turns a safeguarded match plan into balance
//! movements, executes atomic swaps, and audits escrow accounting.
//!
//! ## Architecture
//!
//! The engine hands this crate one fill (or one swap) at a time while an
//! escrow checkpoint is open:
//! 1. [`FillSettler`] pays the seller's escrowed base to the buyer and the
//!    buyer's escrowed quote to the seller and the fee collector, then
//!    refunds any buyer escrow above the order's remaining requirement.
//! 2. [`SwapExecutor`] converts one asset into another against the swap
//!    reserve inside its own checkpoint, unwinding on any failure.
//! 3. [`EscrowConservation`] verifies that the escrow account holds
//!    exactly what open orders still commit.
//!
//! Nothing here decides *whether* a trade may happen; that is the job of
//! the matcher and the safeguards upstream.

pub mod escrow_conservation;
pub mod fill;
pub mod swap;

pub use escrow_conservation::{EscrowConservation, committed_by_asset};
pub use fill::{FillSettler, SettledFill};
pub use swap::{SwapExecutor, SwapQuote, SwapRequest, quote_swap};
