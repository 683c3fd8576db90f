//! System-wide constants for the Hodlex trading core.

/// Maximum decimal precision for prices (8 decimal places).
pub const PRICE_PRECISION: u32 = 8;

/// Maximum decimal precision for quantities and swap outputs (8 decimal places).
pub const QTY_PRECISION: u32 = 8;

/// Precision fees are rounded to. Rounding is always away from zero.
pub const FEE_PRECISION: u32 = 8;

/// Default smallest tradable fraction of a share for fractional orders.
pub const DEFAULT_FRACTIONAL_GRANULARITY_SCALE: u32 = 6;

/// Symbol of the stable unit of account. Its reference price is always 1.0.
pub const DEFAULT_STABLE_SYMBOL: &str = "HODL";

/// Default circuit-breaker threshold (15% move from the reference price).
pub const DEFAULT_CIRCUIT_BREAKER_BPS: i64 = 1_500;

/// Default circuit-breaker cool-down in seconds.
pub const DEFAULT_CIRCUIT_BREAKER_COOLDOWN_SECS: i64 = 300;

/// Default single-holder concentration ceiling (49.9%), in tenths of a percent.
pub const DEFAULT_CONCENTRATION_CEILING_PERMILLE: i64 = 499;

/// Default buyer and seller fee rate (10 bps).
pub const DEFAULT_FEE_BPS: i64 = 10;

/// Hard upper bound on the caller-supplied swap slippage tolerance (50%).
pub const MAX_SWAP_SLIPPAGE_BPS: i64 = 5_000;

/// Rolling window for market high/low/volume statistics.
pub const STATS_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Version byte prefixed to every persisted record.
pub const RECORD_CODEC_VERSION: u8 = 1;

/// Share class recorded on beneficial-ownership entries created for escrowed equity.
pub const DEFAULT_SHARE_CLASS: &str = "common";

/// Reference kind recorded on beneficial-ownership entries created for orders.
pub const BENEFICIAL_REFERENCE_KIND_ORDER: &str = "trading_order";

/// Default module account holding order escrow.
pub const DEFAULT_ESCROW_ACCOUNT: &str = "module/trading-escrow";

/// Default module account collecting trading fees.
pub const DEFAULT_FEE_COLLECTOR_ACCOUNT: &str = "module/trading-fees";

/// Default module account acting as counterparty to atomic swaps.
pub const DEFAULT_SWAP_RESERVE_ACCOUNT: &str = "module/swap-reserve";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Hodlex";
