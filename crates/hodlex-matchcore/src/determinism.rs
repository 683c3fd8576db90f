//! Determinism verification utilities for cross-node consistency.
//!
//! Every node applying the same transactions must produce the exact same
//! trade log. The `trade_root` is a hash over the canonical record
//! encoding of every trade that enables quick verification without
//! comparing full payloads.

use hodlex_types::{RecordDigest, Result, Trade, encode_record};

const TRADE_ROOT_DOMAIN: &[u8] = b"hodlex:trade_root:v1:";

/// Compute the trade root over `trades` in log order.
pub fn compute_trade_root(trades: &[Trade]) -> Result<RecordDigest> {
    let encoded = trades
        .iter()
        .map(encode_record)
        .collect::<Result<Vec<_>>>()?;
    Ok(RecordDigest::of(
        TRADE_ROOT_DOMAIN,
        encoded.iter().map(Vec::as_slice),
    ))
}

/// Recompute the root and compare with `expected`.
pub fn verify_trade_root(trades: &[Trade], expected: &RecordDigest) -> Result<bool> {
    Ok(compute_trade_root(trades)? == *expected)
}
