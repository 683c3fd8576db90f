//! Atomic swaps through the engine.

mod common;

use common::*;
use hodlex_settlement::SwapRequest;
use hodlex_types::*;
use rust_decimal::Decimal;

fn to_apple(quantity: Decimal, expected_rate: Decimal, max_slippage: Decimal) -> SwapRequest {
    SwapRequest {
        trader: acct("carol"),
        from_symbol: "HODL".into(),
        to_symbol: "APPLE".into(),
        quantity,
        expected_rate,
        max_slippage,
    }
}

fn stocked(reserve_apple: i64) -> Engine {
    let mut engine = engine();
    fund(&mut engine, "carol", "HODL", d(1_000));
    let reserve = engine.swap_reserve().clone();
    engine.keepers_mut().bank.deposit(&reserve, "APPLE", d(reserve_apple));
    engine
}

#[test]
fn swap_converts_at_reference_rate() {
    let mut engine = stocked(100);
    let rate = engine.exchange_rate("HODL", "APPLE").unwrap();
    assert_eq!(rate, Decimal::ONE / d(150));

    let outcome = engine
        .place_atomic_swap(to_apple(d(1_000), rate, Decimal::new(1, 2)))
        .unwrap();
    assert_eq!(outcome.quote.slippage, Decimal::ZERO);
    // 1000 / 150 truncated to 8 places.
    assert_eq!(outcome.quote.output, Decimal::new(666_666_666, 8));

    let reserve = engine.swap_reserve().clone();
    assert_eq!(balance(&engine, "carol", "APPLE"), outcome.quote.output);
    assert_eq!(balance(&engine, "carol", "HODL"), Decimal::ZERO);
    assert_eq!(balance(&engine, reserve.as_str(), "HODL"), d(1_000));
    assert_eq!(
        balance(&engine, reserve.as_str(), "APPLE"),
        d(100) - outcome.quote.output
    );

    let order = engine.order(outcome.order_id).unwrap();
    assert_eq!(order.kind, OrderKind::AtomicSwap);
    assert_eq!(order.status, OrderStatus::Filled);
    let trade = &engine.trades()[0];
    assert_eq!(trade.id, outcome.trade_id);
    assert_eq!(trade.kind, TradeKind::Swap);
    assert_eq!(trade.gross_value, outcome.quote.output);
    assert!(engine.escrow().records().next().is_none());

    let events = engine.take_events();
    assert!(events.iter().any(|e| e.kind() == "swap_executed"));
}

#[test]
fn swap_between_two_equities_uses_both_prices() {
    let mut engine = engine();
    engine.list_market(&market("TSLA", "HODL", d(300))).unwrap();
    fund(&mut engine, "carol", "TSLA", d(2));
    let reserve = engine.swap_reserve().clone();
    engine.keepers_mut().bank.deposit(&reserve, "APPLE", d(10));

    let outcome = engine
        .place_atomic_swap(SwapRequest {
            trader: acct("carol"),
            from_symbol: "TSLA".into(),
            to_symbol: "APPLE".into(),
            quantity: d(2),
            expected_rate: d(2),
            max_slippage: Decimal::ZERO,
        })
        .unwrap();
    assert_eq!(outcome.quote.output, d(4));
    assert_eq!(balance(&engine, "carol", "APPLE"), d(4));
}

#[test]
fn swap_fails_cleanly_without_reserve_liquidity() {
    let mut engine = stocked(1);
    let rate = engine.exchange_rate("HODL", "APPLE").unwrap();
    let err = engine
        .place_atomic_swap(to_apple(d(1_000), rate, Decimal::new(1, 2)))
        .unwrap_err();
    assert!(matches!(err, HodlexError::InsufficientLiquidity { .. }));
    assert_eq!(balance(&engine, "carol", "HODL"), d(1_000));
    assert!(engine.trades().is_empty());
}

#[test]
fn swap_needs_trader_funds() {
    let mut engine = stocked(100);
    let rate = engine.exchange_rate("HODL", "APPLE").unwrap();
    let err = engine
        .place_atomic_swap(to_apple(d(5_000), rate, Decimal::new(1, 2)))
        .unwrap_err();
    assert!(matches!(err, HodlexError::InsufficientBalance { .. }));
    assert_eq!(balance(&engine, "carol", "HODL"), d(1_000));
}

#[test]
fn malformed_swaps_rejected() {
    let mut engine = stocked(100);
    let rate = Decimal::new(6_667, 6);

    let mut same = to_apple(d(10), rate, Decimal::new(1, 2));
    same.to_symbol = "HODL".into();
    assert!(matches!(
        engine.place_atomic_swap(same),
        Err(HodlexError::InvalidSwap { .. })
    ));
    assert!(matches!(
        engine.place_atomic_swap(to_apple(d(10), rate, Decimal::new(6, 1))),
        Err(HodlexError::InvalidSwap { .. })
    ));
    assert!(matches!(
        engine.place_atomic_swap(to_apple(Decimal::ZERO, rate, Decimal::new(1, 2))),
        Err(HodlexError::InvalidSwap { .. })
    ));

    let mut unpriced = to_apple(d(10), rate, Decimal::new(1, 2));
    unpriced.to_symbol = "GHOST".into();
    assert!(matches!(
        engine.place_atomic_swap(unpriced),
        Err(HodlexError::PriceUnavailable(_))
    ));
}

#[test]
fn oracle_prices_unlisted_assets() {
    let mut engine = stocked(0);
    engine.keepers_mut().oracle.set_price("GOLD", d(2_000));
    let reserve = engine.swap_reserve().clone();
    engine.keepers_mut().bank.deposit(&reserve, "GOLD", d(1));

    let outcome = engine
        .place_atomic_swap(SwapRequest {
            trader: acct("carol"),
            from_symbol: "HODL".into(),
            to_symbol: "GOLD".into(),
            quantity: d(1_000),
            expected_rate: Decimal::new(5, 4),
            max_slippage: Decimal::ZERO,
        })
        .unwrap();
    assert_eq!(outcome.quote.output, Decimal::new(5, 1));
}

#[test]
fn swap_blocked_on_inactive_market() {
    let mut engine = stocked(100);
    let rate = engine.exchange_rate("HODL", "APPLE").unwrap();
    engine.deactivate_market(&apple()).unwrap();
    assert!(matches!(
        engine.place_atomic_swap(to_apple(d(10), rate, Decimal::new(1, 2))),
        Err(HodlexError::MarketInactive(_))
    ));
    assert_eq!(balance(&engine, "carol", "HODL"), d(1_000));
}
