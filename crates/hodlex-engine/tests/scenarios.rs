//! Acceptance scenarios for the trading core, end to end through the
//! engine with in-memory collaborators.

mod common;

use common::*;
use hodlex_engine::SwapOutcome;
use hodlex_ingress::BankKeeper;
use hodlex_settlement::SwapRequest;
use hodlex_types::*;
use rust_decimal::Decimal;

// ═══════════════════════════════════════════════════════════════════
// A: full cross at the reference price
// ═══════════════════════════════════════════════════════════════════

#[test]
fn scenario_a_full_cross() {
    let mut engine = engine();
    fund(&mut engine, "alice", "APPLE", d(100));
    fund(&mut engine, "bob", "HODL", d(20_000));

    let ask = sell(&mut engine, "alice", 100, 150).unwrap();
    let bid = buy(&mut engine, "bob", 100, 150).unwrap();

    let trades = engine.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].quantity, d(100));
    assert_eq!(trades[0].price, d(150));
    assert_eq!(trades[0].buy_order_id, bid);
    assert_eq!(trades[0].sell_order_id, ask);
    assert_eq!(engine.order(ask).unwrap().status, OrderStatus::Filled);
    assert_eq!(engine.order(bid).unwrap().status, OrderStatus::Filled);

    // 10 bps on each side of a 15,000 notional.
    assert_eq!(balance(&engine, "bob", "APPLE"), d(100));
    assert_eq!(balance(&engine, "bob", "HODL"), d(4_985));
    assert_eq!(balance(&engine, "alice", "HODL"), d(14_985));
    assert_eq!(balance(&engine, "alice", "APPLE"), Decimal::ZERO);
    assert_eq!(
        engine.keepers().bank.balance(engine.fee_collector(), "HODL"),
        d(30)
    );
    assert_eq!(engine.escrow().records().count(), 0);
    assert_eq!(engine.market(&apple()).unwrap().last_price, d(150));
}

// ═══════════════════════════════════════════════════════════════════
// B: partial fill leaves the taker resting
// ═══════════════════════════════════════════════════════════════════

#[test]
fn scenario_b_partial_fill_rests_remainder() {
    let mut engine = engine();
    fund(&mut engine, "alice", "APPLE", d(30));
    fund(&mut engine, "bob", "HODL", d(20_000));

    sell(&mut engine, "alice", 30, 150).unwrap();
    let bid = buy(&mut engine, "bob", 50, 150).unwrap();

    assert_eq!(engine.trades().len(), 1);
    assert_eq!(engine.trades()[0].quantity, d(30));

    let order = engine.order(bid).unwrap();
    assert_eq!(order.filled_quantity, d(30));
    assert_eq!(order.remaining(), d(20));
    assert_eq!(order.status, OrderStatus::PartiallyFilled);
    assert_eq!(engine.open_orders(&acct("bob")).len(), 1);

    // Remaining 20 @ 150 plus its share of the fee stays locked.
    assert_eq!(engine.escrow().outstanding(bid), d(3_003));
    let depth = engine.order_book(&apple(), Lane::Whole, 5).unwrap();
    assert_eq!(depth.bids.len(), 1);
    assert_eq!(depth.bids[0].quantity, d(20));
    assert!(depth.asks.is_empty());
}

// ═══════════════════════════════════════════════════════════════════
// C: swap rejected on slippage, input untouched
// ═══════════════════════════════════════════════════════════════════

#[test]
fn scenario_c_swap_slippage_rejected() {
    // APPLE at 163.60 puts the live HODL->APPLE rate ~8% under 0.006644.
    let mut engine = engine_at(Decimal::new(16_360, 2));
    fund(&mut engine, "carol", "HODL", d(1_000));
    let reserve = engine.swap_reserve().clone();
    engine.keepers_mut().bank.deposit(&reserve, "APPLE", d(100));

    let request = SwapRequest {
        trader: acct("carol"),
        from_symbol: "HODL".into(),
        to_symbol: "APPLE".into(),
        quantity: d(1_000),
        expected_rate: Decimal::new(6_644, 6),
        max_slippage: Decimal::new(3, 2),
    };
    let err = engine.place_atomic_swap(request).unwrap_err();
    match err {
        HodlexError::SlippageExceeded { actual, max } => {
            assert_eq!(max, Decimal::new(3, 2));
            assert_eq!(actual.round_dp(2), Decimal::new(8, 2));
        }
        other => panic!("expected slippage rejection, got {other}"),
    }
    assert_eq!(balance(&engine, "carol", "HODL"), d(1_000));
    assert_eq!(balance(&engine, "carol", "APPLE"), Decimal::ZERO);
    assert!(engine.trades().is_empty());
    assert_eq!(engine.escrow().records().count(), 0);
}

#[test]
fn scenario_c_control_swap_within_tolerance() {
    let mut engine = engine_at(Decimal::new(16_360, 2));
    fund(&mut engine, "carol", "HODL", d(1_000));
    let reserve = engine.swap_reserve().clone();
    engine.keepers_mut().bank.deposit(&reserve, "APPLE", d(100));

    let SwapOutcome { quote, .. } = engine
        .place_atomic_swap(SwapRequest {
            trader: acct("carol"),
            from_symbol: "HODL".into(),
            to_symbol: "APPLE".into(),
            quantity: d(1_000),
            expected_rate: Decimal::new(6_644, 6),
            max_slippage: Decimal::new(10, 2),
        })
        .unwrap();
    assert!(quote.slippage > Decimal::new(3, 2));
    assert_eq!(balance(&engine, "carol", "APPLE"), quote.output);
    assert_eq!(balance(&engine, "carol", "HODL"), Decimal::ZERO);
}

// ═══════════════════════════════════════════════════════════════════
// D: fill-or-kill against insufficient depth
// ═══════════════════════════════════════════════════════════════════

#[test]
fn scenario_d_fok_unfillable() {
    let mut engine = engine();
    fund(&mut engine, "alice", "APPLE", d(150));
    fund(&mut engine, "bob", "HODL", d(100_000));
    sell(&mut engine, "alice", 100, 150).unwrap();
    sell(&mut engine, "alice", 50, 151).unwrap();
    let before = engine.order_book(&apple(), Lane::Whole, 10).unwrap();
    let digest = engine.state_digest().unwrap();

    let request = OrderRequest::limit(apple(), acct("bob"), OrderSide::Buy, d(200), d(151))
        .with_time_in_force(TimeInForce::Fok);
    let err = engine.place_order(request).unwrap_err();
    assert!(matches!(
        err,
        HodlexError::FillOrKillUnfillable { requested, available }
            if requested == d(200) && available == d(150)
    ));

    assert_eq!(engine.order_book(&apple(), Lane::Whole, 10).unwrap(), before);
    assert!(engine.trades().is_empty());
    assert_eq!(balance(&engine, "bob", "HODL"), d(100_000));
    assert_eq!(engine.state_digest().unwrap(), digest);
}

// ═══════════════════════════════════════════════════════════════════
// E: beneficial ownership follows escrowed shares
// ═══════════════════════════════════════════════════════════════════

#[test]
fn scenario_e_beneficial_ownership_lifecycle() {
    let mut engine = engine();
    fund(&mut engine, "alice", "APPLE", d(100));

    let ask = sell(&mut engine, "alice", 100, 150).unwrap();
    let entry = engine
        .keepers()
        .equity
        .beneficial_entry(&ask.to_string())
        .cloned()
        .expect("entry registered for resting equity sell");
    assert_eq!(entry.true_owner, acct("alice"));
    assert_eq!(entry.quantity, d(100));
    assert_eq!(&entry.escrow_holder, engine.escrow().escrow_account());
    assert_eq!(entry.company_id, CompanyId("apple-inc".into()));
    assert_eq!(balance(&engine, "alice", "APPLE"), Decimal::ZERO);

    let cancelled = engine.cancel_order(&acct("alice"), ask).unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(engine.keepers().equity.beneficial_entry(&ask.to_string()).is_none());
    assert_eq!(balance(&engine, "alice", "APPLE"), d(100));
    assert!(engine.escrow().record(ask).is_none());
}

#[test]
fn beneficial_entry_shrinks_with_partial_fills() {
    let mut engine = engine();
    fund(&mut engine, "alice", "APPLE", d(100));
    fund(&mut engine, "bob", "HODL", d(20_000));

    let ask = sell(&mut engine, "alice", 100, 150).unwrap();
    buy(&mut engine, "bob", 40, 150).unwrap();
    let entry = engine.keepers().equity.beneficial_entry(&ask.to_string()).unwrap();
    assert_eq!(entry.quantity, d(60));

    buy(&mut engine, "bob", 60, 150).unwrap();
    assert!(engine.keepers().equity.beneficial_entry(&ask.to_string()).is_none());
}
