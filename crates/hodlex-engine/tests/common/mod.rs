//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use hodlex_engine::TradingEngine;
use hodlex_ingress::{
    BalanceManager, BankKeeper, FixedParams, InMemoryEquityRegistry, Keepers, StaticOracle,
};
use hodlex_types::*;
use rust_decimal::Decimal;

pub type Engine = TradingEngine<BalanceManager, InMemoryEquityRegistry, StaticOracle, FixedParams>;

pub fn d(v: i64) -> Decimal {
    Decimal::new(v, 0)
}

pub fn acct(name: &str) -> AccountId {
    AccountId::new(name)
}

pub fn apple() -> MarketPair {
    MarketPair::new("APPLE", "HODL")
}

pub fn genesis_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

pub fn genesis_ctx() -> BlockContext {
    BlockContext::new(1, genesis_time())
}

/// Route engine logs to the test writer; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn market(base: &str, quote: &str, reference_price: Decimal) -> MarketConfig {
    MarketConfig {
        base: base.into(),
        quote: quote.into(),
        reference_price,
    }
}

/// APPLE/HODL listed at 150 with APPLE registered as an equity of
/// 1,000,000 outstanding shares.
pub fn engine() -> Engine {
    engine_at(d(150))
}

pub fn engine_at(apple_price: Decimal) -> Engine {
    init_tracing();
    let mut equity = InMemoryEquityRegistry::new();
    equity.list_company("APPLE", CompanyId("apple-inc".into()), d(1_000_000));
    let keepers = Keepers {
        bank: BalanceManager::new(),
        equity,
        oracle: StaticOracle::new(),
        params: FixedParams::default(),
    };
    let genesis = EngineGenesis {
        markets: vec![market("APPLE", "HODL", apple_price)],
        ..EngineGenesis::default()
    };
    TradingEngine::new(keepers, &genesis, genesis_ctx()).expect("engine genesis")
}

pub fn fund(engine: &mut Engine, who: &str, asset: &str, amount: Decimal) {
    engine.keepers_mut().bank.deposit(&acct(who), asset, amount);
}

pub fn balance(engine: &Engine, who: &str, asset: &str) -> Decimal {
    engine.keepers().bank.balance(&acct(who), asset)
}

pub fn sell(engine: &mut Engine, who: &str, qty: i64, price: i64) -> Result<OrderId> {
    engine.place_limit_order(&acct(who), &apple(), OrderSide::Sell, d(qty), d(price))
}

pub fn buy(engine: &mut Engine, who: &str, qty: i64, price: i64) -> Result<OrderId> {
    engine.place_limit_order(&acct(who), &apple(), OrderSide::Buy, d(qty), d(price))
}
