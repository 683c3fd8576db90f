//! Order admission: stateless validation run before an order ID is
//! assigned. A rejection here changes nothing.

use chrono::{DateTime, Utc};
use hodlex_types::constants::{PRICE_PRECISION, QTY_PRECISION};
use hodlex_types::{
    HodlexError, Lane, Market, OrderKind, OrderRequest, Result, TimeInForce, TradingParams,
};
use rust_decimal::Decimal;

/// Validate `request` against its market and the block's parameters.
pub fn admit(request: &OrderRequest, market: &Market, params: &TradingParams, now: DateTime<Utc>) -> Result<()> {
    check_kind(request)?;
    admit_checked(request, market, params, now)
}

/// Admission for orders the strategy monitor synthesizes. They follow the
/// whole-unit lane; a priced action rests like a limit order and an
/// unpriced one executes like a market order.
pub(crate) fn admit_programmatic(
    request: &OrderRequest,
    market: &Market,
    params: &TradingParams,
    now: DateTime<Utc>,
) -> Result<()> {
    if request.kind != OrderKind::Programmatic {
        return Err(HodlexError::Internal(format!(
            "{} order submitted on the strategy path",
            request.kind
        )));
    }
    admit_checked(request, market, params, now)
}

fn admit_checked(request: &OrderRequest, market: &Market, params: &TradingParams, now: DateTime<Utc>) -> Result<()> {
    check_quantity(request, params)?;
    check_price(request)?;
    check_time_in_force(request, now)?;

    if !market.active {
        return Err(HodlexError::MarketInactive(market.pair.symbol()));
    }
    if market.is_halted(now) {
        return Err(HodlexError::MarketHalted(market.pair.symbol()));
    }
    Ok(())
}

fn check_kind(request: &OrderRequest) -> Result<()> {
    match request.kind {
        OrderKind::Limit | OrderKind::Market | OrderKind::Fractional => Ok(()),
        OrderKind::AtomicSwap => Err(HodlexError::Unsupported(
            "atomic swaps are submitted through the swap executor, not the book".into(),
        )),
        OrderKind::Programmatic => Err(HodlexError::Unsupported(
            "programmatic orders are created by strategies only".into(),
        )),
    }
}

fn lane_of(kind: OrderKind) -> Lane {
    if kind == OrderKind::Fractional {
        Lane::Fractional
    } else {
        Lane::Whole
    }
}

fn check_quantity(request: &OrderRequest, params: &TradingParams) -> Result<()> {
    let quantity = request.quantity;
    if quantity <= Decimal::ZERO {
        return Err(invalid(format!("quantity must be positive, got {quantity}")));
    }
    if quantity.normalize().scale() > QTY_PRECISION {
        return Err(invalid(format!(
            "quantity {quantity} exceeds {QTY_PRECISION} decimal places"
        )));
    }
    match lane_of(request.kind) {
        Lane::Whole if !quantity.fract().is_zero() => Err(invalid(format!(
            "quantity {quantity} is not a whole number of units"
        ))),
        Lane::Fractional if !(quantity % params.fractional_granularity).is_zero() => Err(invalid(format!(
            "fractional quantity {quantity} is not a multiple of {}",
            params.fractional_granularity
        ))),
        _ => Ok(()),
    }
}

fn check_price(request: &OrderRequest) -> Result<()> {
    match (request.kind, request.price) {
        (OrderKind::Market, Some(_)) => Err(invalid("market orders carry no price".into())),
        (OrderKind::Market | OrderKind::Programmatic, None) => Ok(()),
        (_, None) => Err(invalid(format!("{:?} orders need a limit price", request.kind))),
        (_, Some(price)) if price <= Decimal::ZERO => {
            Err(invalid(format!("price must be positive, got {price}")))
        }
        (_, Some(price)) if price.normalize().scale() > PRICE_PRECISION => Err(invalid(format!(
            "price {price} exceeds {PRICE_PRECISION} decimal places"
        ))),
        _ => Ok(()),
    }
}

fn check_time_in_force(request: &OrderRequest, now: DateTime<Utc>) -> Result<()> {
    let tif = request.time_in_force;
    if request.price.is_none() && tif.rests() {
        return Err(invalid(format!("unpriced {} orders cannot rest ({tif:?})", request.kind)));
    }
    match (tif, request.expires_at) {
        (TimeInForce::Gtd, None) => Err(invalid("GTD orders need an expiry".into())),
        (TimeInForce::Gtd, Some(at)) if at <= now => {
            Err(invalid(format!("expiry {at} is not after block time {now}")))
        }
        (TimeInForce::Gtc | TimeInForce::Ioc | TimeInForce::Fok, Some(_)) => {
            Err(invalid(format!("{tif:?} orders take no expiry")))
        }
        _ => Ok(()),
    }
}

fn invalid(reason: String) -> HodlexError {
    HodlexError::InvalidOrder { reason }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use hodlex_types::{AccountId, MarketPair, OrderSide};

    use super::*;

    fn d(v: i64) -> Decimal {
        Decimal::new(v, 0)
    }

    fn pair() -> MarketPair {
        MarketPair::new("APPLE", "HODL")
    }

    fn market() -> Market {
        Market::new(pair(), d(150), DateTime::<Utc>::default())
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::default() + Duration::seconds(10)
    }

    fn limit(qty: Decimal, price: Decimal) -> OrderRequest {
        OrderRequest::limit(pair(), AccountId::new("alice"), OrderSide::Buy, qty, price)
    }

    fn admit_default(req: &OrderRequest) -> Result<()> {
        admit(req, &market(), &TradingParams::default(), now())
    }

    #[test]
    fn plain_limit_admitted() {
        assert!(admit_default(&limit(d(100), d(150))).is_ok());
    }

    #[test]
    fn bad_quantities_rejected() {
        assert!(admit_default(&limit(d(0), d(150))).is_err());
        assert!(admit_default(&limit(d(-5), d(150))).is_err());
        // Whole lane needs integer units.
        assert!(admit_default(&limit(Decimal::new(15, 1), d(150))).is_err());
    }

    #[test]
    fn fractional_granularity() {
        let ok = OrderRequest::fractional(pair(), AccountId::new("a"), OrderSide::Sell, Decimal::new(25, 2), d(150));
        assert!(admit_default(&ok).is_ok());
        let too_fine =
            OrderRequest::fractional(pair(), AccountId::new("a"), OrderSide::Sell, Decimal::new(1, 7), d(150));
        assert!(matches!(admit_default(&too_fine), Err(HodlexError::InvalidOrder { .. })));
    }

    #[test]
    fn bad_prices_rejected() {
        assert!(admit_default(&limit(d(1), d(0))).is_err());
        assert!(admit_default(&limit(d(1), Decimal::new(1, 9))).is_err());
        let mut priced_market = OrderRequest::market(pair(), AccountId::new("a"), OrderSide::Buy, d(1));
        priced_market.price = Some(d(150));
        assert!(admit_default(&priced_market).is_err());
    }

    #[test]
    fn market_orders_cannot_rest() {
        let req = OrderRequest::market(pair(), AccountId::new("a"), OrderSide::Buy, d(1))
            .with_time_in_force(TimeInForce::Gtc);
        assert!(admit_default(&req).is_err());
        let fok = OrderRequest::market(pair(), AccountId::new("a"), OrderSide::Buy, d(1))
            .with_time_in_force(TimeInForce::Fok);
        assert!(admit_default(&fok).is_ok());
    }

    #[test]
    fn gtd_expiry_must_be_future() {
        assert!(admit_default(&limit(d(1), d(150)).with_expiry(now())).is_err());
        assert!(admit_default(&limit(d(1), d(150)).with_expiry(now() + Duration::seconds(1))).is_ok());
    }

    #[test]
    fn inactive_and_halted_markets_rejected() {
        let params = TradingParams::default();
        let mut m = market();
        m.active = false;
        assert!(matches!(
            admit(&limit(d(1), d(150)), &m, &params, now()),
            Err(HodlexError::MarketInactive(_))
        ));
        let mut m = market();
        m.halted_until = Some(now() + Duration::seconds(1));
        assert!(matches!(
            admit(&limit(d(1), d(150)), &m, &params, now()),
            Err(HodlexError::MarketHalted(_))
        ));
    }

    #[test]
    fn unsupported_kinds_fail_closed() {
        let mut req = limit(d(1), d(150));
        req.kind = OrderKind::Programmatic;
        assert!(matches!(admit_default(&req), Err(HodlexError::Unsupported(_))));
        req.kind = OrderKind::AtomicSwap;
        assert!(matches!(admit_default(&req), Err(HodlexError::Unsupported(_))));
    }

    #[test]
    fn programmatic_orders_admitted_on_strategy_path() {
        let params = TradingParams::default();
        let mut priced = limit(d(10), d(150));
        priced.kind = OrderKind::Programmatic;
        assert!(admit_programmatic(&priced, &market(), &params, now()).is_ok());

        let mut unpriced = OrderRequest::market(pair(), AccountId::new("a"), OrderSide::Buy, d(10));
        unpriced.kind = OrderKind::Programmatic;
        assert!(admit_programmatic(&unpriced, &market(), &params, now()).is_ok());
        let resting = unpriced.clone().with_time_in_force(TimeInForce::Gtc);
        assert!(admit_programmatic(&resting, &market(), &params, now()).is_err());

        // Whole units only.
        let mut fractional = priced.clone();
        fractional.quantity = Decimal::new(15, 1);
        assert!(admit_programmatic(&fractional, &market(), &params, now()).is_err());

        // Ordinary kinds never take this path.
        assert!(matches!(
            admit_programmatic(&limit(d(10), d(150)), &market(), &params, now()),
            Err(HodlexError::Internal(_))
        ));
    }
}
