use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::matching::side::OrderSide;
use crate::matching::{BookError, ExecutionReport};
use crate::models::{
    price_key, BookDepth, BookLevel, MarketView, Order, OrderId, Price, Quantity, Side, Trade,
};

/// Incoming interest being matched; `limit` is `None` for market orders.
struct Taker<'a> {
    order_id: &'a str,
    account_id: &'a str,
    side: Side,
    limit: Option<Price>,
}

/// Cost of sweeping the contra side for a given quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketPrice {
    pub notional: Decimal,
    pub filled: Quantity,
    pub unfilled: Quantity,
}

/// Limit order book for a single instrument.
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: String,
    bids: OrderSide,
    asks: OrderSide,
    locations: HashMap<OrderId, (Side, Price)>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: OrderSide::new(Side::Buy),
            asks: OrderSide::new(Side::Sell),
            locations: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn order_side(&self, side: Side) -> &OrderSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Resting order count across both sides.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.locations.contains_key(order_id)
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        let &(side, price) = self.locations.get(order_id)?;
        self.order_side(side).level(price)?.get(order_id)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_level().map(|level| level.price())
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_level().map(|level| level.price())
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(bid), Some(ask)) if bid >= ask)
    }

    pub fn submit(&mut self, mut order: Order) -> Result<ExecutionReport, BookError> {
        order.validate()?;
        self.ensure_unique(order.id())?;
        self.order_side(order.side()).checked_volume(order.quantity())?;
        debug!(symbol = %self.symbol, order = %order, "submit");

        let side = order.side();
        let mut remaining = order.quantity();
        let taker = Taker {
            order_id: order.id(),
            account_id: order.account_id(),
            side,
            limit: Some(order.price()),
        };
        let trades = match side {
            Side::Buy => match_against(&mut self.asks, &mut self.locations, &taker, &mut remaining)?,
            Side::Sell => match_against(&mut self.bids, &mut self.locations, &taker, &mut remaining)?,
        };

        let order_id = order.id().to_string();
        if remaining.is_zero() {
            debug!(symbol = %self.symbol, %order_id, trades = trades.len(), "filled");
            return Ok(ExecutionReport::Filled { order_id, trades });
        }

        order.fill(order.quantity() - remaining);
        let price = order.price();
        match side {
            Side::Buy => self.bids.insert(order)?,
            Side::Sell => self.asks.insert(order)?,
        }
        self.locations.insert(order_id.clone(), (side, price));
        debug_assert!(!self.is_crossed(), "book left crossed after submit");
        debug!(symbol = %self.symbol, %order_id, %remaining, %price, "resting");
        Ok(ExecutionReport::Resting {
            order_id,
            remaining,
            trades,
        })
    }

    /// Matches an unpriced order against whatever contra liquidity exists.
    /// The order never rests; any remainder is reported as cancelled.
    pub fn submit_market(
        &mut self,
        order_id: impl Into<OrderId>,
        account_id: &str,
        side: Side,
        quantity: Quantity,
    ) -> Result<ExecutionReport, BookError> {
        let order_id = order_id.into();
        if order_id.is_empty() {
            return Err(BookError::InvalidArgument("order id is empty".to_string()));
        }
        if quantity <= Decimal::ZERO {
            return Err(BookError::InvalidArgument(format!(
                "market order {order_id} has non-positive quantity {quantity}"
            )));
        }
        self.ensure_unique(&order_id)?;
        debug!(symbol = %self.symbol, %order_id, %side, %quantity, "submit market");

        let mut remaining = quantity;
        let taker = Taker {
            order_id: &order_id,
            account_id,
            side,
            limit: None,
        };
        let trades = match side {
            Side::Buy => match_against(&mut self.asks, &mut self.locations, &taker, &mut remaining)?,
            Side::Sell => match_against(&mut self.bids, &mut self.locations, &taker, &mut remaining)?,
        };

        if remaining.is_zero() {
            return Ok(ExecutionReport::Filled { order_id, trades });
        }
        debug!(symbol = %self.symbol, %order_id, %remaining, "market remainder cancelled");
        Ok(ExecutionReport::Cancelled {
            order_id,
            remaining,
            trades,
        })
    }

    /// Cancels using the caller-supplied location of the order.
    pub fn cancel(&mut self, order_id: &str, side: Side, price: Price) -> Result<Order, BookError> {
        let order = match side {
            Side::Buy => self.bids.remove(order_id, price)?,
            Side::Sell => self.asks.remove(order_id, price)?,
        };
        self.locations.remove(order_id);
        debug!(symbol = %self.symbol, %order_id, %side, %price, "cancelled");
        Ok(order)
    }

    /// Cancels using the book's own id index.
    pub fn cancel_order(&mut self, order_id: &str) -> Result<Order, BookError> {
        let &(side, price) = self
            .locations
            .get(order_id)
            .ok_or_else(|| BookError::OrderNotFound(order_id.to_string()))?;
        self.cancel(order_id, side, price)
    }

    pub fn market_overview(&self) -> MarketView {
        MarketView {
            asks: compile_levels(&self.asks),
            bids: compile_levels(&self.bids),
        }
    }

    /// Top `limit` levels of each side, best first.
    pub fn depth(&self, limit: usize) -> BookDepth {
        let levels = |side: &OrderSide| -> Vec<BookLevel> {
            side.iter()
                .take(limit)
                .map(|level| BookLevel {
                    price: level.price(),
                    volume: level.volume(),
                })
                .collect()
        };
        BookDepth {
            bids: levels(&self.bids),
            asks: levels(&self.asks),
        }
    }

    /// Notional needed to take `quantity` from the contra side of `side`
    /// right now, without touching the book.
    pub fn market_price(&self, side: Side, quantity: Quantity) -> Result<MarketPrice, BookError> {
        if quantity <= Decimal::ZERO {
            return Err(BookError::InvalidArgument(format!(
                "non-positive quantity {quantity}"
            )));
        }
        let mut notional = Decimal::ZERO;
        let mut unfilled = quantity;
        for level in self.order_side(side.opposite()).iter() {
            if unfilled.is_zero() {
                break;
            }
            let take = unfilled.min(level.volume());
            notional = take
                .checked_mul(level.price())
                .and_then(|cost| notional.checked_add(cost))
                .ok_or_else(|| {
                    BookError::InvalidArgument(format!(
                        "notional for {quantity} on the {} side overflows",
                        side.opposite()
                    ))
                })?;
            unfilled -= take;
        }
        Ok(MarketPrice {
            notional,
            filled: quantity - unfilled,
            unfilled,
        })
    }

    fn ensure_unique(&self, order_id: &str) -> Result<(), BookError> {
        if self.locations.contains_key(order_id) {
            return Err(BookError::InvalidArgument(format!(
                "order id {order_id} is already live"
            )));
        }
        Ok(())
    }
}

/// Consumes contra liquidity best price first, oldest order first, while the
/// taker still has quantity and the best contra level crosses.
fn match_against(
    contra: &mut OrderSide,
    locations: &mut HashMap<OrderId, (Side, Price)>,
    taker: &Taker<'_>,
    remaining: &mut Quantity,
) -> Result<Vec<Trade>, BookError> {
    let mut trades = Vec::new();
    while *remaining > Decimal::ZERO {
        let Some(level) = contra.best_level() else {
            break;
        };
        let price = level.price();
        if let Some(limit) = taker.limit {
            if !taker.side.crosses(limit, price) {
                break;
            }
        }
        let Some(maker) = level.front() else {
            return Err(BookError::InvariantViolation(format!(
                "empty level {price} left on the {} side",
                contra.side()
            )));
        };
        let quantity = (*remaining).min(maker.quantity());
        let trade = Trade {
            maker_order_id: maker.id().to_string(),
            taker_order_id: taker.order_id.to_string(),
            maker_account_id: maker.account_id().to_string(),
            taker_account_id: taker.account_id.to_string(),
            taker_side: taker.side,
            price,
            quantity,
        };

        if let Some(filled) = contra.fill_front(price, quantity)? {
            locations.remove(filled.id());
        }
        *remaining -= quantity;
        trace!(maker = %trade.maker_order_id, taker = %trade.taker_order_id, %price, %quantity, "trade");
        trades.push(trade);
    }
    Ok(trades)
}

fn compile_levels(side: &OrderSide) -> BTreeMap<String, Quantity> {
    let mut view = BTreeMap::new();
    let mut next = side.best_level();
    while let Some(level) = next {
        view.insert(price_key(level.price()), level.volume());
        next = side.next_level(level.price());
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::OrderState;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn at(seq: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(seq)
    }

    fn limit(id: &str, side: Side, qty: Decimal, price: Decimal) -> Order {
        Order::new(id, format!("acct-{id}"), side, qty, price, at(0))
    }

    #[test]
    fn trade_uses_resting_price() {
        let mut book = OrderBook::new("BTC-USD");
        book.submit(limit("s1", Side::Sell, dec!(2), dec!(100))).unwrap();
        let report = book.submit(limit("b1", Side::Buy, dec!(1), dec!(105))).unwrap();

        assert_eq!(report.state(), OrderState::Filled);
        assert_eq!(report.trades()[0].price, dec!(100));
        assert_eq!(report.trades()[0].maker_account_id, "acct-s1");
        assert_eq!(book.best_ask(), Some(dec!(100)));
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.order("s1").unwrap().quantity(), dec!(1));
    }

    #[test]
    fn sweep_stops_at_limit() {
        let mut book = OrderBook::new("BTC-USD");
        book.submit(limit("s1", Side::Sell, dec!(1), dec!(100))).unwrap();
        book.submit(limit("s2", Side::Sell, dec!(1), dec!(101))).unwrap();
        book.submit(limit("s3", Side::Sell, dec!(1), dec!(103))).unwrap();

        let report = book.submit(limit("b1", Side::Buy, dec!(5), dec!(101))).unwrap();
        let prices: Vec<_> = report.trades().iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![dec!(100), dec!(101)]);
        assert_eq!(report.remaining(), dec!(3));
        assert_eq!(book.best_bid(), Some(dec!(101)));
        assert_eq!(book.best_ask(), Some(dec!(103)));
        assert!(!book.is_crossed());
        assert_eq!(book.spread(), Some(dec!(2)));
    }

    #[test]
    fn duplicate_live_id_is_rejected_without_side_effects() {
        let mut book = OrderBook::new("X");
        book.submit(limit("a", Side::Buy, dec!(1), dec!(10))).unwrap();
        let err = book.submit(limit("a", Side::Sell, dec!(1), dec!(10))).unwrap_err();
        assert!(matches!(err, BookError::InvalidArgument(_)));
        assert_eq!(book.order_side(Side::Buy).volume(), dec!(1));
        assert!(book.order_side(Side::Sell).is_empty());
    }

    #[test]
    fn filled_maker_id_can_be_reused() {
        let mut book = OrderBook::new("X");
        book.submit(limit("a", Side::Sell, dec!(1), dec!(10))).unwrap();
        book.submit(limit("b", Side::Buy, dec!(1), dec!(10))).unwrap();
        assert!(!book.contains("a"));
        assert!(book.submit(limit("a", Side::Buy, dec!(1), dec!(9))).is_ok());
    }

    #[test]
    fn market_order_cancels_remainder() {
        let mut book = OrderBook::new("X");
        book.submit(limit("s1", Side::Sell, dec!(1.5), dec!(10))).unwrap();
        book.submit(limit("s2", Side::Sell, dec!(1), dec!(20))).unwrap();

        let report = book.submit_market("m1", "acct-m", Side::Buy, dec!(4)).unwrap();
        assert_eq!(report.state(), OrderState::Cancelled);
        assert_eq!(report.filled_quantity(), dec!(2.5));
        assert_eq!(report.remaining(), dec!(1.5));
        assert!(book.is_empty());
        assert!(!book.contains("m1"));
    }

    #[test]
    fn market_order_on_empty_side() {
        let mut book = OrderBook::new("X");
        let report = book.submit_market("m1", "acct", Side::Sell, dec!(1)).unwrap();
        assert!(report.trades().is_empty());
        assert_eq!(report.state(), OrderState::Cancelled);
        assert!(book.submit_market("m2", "acct", Side::Sell, dec!(0)).is_err());
    }

    #[test]
    fn cancel_by_index() {
        let mut book = OrderBook::new("X");
        book.submit(limit("a", Side::Buy, dec!(1), dec!(10))).unwrap();
        book.submit(limit("b", Side::Buy, dec!(2), dec!(10))).unwrap();
        let cancelled = book.cancel_order("a").unwrap();
        assert_eq!(cancelled.id(), "a");
        assert_eq!(book.order_side(Side::Buy).best_level().unwrap().volume(), dec!(2));
        assert!(book.cancel_order("a").unwrap_err().is_not_found());
    }

    #[test]
    fn cancel_with_wrong_location() {
        let mut book = OrderBook::new("X");
        book.submit(limit("a", Side::Buy, dec!(1), dec!(10))).unwrap();
        assert!(matches!(
            book.cancel("a", Side::Sell, dec!(10)),
            Err(BookError::LevelNotFound { .. })
        ));
        assert!(book.contains("a"));
    }

    #[test]
    fn market_price_walks_levels() {
        let mut book = OrderBook::new("X");
        book.submit(limit("s1", Side::Sell, dec!(1), dec!(10))).unwrap();
        book.submit(limit("s2", Side::Sell, dec!(2), dec!(11))).unwrap();

        let quote = book.market_price(Side::Buy, dec!(2)).unwrap();
        assert_eq!(quote.notional, dec!(21));
        assert_eq!(quote.unfilled, Decimal::ZERO);

        let quote = book.market_price(Side::Buy, dec!(5)).unwrap();
        assert_eq!(quote.notional, dec!(32));
        assert_eq!(quote.filled, dec!(3));
        assert_eq!(quote.unfilled, dec!(2));

        assert!(book.market_price(Side::Sell, dec!(1)).unwrap().notional.is_zero());
        assert!(book.market_price(Side::Sell, dec!(0)).is_err());
    }

    #[test]
    fn depth_is_best_first() {
        let mut book = OrderBook::new("X");
        for (i, price) in [dec!(9), dec!(10), dec!(8)].into_iter().enumerate() {
            book.submit(limit(&format!("b{i}"), Side::Buy, dec!(1), price)).unwrap();
        }
        let depth = book.depth(2);
        let prices: Vec<_> = depth.bids.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(10), dec!(9)]);
        assert!(depth.asks.is_empty());
    }
}
