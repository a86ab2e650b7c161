use std::collections::BTreeMap;
use std::ops::Bound;

use rust_decimal::Decimal;
use tracing::trace;

use crate::matching::BookError;
use crate::matching::level::PriceLevel;
use crate::models::{Order, Price, Quantity, Side};

/// Price-ordered index of the levels on one side of a book.
///
/// Bids rank by descending price and asks by ascending price; `Side`
/// supplies the comparison. A level exists only while it holds an order.
#[derive(Debug, Clone)]
pub struct OrderSide {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
    num_orders: usize,
    volume: Quantity,
}

impl OrderSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            num_orders: 0,
            volume: Decimal::ZERO,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Number of resting orders.
    pub fn len(&self) -> usize {
        self.num_orders
    }

    /// Number of price levels.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn volume(&self) -> Quantity {
        self.volume
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, price: Price) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    pub fn best_level(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(_, level)| level),
            Side::Sell => self.levels.first_key_value().map(|(_, level)| level),
        }
    }

    pub fn worst_level(&self) -> Option<&PriceLevel> {
        match self.side {
            Side::Buy => self.levels.first_key_value().map(|(_, level)| level),
            Side::Sell => self.levels.last_key_value().map(|(_, level)| level),
        }
    }

    /// The level ranked immediately after `after`, which need not be a live
    /// level itself.
    pub fn next_level(&self, after: Price) -> Option<&PriceLevel> {
        match self.side {
            Side::Buy => self.levels.range(..after).next_back().map(|(_, level)| level),
            Side::Sell => self
                .levels
                .range((Bound::Excluded(after), Bound::Unbounded))
                .next()
                .map(|(_, level)| level),
        }
    }

    /// Levels from best to worst.
    pub fn iter(&self) -> impl Iterator<Item = &PriceLevel> {
        std::iter::successors(self.best_level(), move |level| self.next_level(level.price()))
    }

    pub fn insert(&mut self, order: Order) -> Result<(), BookError> {
        if order.side() != self.side {
            return Err(BookError::InvariantViolation(format!(
                "{} order {} inserted on {} side",
                order.side(),
                order.id(),
                self.side
            )));
        }
        let price = order.price();
        let quantity = order.quantity();
        let volume = self.checked_volume(quantity)?;
        let level = self.levels.entry(price).or_insert_with(|| {
            trace!(side = %self.side, %price, "opening level");
            PriceLevel::new(price)
        });
        level.enqueue(order)?;
        self.num_orders += 1;
        self.volume = volume;
        Ok(())
    }

    /// Side volume after adding `quantity`, or an error if it would not fit.
    /// A level never holds more than its side, so this also bounds the level.
    pub fn checked_volume(&self, quantity: Quantity) -> Result<Quantity, BookError> {
        self.volume.checked_add(quantity).ok_or_else(|| {
            BookError::InvalidArgument(format!(
                "quantity {quantity} overflows {} side volume {}",
                self.side, self.volume
            ))
        })
    }

    pub fn remove(&mut self, order_id: &str, price: Price) -> Result<Order, BookError> {
        let level = self.levels.get_mut(&price).ok_or(BookError::LevelNotFound {
            side: self.side,
            price,
        })?;
        let order = level.remove(order_id)?;
        if level.is_empty() {
            self.evict(price);
        }
        self.num_orders -= 1;
        self.volume -= order.quantity();
        Ok(order)
    }

    /// Fills `quantity` against the head order of the level at `price`,
    /// evicting the level once it drains. Returns the head if it was
    /// completely filled.
    pub(crate) fn fill_front(&mut self, price: Price, quantity: Quantity) -> Result<Option<Order>, BookError> {
        let level = self.levels.get_mut(&price).ok_or(BookError::LevelNotFound {
            side: self.side,
            price,
        })?;
        let filled = level.fill_front(quantity)?;
        if level.is_empty() {
            self.evict(price);
        }
        if filled.is_some() {
            self.num_orders -= 1;
        }
        self.volume -= quantity;
        Ok(filled)
    }

    fn evict(&mut self, price: Price) {
        self.levels.remove(&price);
        trace!(side = %self.side, %price, "evicted empty level");
    }
}
