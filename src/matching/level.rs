use std::collections::VecDeque;

use rust_decimal::Decimal;

use crate::matching::BookError;
use crate::models::{Order, Price, Quantity};

/// FIFO queue of resting orders sharing one price.
///
/// `volume` is kept equal to the sum of the queued quantities by every
/// mutating method; it is never recomputed from the queue.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Price,
    orders: VecDeque<Order>,
    volume: Quantity,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::with_capacity(4),
            volume: Decimal::ZERO,
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn volume(&self) -> Quantity {
        self.volume
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Oldest order still queued.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.iter().find(|order| order.id() == order_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn enqueue(&mut self, order: Order) -> Result<(), BookError> {
        if order.price() != self.price {
            return Err(BookError::InvariantViolation(format!(
                "order {} priced {} enqueued at level {}",
                order.id(),
                order.price(),
                self.price
            )));
        }
        self.volume = self.volume.checked_add(order.quantity()).ok_or_else(|| {
            BookError::InvalidArgument(format!(
                "order {} quantity {} overflows volume at level {}",
                order.id(),
                order.quantity(),
                self.price
            ))
        })?;
        self.orders.push_back(order);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Result<Order, BookError> {
        let order = self.orders.pop_front().ok_or(BookError::EmptyLevel(self.price))?;
        self.volume -= order.quantity();
        Ok(order)
    }

    pub fn remove(&mut self, order_id: &str) -> Result<Order, BookError> {
        let idx = self
            .orders
            .iter()
            .position(|order| order.id() == order_id)
            .ok_or_else(|| BookError::OrderNotFound(order_id.to_string()))?;
        let order = self
            .orders
            .remove(idx)
            .ok_or_else(|| BookError::OrderNotFound(order_id.to_string()))?;
        self.volume -= order.quantity();
        Ok(order)
    }

    /// Takes `quantity` off the head order and the level volume in one step.
    /// A head filled to zero is dequeued and handed back.
    pub(crate) fn fill_front(&mut self, quantity: Quantity) -> Result<Option<Order>, BookError> {
        let head = self.orders.front_mut().ok_or(BookError::EmptyLevel(self.price))?;
        if quantity <= Decimal::ZERO || quantity > head.quantity() {
            return Err(BookError::InvariantViolation(format!(
                "fill of {} against order {} with {} remaining",
                quantity,
                head.id(),
                head.quantity()
            )));
        }
        head.fill(quantity);
        self.volume -= quantity;
        if head.quantity().is_zero() {
            return Ok(self.orders.pop_front());
        }
        Ok(None)
    }
}
