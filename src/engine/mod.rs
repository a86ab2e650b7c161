use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::config::Settings;
use crate::matching::{BookError, ExecutionReport, OrderBook};
use crate::models::{MarketView, Order, Price, Quantity, Side};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("unknown instrument {0}")]
    UnknownInstrument(String),
    #[error("instrument {0} already registered")]
    DuplicateInstrument(String),
    #[error(transparent)]
    Book(#[from] BookError),
}

/// One order book per instrument, each behind its own lock.
///
/// The registry map is only touched to look a book up; the `Arc` is cloned
/// out before the book mutex is taken, so work on one instrument never
/// waits on another.
#[derive(Default)]
pub struct MatchingEngine {
    books: DashMap<String, Arc<Mutex<OrderBook>>>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        let engine = Self::new();
        for symbol in &settings.instruments {
            engine.add_instrument(symbol)?;
        }
        Ok(engine)
    }

    pub fn add_instrument(&self, symbol: &str) -> Result<(), EngineError> {
        match self.books.entry(symbol.to_string()) {
            Entry::Occupied(_) => Err(EngineError::DuplicateInstrument(symbol.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(OrderBook::new(symbol))));
                info!(%symbol, "order book created");
                Ok(())
            }
        }
    }

    /// Unregisters `symbol` and returns its book. If a handle from
    /// [`MatchingEngine::book`] is still alive elsewhere, the result is a
    /// snapshot taken under the lock; later changes made through that
    /// handle are not reflected in it.
    pub fn remove_instrument(&self, symbol: &str) -> Option<OrderBook> {
        let (_, book) = self.books.remove(symbol)?;
        info!(%symbol, "order book removed");
        Some(match Arc::try_unwrap(book) {
            Ok(book) => book.into_inner(),
            Err(shared) => shared.lock().clone(),
        })
    }

    pub fn instruments(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.books.iter().map(|entry| entry.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Shared handle to one book. Callers holding the lock get the same
    /// exclusion as the engine's own operations.
    pub fn book(&self, symbol: &str) -> Result<Arc<Mutex<OrderBook>>, EngineError> {
        self.books
            .get(symbol)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::UnknownInstrument(symbol.to_string()))
    }

    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub fn submit(&self, symbol: &str, order: Order) -> Result<ExecutionReport, EngineError> {
        let book = self.book(symbol)?;
        let mut book = book.lock();
        book.submit(order).map_err(|err| {
            warn!(%err, "order rejected");
            err.into()
        })
    }

    #[instrument(skip(self))]
    pub fn submit_market(
        &self,
        symbol: &str,
        order_id: &str,
        account_id: &str,
        side: Side,
        quantity: Quantity,
    ) -> Result<ExecutionReport, EngineError> {
        let book = self.book(symbol)?;
        let mut book = book.lock();
        Ok(book.submit_market(order_id, account_id, side, quantity)?)
    }

    #[instrument(skip(self))]
    pub fn cancel(&self, symbol: &str, order_id: &str, side: Side, price: Price) -> Result<Order, EngineError> {
        let book = self.book(symbol)?;
        let mut book = book.lock();
        Ok(book.cancel(order_id, side, price)?)
    }

    #[instrument(skip(self))]
    pub fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<Order, EngineError> {
        let book = self.book(symbol)?;
        let mut book = book.lock();
        Ok(book.cancel_order(order_id)?)
    }

    pub fn market_overview(&self, symbol: &str) -> Result<MarketView, EngineError> {
        let book = self.book(symbol)?;
        let book = book.lock();
        Ok(book.market_overview())
    }
}
