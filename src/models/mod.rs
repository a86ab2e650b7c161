use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::matching::BookError;

pub type OrderId = String;
pub type AccountId = String;
pub type Price = Decimal;
pub type Quantity = Decimal;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// True when `a` has strictly higher priority than `b` on this side.
    pub fn is_better(self, a: Price, b: Price) -> bool {
        match self {
            Self::Buy => a > b,
            Self::Sell => a < b,
        }
    }

    /// True when an incoming order on this side limited at `limit` can trade
    /// against a resting contra level at `contra`.
    pub fn crosses(self, limit: Price, contra: Price) -> bool {
        match self {
            Self::Buy => limit >= contra,
            Self::Sell => limit <= contra,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// A limit order. Every field is fixed at construction except the quantity,
/// which only shrinks as the order is filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    account_id: AccountId,
    timestamp: DateTime<Utc>,
    quantity: Quantity,
    price: Price,
    side: Side,
}

impl Order {
    pub fn new(
        id: impl Into<OrderId>,
        account_id: impl Into<AccountId>,
        side: Side,
        quantity: Quantity,
        price: Price,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            timestamp,
            quantity,
            price,
            side,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Checks the ingestion contract: non-empty id, positive quantity and price.
    pub fn validate(&self) -> Result<(), BookError> {
        if self.id.is_empty() {
            return Err(BookError::InvalidArgument("order id is empty".to_string()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(BookError::InvalidArgument(format!(
                "order {} has non-positive quantity {}",
                self.id, self.quantity
            )));
        }
        if self.price <= Decimal::ZERO {
            return Err(BookError::InvalidArgument(format!(
                "order {} has non-positive price {}",
                self.id, self.price
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, BookError> {
        serde_json::to_string(self).map_err(|err| BookError::InvalidArgument(err.to_string()))
    }

    /// Decodes the wire form. Unknown sides and malformed decimals are
    /// reported as `InvalidArgument`.
    pub fn from_json(raw: &str) -> Result<Self, BookError> {
        serde_json::from_str(raw).map_err(|err| BookError::InvalidArgument(err.to_string()))
    }

    pub(crate) fn fill(&mut self, quantity: Quantity) {
        self.quantity -= quantity;
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {}@{} {}",
            self.id,
            self.account_id,
            self.side,
            self.quantity,
            self.price,
            self.timestamp.to_rfc3339()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_account_id: AccountId,
    pub taker_account_id: AccountId,
    pub taker_side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

/// Aggregated volume per price for each side of a book, keyed by the
/// canonical string of the price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketView {
    pub asks: BTreeMap<String, Quantity>,
    pub bids: BTreeMap<String, Quantity>,
}

impl MarketView {
    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub volume: Quantity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDepth {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Canonical decimal form used for price keys: trailing fractional zeros are
/// dropped, so `10.50` and `10.5` map to the same key.
pub fn price_key(price: Price) -> String {
    price.normalize().to_string()
}
