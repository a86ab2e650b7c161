pub mod level;
pub mod orderbook;
pub mod side;

use serde::{Deserialize, Serialize};

use crate::models::{OrderId, Price, Quantity, Side, Trade};

pub use level::PriceLevel;
pub use orderbook::OrderBook;
pub use side::OrderSide;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
    #[error("no {side} level at price {price}")]
    LevelNotFound { side: Side, price: Price },
    #[error("level at price {0} is empty")]
    EmptyLevel(Price),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl BookError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::OrderNotFound(_) | Self::LevelNotFound { .. } | Self::EmptyLevel(_)
        )
    }
}

/// Terminal state of an incoming order once `submit` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Resting,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionReport {
    /// Fully matched; nothing rests.
    Filled {
        order_id: OrderId,
        trades: Vec<Trade>,
    },
    /// Remainder posted on the order's own side.
    Resting {
        order_id: OrderId,
        remaining: Quantity,
        trades: Vec<Trade>,
    },
    /// Unpriced remainder dropped for lack of contra liquidity.
    Cancelled {
        order_id: OrderId,
        remaining: Quantity,
        trades: Vec<Trade>,
    },
}

impl ExecutionReport {
    pub fn order_id(&self) -> &str {
        match self {
            Self::Filled { order_id, .. }
            | Self::Resting { order_id, .. }
            | Self::Cancelled { order_id, .. } => order_id,
        }
    }

    pub fn trades(&self) -> &[Trade] {
        match self {
            Self::Filled { trades, .. }
            | Self::Resting { trades, .. }
            | Self::Cancelled { trades, .. } => trades,
        }
    }

    pub fn remaining(&self) -> Quantity {
        match *self {
            Self::Filled { .. } => Quantity::ZERO,
            Self::Resting { remaining, .. } | Self::Cancelled { remaining, .. } => remaining,
        }
    }

    pub fn state(&self) -> OrderState {
        match self {
            Self::Filled { .. } => OrderState::Filled,
            Self::Resting { .. } => OrderState::Resting,
            Self::Cancelled { .. } => OrderState::Cancelled,
        }
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.trades().iter().map(|trade| trade.quantity).sum()
    }
}
