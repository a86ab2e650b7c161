pub mod config;
pub mod engine;
pub mod logging;
pub mod matching;
pub mod models;

pub use engine::{EngineError, MatchingEngine};
pub use matching::{BookError, ExecutionReport, OrderBook, OrderSide, OrderState, PriceLevel};
pub use models::{MarketView, Order, OrderId, Price, Quantity, Side, Trade};
