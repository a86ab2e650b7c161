use chrono::Utc;
use rust_decimal_macros::dec;

use clob_core::config::{LogFormat, Settings};
use clob_core::matching::{OrderSide, PriceLevel};
use clob_core::{BookError, ExecutionReport, Order, Side};

#[test]
fn level_dequeue_is_fifo() {
    let mut level = PriceLevel::new(dec!(42));
    for id in ["first", "second", "third"] {
        level
            .enqueue(Order::new(id, "acct", Side::Sell, dec!(1), dec!(42), Utc::now()))
            .unwrap();
    }
    assert_eq!(level.dequeue().unwrap().id(), "first");
    level.remove("second").unwrap();
    assert_eq!(level.dequeue().unwrap().id(), "third");
    assert!(level.is_empty());
    assert!(level.volume().is_zero());
}

#[test]
fn side_traversal_covers_every_level_once() {
    let mut side = OrderSide::new(Side::Buy);
    for (i, price) in [dec!(3), dec!(1), dec!(2), dec!(1.5)].into_iter().enumerate() {
        side.insert(Order::new(format!("o{i}"), "acct", Side::Buy, dec!(1), price, Utc::now()))
            .unwrap();
    }
    let mut walked = Vec::new();
    let mut cursor = side.best_level();
    while let Some(level) = cursor {
        walked.push(level.price());
        cursor = side.next_level(level.price());
    }
    assert_eq!(walked, vec![dec!(3), dec!(2), dec!(1.5), dec!(1)]);
}

#[test]
fn report_serializes_with_trades() {
    let mut book = clob_core::OrderBook::new("m");
    book.submit(Order::new("s", "maker", Side::Sell, dec!(1), dec!(5), Utc::now()))
        .unwrap();
    let report = book
        .submit(Order::new("b", "taker", Side::Buy, dec!(1), dec!(5), Utc::now()))
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["Filled"]["trades"][0]["makerAccountId"], "maker");
    assert_eq!(json["Filled"]["trades"][0]["takerSide"], "buy");
    let back: ExecutionReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn error_messages() {
    let err = BookError::LevelNotFound {
        side: Side::Sell,
        price: dec!(12.5),
    };
    assert_eq!(err.to_string(), "no sell level at price 12.5");
    assert!(!BookError::InvalidArgument("x".into()).is_not_found());
}

#[test]
fn example_config_loads() {
    let settings = Settings::load("config/example.yaml").unwrap();
    assert_eq!(settings.instruments, vec!["BTC-USD", "ETH-USD"]);
    assert_eq!(settings.logging.format, LogFormat::Text);
}
