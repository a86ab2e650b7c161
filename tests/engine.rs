use std::sync::Arc;
use std::thread;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use clob_core::{EngineError, MatchingEngine, Order, Side};

#[test]
fn concurrent_submits_across_instruments() {
    let engine = Arc::new(MatchingEngine::new());
    let symbols = ["AAA", "BBB", "CCC", "DDD"];
    for symbol in symbols {
        engine.add_instrument(symbol).unwrap();
    }

    let handles: Vec<_> = symbols
        .iter()
        .flat_map(|&symbol| {
            (0..2).map(move |worker| (symbol, worker))
        })
        .map(|(symbol, worker)| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let side = if worker == 0 { Side::Buy } else { Side::Sell };
                for i in 0..250 {
                    let price = if side == Side::Buy { dec!(99) } else { dec!(101) };
                    let order = Order::new(
                        format!("{symbol}-{worker}-{i}"),
                        "acct",
                        side,
                        dec!(1),
                        price,
                        Utc::now(),
                    );
                    engine.submit(symbol, order).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for symbol in symbols {
        let view = engine.market_overview(symbol).unwrap();
        assert_eq!(view.bids["99"], Decimal::from(250));
        assert_eq!(view.asks["101"], Decimal::from(250));
    }
}

#[test]
fn concurrent_crossing_flow_conserves_quantity() {
    let engine = Arc::new(MatchingEngine::new());
    engine.add_instrument("X").unwrap();

    let handles: Vec<_> = [Side::Buy, Side::Sell]
        .into_iter()
        .map(|side| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut traded = Decimal::ZERO;
                for i in 0..500 {
                    let order = Order::new(format!("{side}-{i}"), "acct", side, dec!(1), dec!(100), Utc::now());
                    let report = engine.submit("X", order).unwrap();
                    traded += report.filled_quantity();
                }
                traded
            })
        })
        .collect();
    let traded: Decimal = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let book = engine.book("X").unwrap();
    let book = book.lock();
    assert!(!book.is_crossed());
    let resting = book.order_side(Side::Buy).volume() + book.order_side(Side::Sell).volume();
    assert_eq!(traded * Decimal::TWO + resting, Decimal::from(1_000));
}

#[test]
fn cancel_routes_to_the_right_book() {
    let engine = MatchingEngine::new();
    engine.add_instrument("A").unwrap();
    engine.add_instrument("B").unwrap();
    engine
        .submit("A", Order::new("o1", "acct", Side::Buy, dec!(1), dec!(10), Utc::now()))
        .unwrap();

    let err = engine.cancel_order("B", "o1").unwrap_err();
    assert!(matches!(err, EngineError::Book(ref e) if e.is_not_found()));
    let order = engine.cancel("A", "o1", Side::Buy, dec!(10)).unwrap();
    assert_eq!(order.id(), "o1");
    assert!(engine.market_overview("A").unwrap().is_empty());
}
