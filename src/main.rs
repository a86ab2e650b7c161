use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;

use clob_core::config::Settings;
use clob_core::{logging, MatchingEngine, Order, Side};

#[derive(Parser, Debug)]
#[command(name = "clob-core")]
struct Args {
    #[arg(long)]
    config: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    logging::init(&settings.logging)?;
    if settings.instruments.is_empty() {
        settings.instruments.push("demo".to_string());
    }

    let engine = MatchingEngine::from_settings(&settings)?;
    let market = settings.instruments[0].as_str();

    let ask = Order::new("a-1", "maker", Side::Sell, Decimal::new(5, 0), Decimal::new(1000, 1), Utc::now());
    let bid = Order::new("b-1", "taker", Side::Buy, Decimal::new(3, 0), Decimal::new(1050, 1), Utc::now());
    let low_bid = Order::new("b-2", "taker", Side::Buy, Decimal::new(2, 0), Decimal::new(995, 1), Utc::now());

    let r1 = engine.submit(market, ask)?;
    let r2 = engine.submit(market, bid)?;
    let r3 = engine.submit(market, low_bid)?;

    println!("r1: {}", serde_json::to_string(&r1)?);
    println!("r2: {}", serde_json::to_string(&r2)?);
    println!("r3: {}", serde_json::to_string(&r3)?);
    println!("overview: {}", serde_json::to_string_pretty(&engine.market_overview(market)?)?);
    Ok(())
}
