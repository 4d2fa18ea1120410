//! Live Binance trades and tickers with automatic reconnects.
//!
//! Subscribes to trades for a few symbols plus the default ticker/kline/trade
//! set, prints typed events, and logs connection lifecycle changes.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info,market_stream=debug cargo run --example binance_trades --features binance,tracing
//! ```

use std::time::Duration;

use futures::StreamExt as _;
use market_stream::binance::{Client, MarketEvent};
use market_stream::ws::Config;
use market_stream::ws::events::{DISCONNECTED, Event, RECONNECT_EXHAUSTED, RECONNECT_SCHEDULED};
use tokio::time::timeout;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::new(Config::default())?;

    for name in [DISCONNECTED, RECONNECT_SCHEDULED, RECONNECT_EXHAUSTED] {
        client.on(name, |event| {
            match event {
                Event::ReconnectExhausted { attempts } => {
                    warn!(attempts, "Giving up on Binance, call connect() to retry");
                }
                other => info!(event = ?other, "Connection lifecycle"),
            }
            Ok(())
        });
    }

    let trades = client.subscribe_trades(&["btcusdt", "ethusdt"])?;
    let streams = client.subscribe_defaults()?;
    info!(count = streams.len(), "Subscribed to default streams");

    let mut market = Box::pin(client.market_events());
    client.connect()?;

    let mut trades = Box::pin(trades);
    let mut received = 0;
    while let Ok(Some(result)) = timeout(Duration::from_secs(10), trades.next()).await {
        match result {
            Ok(trade) => {
                info!(
                    symbol = %trade.symbol,
                    price = %trade.price,
                    quantity = %trade.quantity,
                    time = %trade.trade_time,
                    "Trade"
                );
                received += 1;
                if received >= 10 {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Trade stream error"),
        }
    }

    let mut tickers = 0;
    while let Ok(Some(result)) = timeout(Duration::from_secs(10), market.next()).await {
        match result {
            Ok(MarketEvent::Ticker(ticker)) => {
                info!(
                    symbol = %ticker.symbol,
                    last = %ticker.last_price,
                    change = %ticker.price_change_percent,
                    "24h ticker"
                );
                tickers += 1;
                if tickers >= 5 {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Market stream error"),
        }
    }

    info!(status = ?client.status(), "Disconnecting");
    client.disconnect()?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    Ok(())
}
