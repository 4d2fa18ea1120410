//! Connection manager against any JSON feed that tags frames with `"type"`.
//!
//! Queues a subscription and an order while offline, connects, and prints
//! every frame routed under `trade` or the fallback `message` event.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=debug cargo run --example echo_feed --features tracing -- wss://ws.postman-echo.com/raw
//! ```

use std::time::Duration;

use market_stream::types::Priority;
use market_stream::ws::events::{CONNECTED, ERROR, MESSAGE};
use market_stream::ws::{Config, ConnectionManager, Event};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wss://ws.postman-echo.com/raw".to_owned());

    let config = Config::builder()
        .heartbeat_interval(Duration::from_secs(10))
        .build();
    let manager = ConnectionManager::new(&endpoint, config)?;

    manager.on(CONNECTED, |_| {
        info!("Connected");
        Ok(())
    });
    manager.on(ERROR, |event| {
        error!(event = ?event, "Feed error");
        Ok(())
    });
    for name in ["trade", "subscribe", MESSAGE] {
        manager.on(name, |event| {
            if let Event::Message(frame) = event {
                info!(kind = frame.event_name(), body = %frame.body(), "Frame");
            }
            Ok(())
        });
    }

    manager.subscribe_channel("BTC-trade", None)?;
    manager.send_json(&json!({ "type": "trade", "price": "64250.10" }), Priority::Normal)?;
    info!(status = ?manager.status(), "Queued while offline");

    manager.connect()?;
    tokio::time::sleep(Duration::from_secs(15)).await;

    info!(status = ?manager.status(), "Disconnecting");
    manager.disconnect()?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    Ok(())
}
