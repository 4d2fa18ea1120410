#![cfg(feature = "binance")]
#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

mod common;

use std::time::Duration;

use futures_util::StreamExt as _;
use market_stream::binance::{
    Client, DepthLevels, DepthSpeed, KlineInterval, MarketEvent, StreamKind, StreamName,
};
use market_stream::types::dec;
use market_stream::ws::events::Event;
use market_stream::ws::{Config, InboundFrame, ReconnectConfig};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::common::MockWsServer;

fn config() -> Config {
    Config::builder()
        .close_timeout(Duration::from_secs(1))
        .reconnect(
            ReconnectConfig::builder()
                .base_interval(Duration::from_millis(50))
                .build(),
        )
        .build()
}

async fn request(server: &mut MockWsServer) -> Value {
    serde_json::from_str(&server.recv_request().await.unwrap()).unwrap()
}

async fn wait_for(events: &mut broadcast::Receiver<Event>, name: &str) -> Event {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if event.name() == name {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {name}"))
}

fn trade_payload(symbol: &str, price: &str) -> String {
    json!({
        "e": "trade", "E": 1_672_515_782_136_i64, "s": symbol, "t": 1,
        "p": price, "q": "0.25", "T": 1_672_515_782_136_i64, "m": false, "M": true
    })
    .to_string()
}

#[tokio::test]
async fn typed_trades_for_subscribed_symbols() {
    let mut server = MockWsServer::start().await;
    let client = Client::with_endpoint(&server.ws_url("/ws"), config()).unwrap();

    let trades = client.subscribe_trades(&["btcusdt"]).unwrap();
    let mut trades = Box::pin(trades);
    client.connect().unwrap();

    assert_eq!(
        request(&mut server).await,
        json!({ "method": "SUBSCRIBE", "params": ["btcusdt@trade"], "id": 2 })
    );

    server.send(r#"{"result":null,"id":2}"#);
    server.send(&trade_payload("ETHUSDT", "1200.00"));
    server.send(&trade_payload("BTCUSDT", "16500.10"));

    let trade = timeout(Duration::from_secs(5), trades.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(trade.symbol, "BTCUSDT");
    assert_eq!(trade.price, dec!(16500.10));
    assert_eq!(trade.quantity, dec!(0.25));
}

#[tokio::test]
async fn depth_snapshot_from_combined_envelope() {
    let mut server = MockWsServer::start().await;
    let client = Client::with_endpoint(&server.ws_url("/ws"), config()).unwrap();

    let depth = client
        .subscribe_depth("BTCUSDT", DepthLevels::Five, DepthSpeed::Standard)
        .unwrap();
    let mut depth = Box::pin(depth);
    client.connect().unwrap();

    assert_eq!(
        request(&mut server).await["params"],
        json!(["btcusdt@depth5"])
    );

    server.send(
        r#"{"stream":"btcusdt@depth5","data":{"lastUpdateId":42,"bids":[["16500.00","1.5"]],"asks":[["16500.50","0.2"]]}}"#,
    );

    let snapshot = timeout(Duration::from_secs(5), depth.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.last_update_id, 42);
    assert_eq!(snapshot.bids[0].quantity, dec!(1.5));
    assert_eq!(snapshot.asks[0].price, dec!(16500.50));
}

#[tokio::test]
async fn reconnect_replays_streams_in_one_request() {
    let mut server = MockWsServer::start().await;
    let client = Client::with_endpoint(&server.ws_url("/ws"), config()).unwrap();
    let mut events = client.events();

    let streams = client
        .subscribe_streams(&["btcusdt", "ethusdt"], &[StreamKind::Trade])
        .unwrap();
    assert_eq!(
        streams,
        vec![StreamName::trade("btcusdt"), StreamName::trade("ethusdt")]
    );
    client.connect().unwrap();
    wait_for(&mut events, "connected").await;

    // The first connection replays the registry as one batch.
    assert_eq!(
        request(&mut server).await,
        json!({ "method": "SUBSCRIBE", "params": ["btcusdt@trade", "ethusdt@trade"], "id": 3 })
    );

    client.unsubscribe(&StreamName::trade("btcusdt")).unwrap();
    assert_eq!(
        request(&mut server).await,
        json!({ "method": "UNSUBSCRIBE", "params": ["btcusdt@trade"], "id": 4 })
    );

    server.drop_connections();
    wait_for(&mut events, "disconnected").await;
    wait_for(&mut events, "connected").await;

    assert_eq!(
        request(&mut server).await,
        json!({ "method": "SUBSCRIBE", "params": ["ethusdt@trade"], "id": 5 })
    );
}

#[tokio::test]
async fn heartbeat_lists_subscriptions() {
    let mut server = MockWsServer::start().await;
    let config = Config::builder()
        .heartbeat_interval(Duration::from_millis(100))
        .build();
    let client = Client::with_endpoint(&server.ws_url("/ws"), config).unwrap();
    let mut events = client.events();

    client.connect().unwrap();
    wait_for(&mut events, "connected").await;

    let probe = request(&mut server).await;
    assert_eq!(probe["method"], "LIST_SUBSCRIPTIONS");

    server.send(&json!({ "result": [], "id": probe["id"] }).to_string());
    let Event::Message(frame) = wait_for(&mut events, "subscriptions").await else {
        unreachable!()
    };
    assert!(matches!(frame, InboundFrame::Heartbeat { .. }));
}

#[tokio::test]
async fn market_events_surface_decode_failures() {
    let mut server = MockWsServer::start().await;
    let client = Client::with_endpoint(&server.ws_url("/ws"), config()).unwrap();

    let mut market = Box::pin(client.market_events());
    client
        .subscribe(&StreamName::kline("btcusdt", KlineInterval::OneMinute))
        .unwrap();
    client.connect().unwrap();
    request(&mut server).await;

    server.send(r#"{"e":"kline","s":"BTCUSDT"}"#);
    server.send(r#"{"e":"listStatus","s":"BTCUSDT"}"#);

    let first = timeout(Duration::from_secs(5), market.next())
        .await
        .unwrap()
        .unwrap();
    assert!(first.is_err(), "a kline without its fields must not decode");

    let second = timeout(Duration::from_secs(5), market.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(second, MarketEvent::Other);
}
