#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

mod common;

use std::time::Duration;

use futures_util::StreamExt as _;
use market_stream::ws::events::{ErrorDetail, Event};
use market_stream::ws::{Config, ConnectionManager, InboundFrame, ReconnectConfig};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

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

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn subscribes_and_receives_frames() {
    let mut server = MockWsServer::start().await;
    let manager = ConnectionManager::new(&server.ws_url("/ws"), config()).unwrap();
    let mut events = manager.events();

    manager.subscribe_channel("BTC-trade", Some(json!({ "depth": 5 }))).unwrap();
    manager.connect().unwrap();
    wait_for(&mut events, "connected").await;

    let request = server.recv_request().await.unwrap();
    assert_eq!(
        parse(&request),
        json!({ "type": "subscribe", "channel": "BTC-trade", "params": { "depth": 5 } })
    );

    server.send(r#"{"type":"trade","channel":"BTC-trade","price":"64250.10"}"#);

    let Event::Message(InboundFrame::Data { kind, body }) = wait_for(&mut events, "trade").await
    else {
        panic!("expected a data frame");
    };
    assert_eq!(kind, "trade");
    assert_eq!(body["price"], "64250.10");
}

#[tokio::test]
async fn event_stream_yields_acks_and_batches() {
    let mut server = MockWsServer::start().await;
    let manager = ConnectionManager::new(&server.ws_url("/ws"), config()).unwrap();
    let mut stream = Box::pin(manager.event_stream());

    manager.subscribe_channel("ETH-trade", None).unwrap();
    manager.connect().unwrap();
    server.recv_request().await.unwrap();

    server.send(r#"[{"type":"subscribed","channel":"ETH-trade"},{"type":"trade","price":"1"}]"#);

    let mut frames = Vec::new();
    timeout(Duration::from_secs(5), async {
        while frames.len() < 2 {
            if let Some(Ok(Event::Message(frame))) = stream.next().await {
                frames.push(frame);
            }
        }
    })
    .await
    .unwrap();

    assert!(matches!(&frames[0], InboundFrame::Ack { kind, .. } if kind == "subscribed"));
    assert!(matches!(&frames[1], InboundFrame::Data { kind, .. } if kind == "trade"));
}

#[tokio::test]
async fn server_drop_reconnects_and_resubscribes() {
    let mut server = MockWsServer::start().await;
    let manager = ConnectionManager::new(&server.ws_url("/ws"), config()).unwrap();
    let mut events = manager.events();

    manager.subscribe_channel("BTC-trade", None).unwrap();
    manager.subscribe_channel("ETH-trade", None).unwrap();
    manager.connect().unwrap();
    wait_for(&mut events, "connected").await;
    assert_eq!(parse(&server.recv_request().await.unwrap()), subscribe("BTC-trade"));
    assert_eq!(parse(&server.recv_request().await.unwrap()), subscribe("ETH-trade"));

    server.drop_connections();

    let Event::Disconnected { was_clean, .. } = wait_for(&mut events, "disconnected").await else {
        unreachable!()
    };
    assert!(!was_clean);
    assert!(matches!(
        wait_for(&mut events, "reconnect-scheduled").await,
        Event::ReconnectScheduled { attempt: 1, .. }
    ));
    wait_for(&mut events, "connected").await;

    let mut replayed = vec![
        parse(&server.recv_request().await.unwrap()),
        parse(&server.recv_request().await.unwrap()),
    ];
    replayed.sort_by_key(ToString::to_string);
    assert_eq!(
        replayed,
        vec![subscribe("BTC-trade"), subscribe("ETH-trade")]
    );
    assert_eq!(server.connection_count(), 2);
}

#[tokio::test]
async fn malformed_frame_keeps_connection() {
    let server = MockWsServer::start().await;
    let manager = ConnectionManager::new(&server.ws_url("/ws"), config()).unwrap();
    let mut events = manager.events();

    manager.connect().unwrap();
    wait_for(&mut events, "connected").await;

    server.send("not json at all");

    let Event::Error(ErrorDetail::Parse { raw, .. }) = wait_for(&mut events, "error").await else {
        panic!("expected a parse error");
    };
    assert_eq!(raw, "not json at all");

    server.send(r#"{"type":"trade"}"#);
    wait_for(&mut events, "trade").await;
    assert!(manager.state().is_connected());
}

#[tokio::test]
async fn disconnect_closes_cleanly() {
    let server = MockWsServer::start().await;
    let manager = ConnectionManager::new(&server.ws_url("/ws"), config()).unwrap();
    let mut events = manager.events();

    manager.connect().unwrap();
    wait_for(&mut events, "connected").await;
    manager.disconnect().unwrap();

    assert_eq!(
        wait_for(&mut events, "disconnected").await,
        Event::Disconnected {
            code: 1000,
            reason: "client disconnect".to_owned(),
            was_clean: true,
        }
    );

    let retry = timeout(Duration::from_millis(500), wait_for(&mut events, "reconnect-scheduled")).await;
    assert!(retry.is_err(), "a requested close is never retried");
}

#[tokio::test]
async fn unreachable_endpoint_schedules_retries() {
    let manager = ConnectionManager::new("ws://127.0.0.1:1/ws", config()).unwrap();
    let mut events = manager.events();

    manager.connect().unwrap();

    assert!(matches!(
        wait_for(&mut events, "error").await,
        Event::Error(ErrorDetail::Transport(_))
    ));
    assert!(matches!(
        wait_for(&mut events, "reconnect-scheduled").await,
        Event::ReconnectScheduled { attempt: 1, .. }
    ));
    assert!(!manager.status().connected);
}

#[tokio::test]
async fn silent_peer_fails_heartbeat() {
    let endpoint = silent_server().await;
    let config = Config::builder()
        .heartbeat_interval(Duration::from_millis(50))
        .heartbeat_timeout(Duration::from_millis(200))
        .reconnect(
            ReconnectConfig::builder()
                .base_interval(Duration::from_millis(50))
                .build(),
        )
        .build();
    let manager = ConnectionManager::new(&endpoint, config).unwrap();
    let mut events = manager.events();

    manager.connect().unwrap();
    wait_for(&mut events, "connected").await;

    assert_eq!(
        wait_for(&mut events, "error").await,
        Event::Error(ErrorDetail::Heartbeat)
    );
    assert_eq!(
        wait_for(&mut events, "disconnected").await,
        Event::Disconnected {
            code: 1006,
            reason: "heartbeat timeout".to_owned(),
            was_clean: false,
        }
    );
    wait_for(&mut events, "reconnect-scheduled").await;
    wait_for(&mut events, "connected").await;
}

#[tokio::test]
async fn responsive_peer_stays_connected() {
    let server = MockWsServer::start().await;
    let config = Config::builder()
        .heartbeat_interval(Duration::from_millis(50))
        .heartbeat_timeout(Duration::from_millis(200))
        .build();
    let manager = ConnectionManager::new(&server.ws_url("/ws"), config).unwrap();
    let mut events = manager.events();

    manager.connect().unwrap();
    wait_for(&mut events, "connected").await;
    sleep(Duration::from_secs(1)).await;

    assert!(manager.state().is_connected());
    assert_eq!(server.connection_count(), 1);
}

/// Completes the handshake, then never reads, answers or closes.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await {
                held.push(ws_stream);
            }
        }
    });

    format!("ws://{addr}/ws")
}

fn subscribe(channel: &str) -> Value {
    json!({ "type": "subscribe", "channel": channel })
}
