use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;

use crate::Result;
use crate::types::Payload;
use crate::ws::error::WsError;
use crate::ws::frame::{InboundFrame, parse_json_frames};
use crate::ws::subscription::SubscriptionEntry;
use crate::ws::traits::{FeedProtocol, MessageParser};

/// Kind of the ack sent for a successful `SUBSCRIBE`/`UNSUBSCRIBE`.
pub const RESULT_KIND: &str = "result";
/// Kind of the `LIST_SUBSCRIPTIONS` response used as heartbeat reply.
pub const SUBSCRIPTIONS_KIND: &str = "subscriptions";
/// Kind of the reply to a rejected request.
pub const REQUEST_ERROR_KIND: &str = "request_error";
/// Kind assigned to partial book depth payloads, which carry no `e` field.
pub const DEPTH_SNAPSHOT_KIND: &str = "depthSnapshot";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum Method {
    Subscribe,
    Unsubscribe,
    ListSubscriptions,
}

#[derive(Debug, Serialize)]
struct StreamRequest<'streams> {
    method: Method,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<&'streams str>,
    id: u64,
}

/// Live-subscription commands for the Binance stream endpoint.
///
/// Every request carries a fresh, monotonically increasing id.
#[derive(Debug, Default)]
pub struct BinanceProtocol {
    next_id: AtomicU64,
}

impl BinanceProtocol {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn request(&self, method: Method, params: Vec<&str>) -> Result<Payload> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Payload::json(&StreamRequest { method, params, id })
    }
}

impl FeedProtocol for BinanceProtocol {
    fn subscribe(&self, entry: &SubscriptionEntry) -> Result<Payload> {
        if entry.channel.is_empty() {
            return Err(WsError::SubscriptionFailed("stream name is empty".to_owned()).into());
        }
        self.request(Method::Subscribe, vec![entry.channel.as_str()])
    }

    fn unsubscribe(&self, channel: &str) -> Result<Payload> {
        self.request(Method::Unsubscribe, vec![channel])
    }

    /// All active streams in a single `SUBSCRIBE` request.
    fn resubscribe(&self, entries: &[&SubscriptionEntry]) -> Result<Vec<Payload>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let streams = entries.iter().map(|entry| entry.channel.as_str()).collect();
        Ok(vec![self.request(Method::Subscribe, streams)?])
    }

    fn heartbeat(&self) -> Option<Payload> {
        self.request(Method::ListSubscriptions, Vec::new()).ok()
    }
}

/// Classifies Binance stream payloads.
///
/// Market events are keyed by their `e` field. Request replies, combined-stream
/// envelopes and partial depth payloads are recognized by shape.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceParser;

impl BinanceParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn classify(&self, body: Value) -> InboundFrame {
        let body = match body {
            Value::Object(mut envelope)
                if envelope.contains_key("stream") && envelope.contains_key("data") =>
            {
                envelope.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };

        if let Some(kind) = body.get("e").and_then(Value::as_str) {
            return InboundFrame::Data {
                kind: kind.to_owned(),
                body,
            };
        }

        if body.get("id").is_some() {
            if body.get("error").is_some() {
                return InboundFrame::Ack {
                    kind: REQUEST_ERROR_KIND.to_owned(),
                    body,
                };
            }
            match body.get("result") {
                Some(Value::Array(_)) => {
                    return InboundFrame::Heartbeat {
                        kind: SUBSCRIPTIONS_KIND.to_owned(),
                        body,
                    };
                }
                Some(_) => {
                    return InboundFrame::Ack {
                        kind: RESULT_KIND.to_owned(),
                        body,
                    };
                }
                None => {}
            }
        }

        if body.get("lastUpdateId").is_some() {
            return InboundFrame::Data {
                kind: DEPTH_SNAPSHOT_KIND.to_owned(),
                body,
            };
        }

        InboundFrame::Unknown(body)
    }
}

impl MessageParser for BinanceParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<InboundFrame>> {
        Ok(parse_json_frames(bytes)?
            .into_iter()
            .map(|body| self.classify(body))
            .collect())
    }
}
