//! Inbound frame classification and the default JSON wire protocol.

use std::collections::HashSet;

use serde_json::{Value, json};

use super::error::WsError;
use super::subscription::SubscriptionEntry;
use super::traits::{FeedProtocol, MessageParser};
use crate::Result;
use crate::types::Payload;

/// Event name used for frames without a discriminant.
pub const MESSAGE_EVENT: &str = "message";

const DEFAULT_DISCRIMINANT: &str = "type";
const DEFAULT_ACK_KINDS: [&str; 2] = ["subscribed", "unsubscribed"];
const DEFAULT_HEARTBEAT_KINDS: [&str; 2] = ["pong", "heartbeat"];

/// One inbound message, keyed by its discriminant value.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Subscription-control acknowledgment
    Ack { kind: String, body: Value },
    /// Response to a liveness probe
    Heartbeat { kind: String, body: Value },
    /// Domain data
    Data { kind: String, body: Value },
    /// Valid JSON without a recognizable discriminant
    Unknown(Value),
}

impl InboundFrame {
    /// The discriminant value, if the frame carried one.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Ack { kind, .. } | Self::Heartbeat { kind, .. } | Self::Data { kind, .. } => {
                Some(kind)
            }
            Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        match self {
            Self::Ack { body, .. } | Self::Heartbeat { body, .. } | Self::Data { body, .. } => {
                body
            }
            Self::Unknown(body) => body,
        }
    }

    /// Name this frame is routed under on the event hub.
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.kind().unwrap_or(MESSAGE_EVENT)
    }
}

/// Parse one text or binary frame as a JSON object or an array of objects.
///
/// Empty and whitespace-only frames yield nothing. Any other JSON value is
/// rejected as [`WsError::InvalidMessage`].
pub fn parse_json_frames(bytes: &[u8]) -> Result<Vec<Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_slice(bytes).map_err(WsError::MessageParse)?;
    let values = match value {
        Value::Array(values) => values,
        other => vec![other],
    };

    if let Some(stray) = values.iter().find(|value| !value.is_object()) {
        return Err(WsError::InvalidMessage(format!("expected a JSON object, got {stray}")).into());
    }
    Ok(values)
}

/// Classifies frames by a string discriminant field.
#[derive(Debug, Clone)]
pub struct TaggedParser {
    discriminant: String,
    ack_kinds: HashSet<String>,
    heartbeat_kinds: HashSet<String>,
}

impl Default for TaggedParser {
    fn default() -> Self {
        Self {
            discriminant: DEFAULT_DISCRIMINANT.to_owned(),
            ack_kinds: DEFAULT_ACK_KINDS.iter().map(ToString::to_string).collect(),
            heartbeat_kinds: DEFAULT_HEARTBEAT_KINDS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl TaggedParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_discriminant<S: Into<String>>(mut self, field: S) -> Self {
        self.discriminant = field.into();
        self
    }

    /// Replace the kinds classified as [`InboundFrame::Ack`].
    #[must_use]
    pub fn with_ack_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ack_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the kinds classified as [`InboundFrame::Heartbeat`].
    #[must_use]
    pub fn with_heartbeat_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.heartbeat_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn classify(&self, body: Value) -> InboundFrame {
        let Some(kind) = body
            .get(&self.discriminant)
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            return InboundFrame::Unknown(body);
        };

        if self.ack_kinds.contains(&kind) {
            InboundFrame::Ack { kind, body }
        } else if self.heartbeat_kinds.contains(&kind) {
            InboundFrame::Heartbeat { kind, body }
        } else {
            InboundFrame::Data { kind, body }
        }
    }
}

impl MessageParser for TaggedParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<InboundFrame>> {
        Ok(parse_json_frames(bytes)?
            .into_iter()
            .map(|body| self.classify(body))
            .collect())
    }
}

/// Generic JSON subscribe/unsubscribe/ping commands keyed by `"type"`.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct JsonProtocol;

impl JsonProtocol {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FeedProtocol for JsonProtocol {
    fn subscribe(&self, entry: &SubscriptionEntry) -> Result<Payload> {
        if entry.channel.is_empty() {
            return Err(WsError::SubscriptionFailed("channel name is empty".to_owned()).into());
        }
        let mut command = json!({ "type": "subscribe", "channel": entry.channel });
        if let Some(params) = &entry.params {
            command["params"] = params.clone();
        }
        Ok(Payload::from(&command))
    }

    fn unsubscribe(&self, channel: &str) -> Result<Payload> {
        Ok(Payload::from(&json!({ "type": "unsubscribe", "channel": channel })))
    }

    fn heartbeat(&self) -> Option<Payload> {
        Some(Payload::from(r#"{"type":"ping"}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    #[test]
    fn classifies_by_discriminant() {
        let parser = TaggedParser::new();
        let frames = parser
            .parse(br#"[{"type":"subscribed","channel":"BTC-trade"},{"type":"pong"},{"type":"trade","p":"1.0"},{"p":"2.0"}]"#)
            .unwrap();

        assert_eq!(frames.len(), 4);
        assert!(matches!(&frames[0], InboundFrame::Ack { kind, .. } if kind == "subscribed"));
        assert!(matches!(&frames[1], InboundFrame::Heartbeat { kind, .. } if kind == "pong"));
        assert!(matches!(&frames[2], InboundFrame::Data { kind, .. } if kind == "trade"));
        assert!(matches!(&frames[3], InboundFrame::Unknown(_)));

        assert_eq!(frames[2].event_name(), "trade");
        assert_eq!(frames[3].event_name(), MESSAGE_EVENT);
        assert_eq!(frames[2].body()["p"], "1.0");
    }

    #[test]
    fn custom_discriminant_and_kinds() {
        let parser = TaggedParser::new()
            .with_discriminant("event")
            .with_ack_kinds(["ok"])
            .with_heartbeat_kinds(Vec::<String>::new());

        let frames = parser.parse(br#"{"event":"ok"}"#).unwrap();
        assert!(matches!(&frames[0], InboundFrame::Ack { .. }));

        let frames = parser.parse(br#"{"event":"pong"}"#).unwrap();
        assert!(matches!(&frames[0], InboundFrame::Data { .. }));
    }

    #[test]
    fn non_string_discriminant_is_unknown() {
        let frames = TaggedParser::new().parse(br#"{"type":42}"#).unwrap();
        assert!(matches!(&frames[0], InboundFrame::Unknown(_)));
    }

    #[test]
    fn blank_frame_yields_nothing() {
        assert!(TaggedParser::new().parse(b"  \n").unwrap().is_empty());
        assert!(TaggedParser::new().parse(b"").unwrap().is_empty());
    }

    #[test]
    fn malformed_frame_is_a_parse_error() {
        let error = TaggedParser::new().parse(b"{not json").unwrap_err();

        assert_eq!(error.kind(), Kind::WebSocket);
        assert!(matches!(
            error.downcast_ref::<WsError>(),
            Some(WsError::MessageParse(_))
        ));
    }

    #[test]
    fn scalar_frame_is_invalid() {
        let error = TaggedParser::new().parse(br#"[{"type":"trade"},7]"#).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<WsError>(),
            Some(WsError::InvalidMessage(_))
        ));
    }

    #[test]
    fn empty_channel_cannot_be_subscribed() {
        let error = JsonProtocol
            .subscribe(&SubscriptionEntry::new("", None))
            .unwrap_err();

        assert!(matches!(
            error.downcast_ref::<WsError>(),
            Some(WsError::SubscriptionFailed(_))
        ));
    }

    #[test]
    fn json_protocol_commands() {
        let protocol = JsonProtocol;
        let entry = SubscriptionEntry::new("BTC-trade", Some(json!({ "depth": 10 })));

        let subscribe: Value =
            serde_json::from_str(protocol.subscribe(&entry).unwrap().as_text().unwrap()).unwrap();
        assert_eq!(
            subscribe,
            json!({ "type": "subscribe", "channel": "BTC-trade", "params": { "depth": 10 } })
        );

        let bare = SubscriptionEntry::new("ETH-trade", None);
        let subscribe: Value =
            serde_json::from_str(protocol.subscribe(&bare).unwrap().as_text().unwrap()).unwrap();
        assert!(subscribe.get("params").is_none());

        let unsubscribe: Value =
            serde_json::from_str(protocol.unsubscribe("BTC-trade").unwrap().as_text().unwrap())
                .unwrap();
        assert_eq!(
            unsubscribe,
            json!({ "type": "unsubscribe", "channel": "BTC-trade" })
        );

        let replay = protocol.resubscribe(&[&entry, &bare]).unwrap();
        assert_eq!(replay.len(), 2);
    }
}
