//! Strategy traits that specialize the connection core for a particular feed.

use super::frame::InboundFrame;
use super::subscription::SubscriptionEntry;
use crate::types::Payload;

/// Message parser trait for converting raw frame bytes into classified frames.
///
/// # Example
///
/// ```
/// use market_stream::ws::frame::InboundFrame;
/// use market_stream::ws::MessageParser;
///
/// struct RawParser;
///
/// impl MessageParser for RawParser {
///     fn parse(&self, bytes: &[u8]) -> market_stream::Result<Vec<InboundFrame>> {
///         Ok(vec![InboundFrame::Unknown(serde_json::from_slice(bytes)?)])
///     }
/// }
/// ```
pub trait MessageParser: Send + Sync + 'static {
    /// Parse incoming bytes into frames.
    ///
    /// May return an empty vec for frames that carry nothing to deliver.
    /// Handles both single objects and arrays of messages.
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<InboundFrame>>;
}

/// Builds the outbound commands a feed understands.
pub trait FeedProtocol: Send + Sync + 'static {
    /// Command that activates `entry` on the server.
    fn subscribe(&self, entry: &SubscriptionEntry) -> crate::Result<Payload>;

    /// Command that deactivates `channel` on the server.
    fn unsubscribe(&self, channel: &str) -> crate::Result<Payload>;

    /// Commands replayed after a reconnect, in registry order.
    ///
    /// Defaults to one subscribe per entry; feeds that accept batched
    /// subscriptions should override this.
    fn resubscribe(&self, entries: &[&SubscriptionEntry]) -> crate::Result<Vec<Payload>> {
        entries.iter().map(|entry| self.subscribe(entry)).collect()
    }

    /// Liveness probe sent on every heartbeat tick. `None` disables probing.
    fn heartbeat(&self) -> Option<Payload>;
}
