//! Transport Session: one physical streaming connection, with no retry logic.
//!
//! A [`Connector`] opens a [`Session`] and reports everything that happens on it
//! afterwards through the [`SessionSink`] it was handed. The connection manager
//! owns at most one live session at a time and tags every report with the
//! generation it opened the session under, so reports from a discarded session
//! are never mistaken for the current one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::Result;
use crate::types::Payload;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code used when the transport vanished without a close handshake.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;
/// Close code used for caller-initiated shutdown.
pub const NORMAL_CLOSE_CODE: u16 = 1000;
/// Close code reported when the peer sent a close frame without a status.
const NO_STATUS_CLOSE_CODE: u16 = 1005;

/// Result of handing a frame to a session.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame was accepted for transmission.
    Accepted,
    /// The session is not open; the caller should enqueue the frame instead.
    Rejected,
}

/// How a session ended.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    /// `true` only when the close was requested through [`Session::close`].
    pub was_clean: bool,
}

impl CloseInfo {
    #[must_use]
    pub fn clean<S: Into<String>>(code: u16, reason: S) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    #[must_use]
    pub fn abnormal<S: Into<String>>(code: u16, reason: S) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

/// Report from a live session.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A raw inbound frame
    Frame(Payload),
    /// Answer to a transport-level [`Session::ping`]
    Pong,
    /// A non-fatal transport error
    Error(String),
    /// Frames accepted by [`Session::send`] that never reached the wire.
    /// Reported just before [`SessionEvent::Closed`], in send order.
    Unsent(Vec<Payload>),
    /// The session ended; no further events follow
    Closed(CloseInfo),
}

/// Internal supervisor signal. Open results are reported by the manager itself,
/// session events by the [`SessionSink`].
pub(crate) enum Signal {
    Opened(Box<dyn Session>),
    OpenFailed(String),
    Session(SessionEvent),
}

/// Channel back into the connection manager for one session generation.
#[derive(Clone)]
pub struct SessionSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, Signal)>,
}

impl SessionSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, Signal)>) -> Self {
        Self { generation, tx }
    }

    /// Report a session event. Returns `false` once the manager is gone.
    pub fn emit(&self, event: SessionEvent) -> bool {
        self.signal(Signal::Session(event))
    }

    pub(crate) fn signal(&self, signal: Signal) -> bool {
        self.tx.send((self.generation, signal)).is_ok()
    }
}

impl fmt::Debug for SessionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Handle to one open connection.
///
/// Dropping the handle without calling [`Session::close`] tears the connection
/// down without a close handshake and without reporting [`SessionEvent::Closed`].
pub trait Session: Send + 'static {
    /// Hand a frame to the connection. Never blocks and never panics.
    fn send(&mut self, payload: &Payload) -> SendOutcome;

    /// Send a transport-level liveness probe, answered by [`SessionEvent::Pong`].
    ///
    /// Returns `false` when the transport has no such probe or the session is
    /// not open.
    fn ping(&mut self) -> bool {
        false
    }

    /// Request a clean close. The session reports [`SessionEvent::Closed`] with
    /// `was_clean = true` once the handshake completes or times out.
    fn close(&mut self, code: u16, reason: &str);
}

/// Opens sessions against an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, endpoint: &Url, sink: SessionSink) -> Result<Box<dyn Session>>;
}

enum Outgoing {
    Frame(Message),
    Close { code: u16, reason: String },
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct WsConnector {
    /// How long a clean close waits for the peer's close frame
    pub close_timeout: Duration,
}

impl WsConnector {
    #[must_use]
    pub fn new(close_timeout: Duration) -> Self {
        Self { close_timeout }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, endpoint: &Url, sink: SessionSink) -> Result<Box<dyn Session>> {
        let (ws_stream, _) = connect_async(endpoint.as_str()).await?;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        tokio::spawn(io_loop(
            ws_stream,
            outgoing_rx,
            sink,
            Arc::clone(&open),
            self.close_timeout,
        ));

        Ok(Box::new(WsSession { outgoing_tx, open }))
    }
}

struct WsSession {
    outgoing_tx: mpsc::UnboundedSender<Outgoing>,
    open: Arc<AtomicBool>,
}

impl Session for WsSession {
    fn send(&mut self, payload: &Payload) -> SendOutcome {
        if !self.open.load(Ordering::Acquire) {
            return SendOutcome::Rejected;
        }

        match self
            .outgoing_tx
            .send(Outgoing::Frame(payload.clone().into_message()))
        {
            Ok(()) => SendOutcome::Accepted,
            Err(_) => SendOutcome::Rejected,
        }
    }

    fn ping(&mut self) -> bool {
        self.open.load(Ordering::Acquire)
            && self
                .outgoing_tx
                .send(Outgoing::Frame(Message::Ping(Vec::new().into())))
                .is_ok()
    }

    fn close(&mut self, code: u16, reason: &str) {
        if self.open.swap(false, Ordering::AcqRel) {
            _ = self.outgoing_tx.send(Outgoing::Close {
                code,
                reason: reason.to_owned(),
            });
        }
    }
}

/// Owns both halves of the socket until the session ends.
async fn io_loop(
    ws_stream: WsStream,
    mut outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
    sink: SessionSink,
    open: Arc<AtomicBool>,
    close_timeout: Duration,
) {
    let (mut write, mut read) = ws_stream.split();
    let mut unsent = Vec::new();

    let info = loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(text = text.as_str(), "Received WebSocket text message");
                        sink.emit(SessionEvent::Frame(Payload::Text(text.to_string())));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        sink.emit(SessionEvent::Frame(Payload::Binary(bytes.to_vec())));
                    }
                    Some(Ok(Message::Pong(_))) => {
                        sink.emit(SessionEvent::Pong);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let info = frame.map_or_else(
                            || CloseInfo::abnormal(NO_STATUS_CLOSE_CODE, "closed by peer"),
                            |f| CloseInfo::abnormal(u16::from(f.code), f.reason.as_str()),
                        );
                        break info;
                    }
                    Some(Err(e)) => {
                        sink.emit(SessionEvent::Error(e.to_string()));
                        break CloseInfo::abnormal(ABNORMAL_CLOSE_CODE, e.to_string());
                    }
                    None => {
                        break CloseInfo::abnormal(ABNORMAL_CLOSE_CODE, "stream ended");
                    }
                    Some(Ok(_)) => {
                        // Pings are answered by tungstenite itself.
                    }
                }
            }

            command = outgoing_rx.recv() => {
                match command {
                    Some(Outgoing::Frame(message)) => {
                        if let Err(e) = write.send(message.clone()).await {
                            unsent.extend(Payload::from_message(message));
                            sink.emit(SessionEvent::Error(e.to_string()));
                            break CloseInfo::abnormal(ABNORMAL_CLOSE_CODE, e.to_string());
                        }
                    }
                    Some(Outgoing::Close { code, reason }) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.clone().into(),
                        };
                        if write.send(Message::Close(Some(frame))).await.is_ok() {
                            // Wait for the peer to acknowledge, but not forever.
                            _ = timeout(close_timeout, async {
                                while let Some(Ok(message)) = read.next().await {
                                    if message.is_close() {
                                        break;
                                    }
                                }
                            })
                            .await;
                        }
                        break CloseInfo::clean(code, reason);
                    }
                    None => {
                        // Handle dropped: the manager discarded this session.
                        open.store(false, Ordering::Release);
                        return;
                    }
                }
            }
        }
    };

    // Refuse further sends, then hand back whatever was still waiting.
    open.store(false, Ordering::Release);
    outgoing_rx.close();
    while let Ok(outgoing) = outgoing_rx.try_recv() {
        if let Outgoing::Frame(message) = outgoing {
            unsent.extend(Payload::from_message(message));
        }
    }
    if !unsent.is_empty() {
        #[cfg(feature = "tracing")]
        tracing::debug!(count = unsent.len(), "Returning frames that never reached the wire");
        sink.emit(SessionEvent::Unsent(unsent));
    }

    sink.emit(SessionEvent::Closed(info));
}
