//! Event Hub: routes lifecycle and data events to registered handlers.
//!
//! Handlers run synchronously inside [`EventHub::emit`], in registration
//! order. A handler that returns an error or panics is logged and skipped;
//! the remaining handlers still run and the emitter never sees the failure.
//! An event is never delivered while another event of the same name is still
//! being delivered: such an emit is deferred until the first one finishes.
//! Every delivered event is also published on a broadcast channel for
//! consumers that prefer a stream over callbacks.

use std::collections::{HashSet, VecDeque};
use std::error::Error as StdError;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_stream::try_stream;
use dashmap::DashMap;
use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::error::WsError;
use super::frame::InboundFrame;
use crate::Result;

/// Broadcast channel capacity for delivered events.
const BROADCAST_CAPACITY: usize = 1024;

pub const OPEN: &str = "open";
pub const CONNECTED: &str = "connected";
pub const DISCONNECTED: &str = "disconnected";
pub const RECONNECT_SCHEDULED: &str = "reconnect-scheduled";
pub const RECONNECT_EXHAUSTED: &str = "reconnect-exhausted";
pub const ERROR: &str = "error";
/// Fallback name for inbound frames without a discriminant.
pub const MESSAGE: &str = super::frame::MESSAGE_EVENT;

/// Failure surfaced through the `error` event.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    /// An inbound frame could not be parsed; the frame was ignored
    Parse { detail: String, raw: String },
    /// The transport failed to open or reported an error
    Transport(String),
    /// The heartbeat probe was rejected by the session
    Heartbeat,
    /// A subscription command could not be built
    Subscription { channel: String, detail: String },
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { detail, .. } => write!(f, "failed to parse inbound frame: {detail}"),
            Self::Transport(detail) => write!(f, "transport error: {detail}"),
            Self::Heartbeat => write!(f, "heartbeat probe rejected"),
            Self::Subscription { channel, detail } => {
                write!(f, "subscription command for {channel} failed: {detail}")
            }
        }
    }
}

/// Everything a connection manager reports to its consumers.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The transport session opened
    Open,
    /// The manager entered the connected state
    Connected,
    /// A connected session ended
    Disconnected {
        code: u16,
        reason: String,
        was_clean: bool,
    },
    /// An automatic reconnect was scheduled
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// The retry ceiling was reached; only a manual `connect` resumes
    ReconnectExhausted { attempts: u32 },
    Error(ErrorDetail),
    /// An inbound frame, routed under its discriminant
    Message(InboundFrame),
}

impl Event {
    /// Name handlers register under to receive this event.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Open => OPEN,
            Self::Connected => CONNECTED,
            Self::Disconnected { .. } => DISCONNECTED,
            Self::ReconnectScheduled { .. } => RECONNECT_SCHEDULED,
            Self::ReconnectExhausted { .. } => RECONNECT_EXHAUSTED,
            Self::Error(_) => ERROR,
            Self::Message(frame) => frame.event_name(),
        }
    }
}

/// Error a handler may return; it is logged and otherwise ignored.
pub type HandlerError = Box<dyn StdError + Send + Sync>;

type Handler = Arc<dyn Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync>;

/// Returned by [`EventHub::on`]; pass to [`EventHub::off`] to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Default)]
struct Dispatch {
    /// Event names currently being delivered
    active: HashSet<String>,
    /// Emits waiting for their name to become inactive
    deferred: VecDeque<Event>,
}

pub struct EventHub {
    handlers: DashMap<String, Vec<(HandlerId, Handler)>>,
    dispatch: Mutex<Dispatch>,
    broadcast_tx: broadcast::Sender<Event>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("events", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            handlers: DashMap::new(),
            dispatch: Mutex::new(Dispatch::default()),
            broadcast_tx,
        }
    }

    /// Register `handler` for events named `event`.
    pub fn on<N, F>(&self, event: N, handler: F) -> HandlerId
    where
        N: Into<String>,
        F: Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = HandlerId(Uuid::new_v4());
        self.handlers
            .entry(event.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Unregister a handler. Returns `false` if it was not registered under `event`.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut removed = false;
        if let Some(mut handlers) = self.handlers.get_mut(event) {
            let before = handlers.len();
            handlers.retain(|(handler_id, _)| *handler_id != id);
            removed = handlers.len() < before;
        }
        self.handlers.remove_if(event, |_, handlers| handlers.is_empty());
        removed
    }

    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, |handlers| handlers.len())
    }

    /// Receiver for every event delivered after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.broadcast_tx.subscribe()
    }

    /// Stream of every event delivered after this call.
    ///
    /// Ends with [`WsError::Lagged`] when the consumer fell behind and events
    /// were skipped.
    pub fn stream(&self) -> impl Stream<Item = Result<Event>> + use<> {
        let mut rx = self.broadcast_tx.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(count)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Event stream lagged, missed {count} events");
                        Err(WsError::Lagged { count })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Deliver `event` to its handlers, or defer it while an event of the same
    /// name is being delivered.
    pub fn emit(&self, event: Event) {
        {
            let mut dispatch = self.lock();
            if !dispatch.active.insert(event.name().to_owned()) {
                dispatch.deferred.push_back(event);
                return;
            }
        }

        let mut next = Some(event);
        while let Some(event) = next.take() {
            self.deliver(&event);

            let mut guard = self.lock();
            let dispatch = &mut *guard;
            dispatch.active.remove(event.name());
            if let Some(position) = dispatch
                .deferred
                .iter()
                .position(|pending| !dispatch.active.contains(pending.name()))
                && let Some(pending) = dispatch.deferred.remove(position)
            {
                dispatch.active.insert(pending.name().to_owned());
                next = Some(pending);
            }
        }
    }

    fn deliver(&self, event: &Event) {
        _ = self.broadcast_tx.send(event.clone());

        // Snapshot so handlers may call `on`/`off` without deadlocking.
        let handlers = self
            .handlers
            .get(event.name())
            .map(|handlers| handlers.value().clone())
            .unwrap_or_default();

        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(event_name = event.name(), handler = %id, error = %e, "Event handler failed");
                    #[cfg(not(feature = "tracing"))]
                    let _ = (&id, &e);
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(event_name = event.name(), handler = %id, "Event handler panicked");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &id;
                }
            }
        }
    }

    // Dispatch bookkeeping has no intermediate state a panic could leave torn.
    fn lock(&self) -> MutexGuard<'_, Dispatch> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
