#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::Arc;
use std::time::Instant;

use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::{Config, Options, parse_endpoint};
use super::error::WsError;
use super::events::{ErrorDetail, Event, EventHub, HandlerError, HandlerId};
use super::frame::{JsonProtocol, TaggedParser};
use super::heartbeat::{Beat, HeartbeatMonitor};
use super::queue::{EnqueueOutcome, MessageQueue, Origin, QueuedMessage};
use super::reconnect::{ReconnectController, Schedule};
use super::subscription::{SubscriptionEntry, SubscriptionRegistry};
use super::traits::{FeedProtocol, MessageParser};
use super::transport::{
    ABNORMAL_CLOSE_CODE, CloseInfo, Connector, NORMAL_CLOSE_CODE, SendOutcome, Session,
    SessionEvent, SessionSink, Signal, WsConnector,
};
use crate::Result;
use crate::types::{Payload, Priority};

const CLIENT_DISCONNECT_REASON: &str = "client disconnect";

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; a retry may be pending
    Disconnected,
    /// Waiting for the transport to open
    Connecting,
    /// Successfully connected
    Connected {
        /// When the connection was established
        since: Instant,
    },
    /// A clean close was requested and has not completed yet
    Closing,
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    #[must_use]
    pub const fn is_connecting(self) -> bool {
        matches!(self, Self::Connecting)
    }
}

/// Snapshot returned by [`ConnectionManager::status`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub connected: bool,
    pub connecting: bool,
    /// Automatic retries scheduled since the last successful connection
    pub retry_attempt: u32,
    /// Outbound messages waiting for connectivity
    pub queue_size: usize,
}

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Send { payload: Payload, priority: Priority },
    Subscribe(SubscriptionEntry),
    Unsubscribe(String),
}

/// Resilient streaming connection with queued sends and subscription replay.
///
/// Every instance owns one background supervisor task that serializes all
/// state transitions: connecting, reconnecting with exponential backoff,
/// heartbeats, flushing the outbound queue and replaying subscriptions.
/// The handle is cheap to clone; the task stops once every clone is dropped.
///
/// # Example
///
/// ```no_run
/// use market_stream::ws::events::CONNECTED;
/// use market_stream::ws::{Config, ConnectionManager};
///
/// # async fn run() -> market_stream::Result<()> {
/// let manager = ConnectionManager::new("wss://feed.example.com/ws", Config::default())?;
/// manager.on(CONNECTED, |_| {
///     println!("connected");
///     Ok(())
/// });
/// manager.subscribe_channel("BTC-trade", None)?;
/// manager.connect()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    endpoint: Url,
    /// Commands for the supervisor task
    commands: mpsc::UnboundedSender<Command>,
    /// Watch channel receiver for state changes
    state_rx: watch::Receiver<ConnectionState>,
    /// Watch channel receiver for status snapshots
    status_rx: watch::Receiver<Status>,
    events: Arc<EventHub>,
    max_frame_size: usize,
}

impl ConnectionManager {
    /// Create a manager speaking the generic JSON protocol over `tokio-tungstenite`.
    ///
    /// Inbound frames are classified by their `"type"` field. Must be called
    /// from within a Tokio runtime.
    pub fn new(endpoint: &str, config: Config) -> Result<Self> {
        let connector = WsConnector::new(config.close_timeout);
        Self::with_parts(
            endpoint,
            config,
            TaggedParser::new(),
            JsonProtocol::new(),
            connector,
        )
    }

    /// Create a manager from externally loaded [`Options`].
    pub fn from_options(options: Options) -> Result<Self> {
        let (endpoint, config) = options.into_parts()?;
        let connector = WsConnector::new(config.close_timeout);
        Ok(Self::spawn(
            endpoint,
            config,
            TaggedParser::new(),
            JsonProtocol::new(),
            connector,
        ))
    }

    /// Create a manager with every strategy supplied by the caller.
    ///
    /// Instances are fully independent of each other.
    pub fn with_parts<P, F, C>(
        endpoint: &str,
        config: Config,
        parser: P,
        protocol: F,
        connector: C,
    ) -> Result<Self>
    where
        P: MessageParser,
        F: FeedProtocol,
        C: Connector,
    {
        let endpoint = parse_endpoint(endpoint)?;
        config.validate()?;
        Ok(Self::spawn(endpoint, config, parser, protocol, connector))
    }

    fn spawn<P, F, C>(endpoint: Url, config: Config, parser: P, protocol: F, connector: C) -> Self
    where
        P: MessageParser,
        F: FeedProtocol,
        C: Connector,
    {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (status_tx, status_rx) = watch::channel(Status::default());
        let events = Arc::new(EventHub::new());
        let max_frame_size = config.max_frame_size;

        let supervisor = Supervisor {
            endpoint: endpoint.clone(),
            reconnect: ReconnectController::new(&config.reconnect),
            heartbeat: HeartbeatMonitor::new(config.heartbeat_interval, config.heartbeat_timeout),
            queue: MessageQueue::new(config.message_queue_capacity),
            registry: SubscriptionRegistry::new(),
            parser,
            protocol,
            connector: Arc::new(connector),
            state: ConnectionState::Disconnected,
            state_tx,
            status_tx,
            events: Arc::clone(&events),
            session: None,
            pending_open: None,
            generation: 0,
            signal_tx,
        };

        tokio::spawn(supervisor.run(commands_rx, signal_rx));

        Self {
            endpoint,
            commands,
            state_rx,
            status_rx,
            events,
            max_frame_size,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Open the connection. A no-op while connected or connecting.
    ///
    /// Resets the retry counter, so this also resumes after
    /// `reconnect-exhausted`.
    pub fn connect(&self) -> Result<()> {
        self.command(Command::Connect)
    }

    /// Close the connection cleanly and cancel any pending retry.
    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    /// Send `payload` now if connected, otherwise hold it in the queue.
    ///
    /// Payloads larger than [`Config::max_frame_size`] are rejected with
    /// [`WsError::FrameTooLarge`] and never queued.
    pub fn send<T: Into<Payload>>(&self, payload: T, priority: Priority) -> Result<()> {
        let payload = payload.into();
        if payload.len() > self.max_frame_size {
            return Err(WsError::FrameTooLarge {
                size: payload.len(),
                limit: self.max_frame_size,
            }
            .into());
        }
        self.command(Command::Send { payload, priority })
    }

    /// Serialize `value` as JSON and [`send`](Self::send) it.
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T, priority: Priority) -> Result<()> {
        self.send(Payload::json(value)?, priority)
    }

    /// Mark `channel` active. Re-subscribing an active channel is a no-op.
    ///
    /// Active channels are re-subscribed automatically after every reconnect.
    pub fn subscribe_channel<C: Into<String>>(&self, channel: C, params: Option<Value>) -> Result<()> {
        self.command(Command::Subscribe(SubscriptionEntry::new(channel, params)))
    }

    /// Mark `channel` inactive. Unsubscribing an inactive channel is a no-op.
    pub fn unsubscribe_channel(&self, channel: &str) -> Result<()> {
        self.command(Command::Unsubscribe(channel.to_owned()))
    }

    /// Register a handler for events named `event`.
    ///
    /// Handlers run on the supervisor task and must not block.
    pub fn on<N, F>(&self, event: N, handler: F) -> HandlerId
    where
        N: Into<String>,
        F: Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.events.on(event, handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.events.off(event, id)
    }

    /// Receiver for every event emitted after this call.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stream of every event emitted after this call.
    pub fn event_stream(&self) -> impl Stream<Item = Result<Event>> + use<> {
        self.events.stream()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        *self.status_rx.borrow()
    }

    #[must_use]
    pub fn status_receiver(&self) -> watch::Receiver<Status> {
        self.status_rx.clone()
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }
}

/// Sole owner of connection state, retry state, the queue and the registry.
struct Supervisor<P, F, C> {
    endpoint: Url,
    reconnect: ReconnectController,
    heartbeat: HeartbeatMonitor,
    queue: MessageQueue,
    registry: SubscriptionRegistry,
    parser: P,
    protocol: F,
    connector: Arc<C>,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    status_tx: watch::Sender<Status>,
    events: Arc<EventHub>,
    session: Option<Box<dyn Session>>,
    /// Cancels the in-flight open, if any
    pending_open: Option<CancellationToken>,
    /// Bumped whenever a session or pending open is abandoned
    generation: u64,
    signal_tx: mpsc::UnboundedSender<(u64, Signal)>,
}

impl<P, F, C> Supervisor<P, F, C>
where
    P: MessageParser,
    F: FeedProtocol,
    C: Connector,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut signals: mpsc::UnboundedReceiver<(u64, Signal)>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some((generation, signal)) = signals.recv() => {
                    self.handle_signal(generation, signal);
                }
                () = self.reconnect.due() => self.on_retry_due(),
                beat = self.heartbeat.next() => match beat {
                    Beat::Probe => self.on_heartbeat(),
                    Beat::Expired => self.on_heartbeat_expired(),
                },
            }

            self.publish_status();
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %self.endpoint, "All connection handles dropped, stopping supervisor");
        self.shutdown();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.connect(),
            Command::Disconnect => self.disconnect(),
            Command::Send { payload, priority } => {
                self.send_or_enqueue(QueuedMessage::new(payload, priority));
            }
            Command::Subscribe(entry) => self.subscribe(entry),
            Command::Unsubscribe(channel) => self.unsubscribe(&channel),
        }
    }

    fn handle_signal(&mut self, generation: u64, signal: Signal) {
        // Frames stranded on any session, current or discarded, are sent again later.
        if let Signal::Session(SessionEvent::Unsent(payloads)) = signal {
            self.requeue_unsent(payloads);
            return;
        }

        if generation != self.generation {
            if let Signal::Opened(mut session) = signal {
                session.close(NORMAL_CLOSE_CODE, "superseded");
            }
            #[cfg(feature = "tracing")]
            tracing::trace!(generation, current = self.generation, "Ignoring signal from stale session");
            return;
        }

        match signal {
            Signal::Opened(session) => self.on_opened(session),
            Signal::OpenFailed(reason) => self.on_open_failed(reason),
            Signal::Session(SessionEvent::Frame(payload)) => {
                self.heartbeat.answered();
                self.on_frame(&payload);
            }
            Signal::Session(SessionEvent::Pong) => self.heartbeat.answered(),
            Signal::Session(SessionEvent::Error(detail)) => {
                self.events
                    .emit(Event::Error(ErrorDetail::Transport(detail)));
            }
            Signal::Session(SessionEvent::Closed(info)) => self.on_closed(info),
            // Handled before the generation check.
            Signal::Session(SessionEvent::Unsent(_)) => {}
        }
    }

    fn connect(&mut self) {
        match self.state {
            ConnectionState::Connected { .. } | ConnectionState::Connecting => {
                #[cfg(feature = "tracing")]
                tracing::debug!(state = ?self.state, "Connect ignored");
                return;
            }
            ConnectionState::Closing => {
                self.discard_session();
                self.events.emit(Event::Disconnected {
                    code: NORMAL_CLOSE_CODE,
                    reason: CLIENT_DISCONNECT_REASON.to_owned(),
                    was_clean: true,
                });
            }
            ConnectionState::Disconnected => {}
        }

        self.reconnect.reset();
        self.open();
    }

    fn open(&mut self) {
        self.generation += 1;
        self.set_state(ConnectionState::Connecting);

        let token = CancellationToken::new();
        self.pending_open = Some(token.clone());

        let sink = SessionSink::new(self.generation, self.signal_tx.clone());
        let connector = Arc::clone(&self.connector);
        let endpoint = self.endpoint.clone();

        #[cfg(feature = "tracing")]
        tracing::debug!(%endpoint, generation = self.generation, "Opening connection");

        tokio::spawn(async move {
            let signal = tokio::select! {
                () = token.cancelled() => return,
                result = connector.open(&endpoint, sink.clone()) => match result {
                    Ok(session) => Signal::Opened(session),
                    Err(e) => Signal::OpenFailed(e.to_string()),
                },
            };
            sink.signal(signal);
        });
    }

    fn on_opened(&mut self, session: Box<dyn Session>) {
        self.pending_open = None;
        self.session = Some(session);
        self.set_state(ConnectionState::Connected {
            since: Instant::now(),
        });
        self.reconnect.reset();
        self.heartbeat.start();

        self.events.emit(Event::Open);
        self.events.emit(Event::Connected);

        self.replay_subscriptions();
        self.flush_queue();
    }

    fn on_open_failed(&mut self, reason: String) {
        #[cfg(feature = "tracing")]
        tracing::warn!(endpoint = %self.endpoint, %reason, "Unable to connect");

        self.pending_open = None;
        self.set_state(ConnectionState::Disconnected);
        self.events
            .emit(Event::Error(ErrorDetail::Transport(reason)));
        self.schedule_reconnect();
    }

    fn on_frame(&mut self, payload: &Payload) {
        match self.parser.parse(payload.as_bytes()) {
            Ok(frames) => {
                for frame in frames {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(?frame, "Parsed inbound frame");
                    self.events.emit(Event::Message(frame));
                }
            }
            Err(e) => {
                let raw = String::from_utf8_lossy(payload.as_bytes()).into_owned();
                #[cfg(feature = "tracing")]
                tracing::warn!(%raw, error = %e, "Failed to parse inbound frame");
                self.events.emit(Event::Error(ErrorDetail::Parse {
                    detail: e.to_string(),
                    raw,
                }));
            }
        }
    }

    fn on_closed(&mut self, info: CloseInfo) {
        self.session = None;
        self.heartbeat.stop();

        let requested = matches!(self.state, ConnectionState::Closing);
        let was_connected = requested || self.state.is_connected();
        self.set_state(ConnectionState::Disconnected);

        #[cfg(feature = "tracing")]
        tracing::debug!(code = info.code, reason = %info.reason, was_clean = info.was_clean, "Connection closed");

        let was_clean = requested || info.was_clean;
        if was_connected {
            self.events.emit(Event::Disconnected {
                code: info.code,
                reason: info.reason,
                was_clean,
            });
        }

        if !was_clean {
            self.schedule_reconnect();
        }
    }

    fn on_retry_due(&mut self) {
        if matches!(self.state, ConnectionState::Disconnected) {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt = self.reconnect.attempt(), "Retrying connection");
            self.open();
        }
    }

    fn on_heartbeat(&mut self) {
        if !self.state.is_connected() {
            self.heartbeat.stop();
            return;
        }
        let Some(session) = self.session.as_mut() else {
            self.heartbeat_failed("heartbeat probe rejected");
            return;
        };

        let pinged = session.ping();
        let probed = match self.protocol.heartbeat() {
            Some(probe) => {
                if session.send(&probe) == SendOutcome::Rejected {
                    self.heartbeat_failed("heartbeat probe rejected");
                    return;
                }
                true
            }
            None => false,
        };

        if pinged || probed {
            self.heartbeat.probe_sent();
        }
    }

    fn on_heartbeat_expired(&mut self) {
        if self.state.is_connected() {
            self.heartbeat_failed("heartbeat timeout");
        } else {
            self.heartbeat.stop();
        }
    }

    /// Fail fast: the session is treated as abnormally closed.
    fn heartbeat_failed(&mut self, reason: &str) {
        #[cfg(feature = "tracing")]
        tracing::warn!(reason, "Heartbeat failed, treating connection as lost");
        self.discard_session();
        self.events.emit(Event::Error(ErrorDetail::Heartbeat));
        self.on_closed(CloseInfo::abnormal(ABNORMAL_CLOSE_CODE, reason));
    }

    fn disconnect(&mut self) {
        self.reconnect.reset();
        self.heartbeat.stop();
        self.cancel_pending_open();

        match self.state {
            ConnectionState::Connected { .. } => {
                self.set_state(ConnectionState::Closing);
                match self.session.as_mut() {
                    Some(session) => session.close(NORMAL_CLOSE_CODE, CLIENT_DISCONNECT_REASON),
                    None => self.on_closed(CloseInfo::clean(
                        NORMAL_CLOSE_CODE,
                        CLIENT_DISCONNECT_REASON,
                    )),
                }
            }
            ConnectionState::Connecting => self.set_state(ConnectionState::Disconnected),
            ConnectionState::Closing | ConnectionState::Disconnected => {}
        }
    }

    fn subscribe(&mut self, entry: SubscriptionEntry) {
        if self.registry.contains(&entry.channel) {
            #[cfg(feature = "tracing")]
            tracing::debug!(channel = %entry.channel, "Already subscribed");
            return;
        }

        let payload = match self.protocol.subscribe(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                self.subscription_failed(&entry.channel, &e);
                return;
            }
        };

        let channel = entry.channel.clone();
        self.registry.insert(entry);
        self.send_or_enqueue(QueuedMessage::with_origin(
            payload,
            Priority::High,
            Origin::Subscription { channel },
        ));
    }

    fn unsubscribe(&mut self, channel: &str) {
        if !self.registry.remove(channel) {
            #[cfg(feature = "tracing")]
            tracing::debug!(channel, "Not subscribed");
            return;
        }

        self.queue.retain(|message| {
            !matches!(&message.origin, Origin::Subscription { channel: queued } if queued == channel)
        });

        // A fresh connection starts without server-side subscriptions.
        if !self.state.is_connected() {
            return;
        }

        match self.protocol.unsubscribe(channel) {
            Ok(payload) => self.send_or_enqueue(QueuedMessage::with_origin(
                payload,
                Priority::High,
                Origin::Subscription {
                    channel: channel.to_owned(),
                },
            )),
            Err(e) => self.subscription_failed(channel, &e),
        }
    }

    fn subscription_failed(&self, channel: &str, error: &crate::error::Error) {
        #[cfg(feature = "tracing")]
        tracing::warn!(channel, %error, "Unable to build subscription command");
        self.events.emit(Event::Error(ErrorDetail::Subscription {
            channel: channel.to_owned(),
            detail: error.to_string(),
        }));
    }

    /// Re-issue every active subscription on the fresh session.
    ///
    /// Queued subscription commands are superseded by the replay.
    fn replay_subscriptions(&mut self) {
        self.queue.retain(|message| !message.origin.is_subscription());
        if self.registry.is_empty() {
            return;
        }

        let payloads = match self.protocol.resubscribe(&self.registry.entries()) {
            Ok(payloads) => payloads,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "Unable to build subscription replay");
                self.events.emit(Event::Error(ErrorDetail::Subscription {
                    channel: self.registry.channels().join(","),
                    detail: e.to_string(),
                }));
                return;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(count = self.registry.len(), "Replaying subscriptions");

        for payload in payloads {
            if self.transmit(&payload) == SendOutcome::Rejected {
                // The session is already gone; the next connection replays again.
                break;
            }
        }
    }

    /// Send queued messages in priority order until the queue is empty or a
    /// send is rejected.
    fn flush_queue(&mut self) {
        while let Some(message) = self.queue.pop() {
            if self.transmit(&message.payload) == SendOutcome::Rejected {
                log_enqueue(&self.queue.requeue(message));
                break;
            }
        }
    }

    /// Put frames a session accepted but never wrote back at the front of
    /// the queue, keeping their send order.
    fn requeue_unsent(&mut self, payloads: Vec<Payload>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(count = payloads.len(), "Requeueing frames that were never written");
        for payload in payloads.into_iter().rev() {
            log_enqueue(&self.queue.requeue(QueuedMessage::new(payload, Priority::Normal)));
        }
        if self.state.is_connected() {
            self.flush_queue();
        }
    }

    fn send_or_enqueue(&mut self, message: QueuedMessage) {
        if self.state.is_connected() && self.transmit(&message.payload) == SendOutcome::Accepted {
            return;
        }
        log_enqueue(&self.queue.enqueue(message));
    }

    fn transmit(&mut self, payload: &Payload) -> SendOutcome {
        self.session
            .as_mut()
            .map_or(SendOutcome::Rejected, |session| session.send(payload))
    }

    fn schedule_reconnect(&mut self) {
        match self.reconnect.schedule() {
            Schedule::Scheduled { attempt, delay } => {
                #[cfg(feature = "tracing")]
                tracing::debug!(attempt, ?delay, "Reconnect scheduled");
                self.events
                    .emit(Event::ReconnectScheduled { attempt, delay });
            }
            Schedule::AlreadyPending => {}
            Schedule::Exhausted { attempts } => {
                #[cfg(feature = "tracing")]
                tracing::error!(attempts, endpoint = %self.endpoint, "Reconnect attempts exhausted");
                self.events.emit(Event::ReconnectExhausted { attempts });
            }
        }
    }

    /// Close and forget the current session; its late reports become stale.
    fn discard_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close(NORMAL_CLOSE_CODE, CLIENT_DISCONNECT_REASON);
        }
        self.generation += 1;
    }

    fn cancel_pending_open(&mut self) {
        if let Some(token) = self.pending_open.take() {
            token.cancel();
            self.generation += 1;
        }
    }

    fn shutdown(&mut self) {
        self.cancel_pending_open();
        self.reconnect.cancel();
        self.heartbeat.stop();
        if let Some(mut session) = self.session.take() {
            session.close(NORMAL_CLOSE_CODE, "connection manager dropped");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&mut self, state: ConnectionState) {
        #[cfg(feature = "tracing")]
        tracing::debug!(from = ?self.state, to = ?state, "Connection state changed");
        self.state = state;
        _ = self.state_tx.send(state);
    }

    fn publish_status(&self) {
        let status = Status {
            connected: self.state.is_connected(),
            connecting: self.state.is_connecting(),
            retry_attempt: self.reconnect.attempt(),
            queue_size: self.queue.len(),
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

fn log_enqueue(outcome: &EnqueueOutcome) {
    match outcome {
        EnqueueOutcome::Queued => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Message queued until connected");
        }
        EnqueueOutcome::Evicted(evicted) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(priority = %evicted.priority, "Message queue full, evicted oldest lowest-priority message");
            #[cfg(not(feature = "tracing"))]
            let _ = evicted;
        }
        EnqueueOutcome::Dropped(dropped) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(priority = %dropped.priority, "Message queue full, dropped message");
            #[cfg(not(feature = "tracing"))]
            let _ = dropped;
        }
    }
}
