use std::collections::HashSet;
use std::sync::Arc;

use futures::{Stream, StreamExt as _};

use super::protocol::{BinanceParser, BinanceProtocol};
use super::stream::{
    DEFAULT_STREAM_KINDS, DEFAULT_SYMBOLS, DepthLevels, DepthSpeed, KlineInterval, StreamKind,
    StreamName,
};
use super::types::{DepthSnapshot, KlineEvent, MarketEvent, Ticker, Trade};
use crate::Result;
use crate::ws::events::{Event, HandlerError, HandlerId};
use crate::ws::{Config, ConnectionManager, ConnectionState, Status, WsConnector};

/// Single-stream endpoint; streams are added with live `SUBSCRIBE` requests.
pub const DEFAULT_ENDPOINT: &str = "wss://stream.binance.com:9443/ws";

/// Binance market data client.
///
/// Wraps a [`ConnectionManager`] configured with the Binance request protocol,
/// so subscriptions survive reconnects and are replayed as one batched request.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt as _;
/// use market_stream::binance::Client;
/// use market_stream::ws::Config;
///
/// # async fn run() -> market_stream::Result<()> {
/// let client = Client::new(Config::default())?;
/// let trades = client.subscribe_trades(&["btcusdt", "ethusdt"])?;
/// client.connect()?;
///
/// let mut trades = Box::pin(trades);
/// while let Some(trade) = trades.next().await {
///     let trade = trade?;
///     println!("{} {} @ {}", trade.symbol, trade.quantity, trade.price);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    connection: ConnectionManager,
}

impl Client {
    /// Client for [`DEFAULT_ENDPOINT`]. Must be called from within a Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, config)
    }

    pub fn with_endpoint(endpoint: &str, config: Config) -> Result<Self> {
        let connector = WsConnector::new(config.close_timeout);
        let connection = ConnectionManager::with_parts(
            endpoint,
            config,
            BinanceParser::new(),
            BinanceProtocol::new(),
            connector,
        )?;
        Ok(Self { connection })
    }

    /// The underlying connection, for raw sends and lower-level events.
    #[must_use]
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connect(&self) -> Result<()> {
        self.connection.connect()
    }

    pub fn disconnect(&self) -> Result<()> {
        self.connection.disconnect()
    }

    pub fn subscribe(&self, stream: &StreamName) -> Result<()> {
        self.connection.subscribe_channel(stream.as_str(), None)
    }

    pub fn unsubscribe(&self, stream: &StreamName) -> Result<()> {
        self.connection.unsubscribe_channel(stream.as_str())
    }

    /// Subscribe every `kind` for every symbol and return the stream names used.
    pub fn subscribe_streams<S: AsRef<str>>(
        &self,
        symbols: &[S],
        kinds: &[StreamKind],
    ) -> Result<Vec<StreamName>> {
        let mut streams = Vec::with_capacity(symbols.len() * kinds.len());
        for symbol in symbols {
            for kind in kinds {
                let stream = kind.stream(symbol.as_ref());
                self.subscribe(&stream)?;
                streams.push(stream);
            }
        }
        Ok(streams)
    }

    /// Ticker, one-minute kline and trade streams for [`DEFAULT_SYMBOLS`].
    pub fn subscribe_defaults(&self) -> Result<Vec<StreamName>> {
        self.subscribe_streams(&DEFAULT_SYMBOLS, &DEFAULT_STREAM_KINDS)
    }

    /// Every market event received after this call, across all subscriptions.
    ///
    /// Payloads that fail to decode are yielded as errors; the stream keeps going.
    pub fn market_events(&self) -> impl Stream<Item = Result<MarketEvent>> + use<> {
        self.connection
            .event_stream()
            .filter_map(|event| async move {
                match event {
                    Ok(Event::Message(frame)) => MarketEvent::from_frame(&frame).transpose(),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
    }

    /// Subscribes to raw trades for `symbols`.
    pub fn subscribe_trades(
        &self,
        symbols: &[&str],
    ) -> Result<impl Stream<Item = Result<Trade>> + use<>> {
        let stream = self.select(symbols, |event| match event {
            MarketEvent::Trade(trade) => Some(trade),
            _ => None,
        });
        for symbol in symbols {
            self.subscribe(&StreamName::trade(symbol))?;
        }
        Ok(stream)
    }

    /// Subscribes to rolling 24h tickers for `symbols`.
    pub fn subscribe_tickers(
        &self,
        symbols: &[&str],
    ) -> Result<impl Stream<Item = Result<Ticker>> + use<>> {
        let stream = self.select(symbols, |event| match event {
            MarketEvent::Ticker(ticker) => Some(ticker),
            _ => None,
        });
        for symbol in symbols {
            self.subscribe(&StreamName::ticker(symbol))?;
        }
        Ok(stream)
    }

    /// Subscribes to candlesticks of `interval` for `symbols`.
    pub fn subscribe_klines(
        &self,
        symbols: &[&str],
        interval: KlineInterval,
    ) -> Result<impl Stream<Item = Result<KlineEvent>> + use<>> {
        let stream = self.select(symbols, move |event| match event {
            MarketEvent::Kline(kline) if kline.kline.interval == interval => Some(kline),
            _ => None,
        });
        for symbol in symbols {
            self.subscribe(&StreamName::kline(symbol, interval))?;
        }
        Ok(stream)
    }

    /// Subscribes to partial book snapshots for one symbol.
    ///
    /// Snapshots carry no symbol on the wire, so only one depth stream should
    /// be active per client when consuming this.
    pub fn subscribe_depth(
        &self,
        symbol: &str,
        levels: DepthLevels,
        speed: DepthSpeed,
    ) -> Result<impl Stream<Item = Result<DepthSnapshot>> + use<>> {
        let stream = self.select(&[symbol], |event| match event {
            MarketEvent::DepthSnapshot(snapshot) => Some(snapshot),
            _ => None,
        });
        self.subscribe(&StreamName::depth(symbol, levels, speed))?;
        Ok(stream)
    }

    /// Market events narrowed by `select`, limited to `symbols` where the event names one.
    fn select<T, M>(&self, symbols: &[&str], select: M) -> impl Stream<Item = Result<T>> + use<T, M>
    where
        T: Send + 'static,
        M: Fn(MarketEvent) -> Option<T> + Copy + Send + 'static,
    {
        let symbols: Arc<HashSet<String>> =
            Arc::new(symbols.iter().map(|symbol| symbol.to_uppercase()).collect());

        self.market_events().filter_map(move |event| {
            let symbols = Arc::clone(&symbols);
            async move {
                match event {
                    Ok(event) if event.symbol().is_none_or(|s| symbols.contains(s)) => {
                        select(event).map(Ok)
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            }
        })
    }

    /// Register a handler on the underlying connection's event hub.
    pub fn on<N, F>(&self, event: N, handler: F) -> HandlerId
    where
        N: Into<String>,
        F: Fn(&Event) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.connection.on(event, handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.connection.off(event, id)
    }

    #[must_use]
    pub fn events(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.connection.events()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.connection.status()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }
}
