//! Binance spot market data streams.
//!
//! **Feature flag:** `binance` (required to use this module)
//!
//! Streams are opened over a single connection with live `SUBSCRIBE` requests
//! and decoded into [`MarketEvent`]s. Subscriptions are replayed in one
//! batched request after every reconnect.
//!
//! # Example
//!
//! ```no_run
//! use market_stream::binance::{Client, StreamKind};
//! use market_stream::ws::Config;
//! use market_stream::ws::events::DISCONNECTED;
//!
//! # async fn run() -> market_stream::Result<()> {
//! let client = Client::new(Config::default())?;
//! client.on(DISCONNECTED, |event| {
//!     eprintln!("{event:?}");
//!     Ok(())
//! });
//! client.subscribe_streams(&["btcusdt", "ethusdt"], &[StreamKind::Trade, StreamKind::Ticker])?;
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod protocol;
pub mod stream;
pub mod types;

pub use client::{Client, DEFAULT_ENDPOINT};
pub use protocol::{BinanceParser, BinanceProtocol};
pub use stream::{
    DEFAULT_STREAM_KINDS, DEFAULT_SYMBOLS, DepthLevels, DepthSpeed, KlineInterval, StreamKind,
    StreamName,
};
pub use types::MarketEvent;
