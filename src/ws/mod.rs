//! Core streaming-connection infrastructure.
//!
//! This module provides generic connection management that can be
//! specialized for different market-data feeds using traits and the strategy pattern.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: consumer handle to one supervised connection
//! - [`transport`]: one physical connection, no retry logic ([`Connector`], [`Session`])
//! - [`reconnect`]: exponential backoff with a retry ceiling
//! - [`queue`]: bounded priority queue for sends issued while offline
//! - [`events`]: publish/subscribe hub for lifecycle and data events
//! - [`subscription`]: desired-active channels, replayed after every reconnect
//! - [`MessageParser`] / [`FeedProtocol`]: feed-specific inbound and outbound strategies
//!
//! # Example
//!
//! ```no_run
//! use market_stream::types::Priority;
//! use market_stream::ws::{Config, ConnectionManager};
//!
//! # async fn run() -> market_stream::Result<()> {
//! let manager = ConnectionManager::new("wss://feed.example.com/ws", Config::default())?;
//! manager.on("trade", |event| {
//!     println!("{event:?}");
//!     Ok(())
//! });
//! manager.subscribe_channel("BTC-trade", None)?;
//! manager.send("hello", Priority::Low)?;
//! manager.connect()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod frame;
mod heartbeat;
pub mod queue;
pub mod reconnect;
pub mod subscription;
pub mod traits;
pub mod transport;

pub use config::{Config, Options, ReconnectConfig};
pub use connection::{ConnectionManager, ConnectionState, Status};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use events::{ErrorDetail, Event, HandlerId};
pub use frame::{InboundFrame, JsonProtocol, TaggedParser};
pub use traits::*;
pub use transport::{
    CloseInfo, Connector, SendOutcome, Session, SessionEvent, SessionSink, WsConnector,
};
