#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use bon::Builder;
use serde::Deserialize;
use url::Url;

use crate::Result;
use crate::error::Error;

const DEFAULT_HEARTBEAT_INTERVAL_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_HEARTBEAT_TIMEOUT_DURATION: Duration = Duration::from_secs(15);
const DEFAULT_BASE_INTERVAL_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_GROWTH_FACTOR: f64 = 1.5;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_MESSAGE_QUEUE_CAPACITY: usize = 100;
const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;
const DEFAULT_CLOSE_TIMEOUT_DURATION: Duration = Duration::from_secs(5);

/// Configuration for connection manager behavior.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Interval between liveness probes while connected
    #[builder(default = DEFAULT_HEARTBEAT_INTERVAL_DURATION)]
    pub heartbeat_interval: Duration,
    /// Maximum time to wait for any inbound traffic after an unanswered probe
    #[builder(default = DEFAULT_HEARTBEAT_TIMEOUT_DURATION)]
    pub heartbeat_timeout: Duration,
    /// Reconnection strategy configuration
    #[builder(default)]
    pub reconnect: ReconnectConfig,
    /// Maximum number of outbound messages held while disconnected
    #[builder(default = DEFAULT_MESSAGE_QUEUE_CAPACITY)]
    pub message_queue_capacity: usize,
    /// Largest outbound payload accepted by `send`, in bytes
    #[builder(default = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// How long a clean close waits for the peer's close acknowledgment
    #[builder(default = DEFAULT_CLOSE_TIMEOUT_DURATION)]
    pub close_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Reject settings the supervisor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::validation("heartbeat interval must be non-zero"));
        }
        if self.heartbeat_timeout.is_zero() {
            return Err(Error::validation("heartbeat timeout must be non-zero"));
        }
        if self.message_queue_capacity == 0 {
            return Err(Error::validation("message queue capacity must be non-zero"));
        }
        if self.max_frame_size == 0 {
            return Err(Error::validation("max frame size must be non-zero"));
        }
        self.reconnect.validate()
    }
}

/// Configuration for automatic reconnection behavior.
///
/// The delay before retry `k` (zero-based) is `base_interval * growth_factor^k`,
/// optionally clamped to `max_interval`.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct ReconnectConfig {
    /// Maximum number of automatic reconnection attempts before giving up
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Delay before the first reconnection attempt
    #[builder(default = DEFAULT_BASE_INTERVAL_DURATION)]
    pub base_interval: Duration,
    /// Multiplier applied per attempt
    #[builder(default = DEFAULT_GROWTH_FACTOR)]
    pub growth_factor: f64,
    /// Upper bound on any single delay
    pub max_interval: Option<Duration>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ReconnectConfig {
    fn validate(&self) -> Result<()> {
        if self.base_interval.is_zero() {
            return Err(Error::validation("reconnect base interval must be non-zero"));
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(Error::validation(format!(
                "reconnect growth factor must be a finite number >= 1, got {}",
                self.growth_factor
            )));
        }
        Ok(())
    }
}

/// Recognized options in their external (camelCase) form, e.g. loaded from JSON.
///
/// ```
/// use market_stream::ws::config::Options;
///
/// let options: Options = serde_json::from_str(
///     r#"{ "url": "wss://feed.example.com/ws", "maxReconnectAttempts": 8 }"#,
/// ).unwrap();
/// let (endpoint, config) = options.into_parts().unwrap();
///
/// assert_eq!(endpoint.as_str(), "wss://feed.example.com/ws");
/// assert_eq!(config.reconnect.max_attempts, 8);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    pub url: String,
    pub max_reconnect_attempts: Option<u32>,
    pub reconnect_base_interval_ms: Option<u64>,
    pub reconnect_growth_factor: Option<f64>,
    pub reconnect_max_interval_ms: Option<u64>,
    pub heartbeat_interval_ms: Option<u64>,
    pub heartbeat_timeout_ms: Option<u64>,
    pub message_queue_capacity: Option<usize>,
    pub max_frame_size: Option<usize>,
}

impl Options {
    /// Validate the options and split them into an endpoint and a [`Config`].
    pub fn into_parts(self) -> Result<(Url, Config)> {
        let endpoint = parse_endpoint(&self.url)?;

        let mut config = Config::default();
        if let Some(attempts) = self.max_reconnect_attempts {
            config.reconnect.max_attempts = attempts;
        }
        if let Some(ms) = self.reconnect_base_interval_ms {
            config.reconnect.base_interval = Duration::from_millis(ms);
        }
        if let Some(factor) = self.reconnect_growth_factor {
            config.reconnect.growth_factor = factor;
        }
        config.reconnect.max_interval = self.reconnect_max_interval_ms.map(Duration::from_millis);
        if let Some(ms) = self.heartbeat_interval_ms {
            config.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.heartbeat_timeout_ms {
            config.heartbeat_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = self.message_queue_capacity {
            config.message_queue_capacity = capacity;
        }
        if let Some(size) = self.max_frame_size {
            config.max_frame_size = size;
        }

        config.validate()?;
        Ok((endpoint, config))
    }
}

/// Parse a WebSocket endpoint, accepting only `ws` and `wss` schemes.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::validation(format!(
            "endpoint scheme must be ws or wss, got {other}"
        ))),
    }
}
