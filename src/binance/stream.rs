use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Symbols streamed by [`Client::subscribe_defaults`](super::Client::subscribe_defaults).
pub const DEFAULT_SYMBOLS: [&str; 10] = [
    "btcusdt", "ethusdt", "bnbusdt", "adausdt", "dogeusdt", "xrpusdt", "dotusdt", "uniusdt",
    "linkusdt", "solusdt",
];

/// Stream kinds opened for each default symbol.
pub const DEFAULT_STREAM_KINDS: [StreamKind; 3] =
    [StreamKind::Ticker, StreamKind::Kline, StreamKind::Trade];

/// Candlestick interval.
#[non_exhaustive]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum KlineInterval {
    #[serde(rename = "1s")]
    #[strum(serialize = "1s")]
    OneSecond,
    #[serde(rename = "1m")]
    #[strum(serialize = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    #[strum(serialize = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    #[strum(serialize = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    #[strum(serialize = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    #[strum(serialize = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    #[strum(serialize = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    #[strum(serialize = "2h")]
    TwoHours,
    #[serde(rename = "4h")]
    #[strum(serialize = "4h")]
    FourHours,
    #[serde(rename = "6h")]
    #[strum(serialize = "6h")]
    SixHours,
    #[serde(rename = "8h")]
    #[strum(serialize = "8h")]
    EightHours,
    #[serde(rename = "12h")]
    #[strum(serialize = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    #[strum(serialize = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    #[strum(serialize = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    #[strum(serialize = "1w")]
    OneWeek,
    #[serde(rename = "1M")]
    #[strum(serialize = "1M")]
    OneMonth,
}

/// Number of book levels in a partial depth stream.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum DepthLevels {
    #[strum(serialize = "5")]
    Five,
    #[strum(serialize = "10")]
    Ten,
    #[strum(serialize = "20")]
    Twenty,
}

/// Update speed of a depth stream.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum DepthSpeed {
    #[strum(serialize = "100ms")]
    Fast,
    /// Exchange default; omitted from the stream name
    #[default]
    #[strum(serialize = "1000ms")]
    Standard,
}

/// Stream families opened per symbol by [`Client::subscribe_streams`](super::Client::subscribe_streams).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StreamKind {
    /// Rolling 24h ticker
    Ticker,
    /// One-minute candlesticks
    Kline,
    /// Raw trades
    Trade,
    /// Top 20 book levels every 100 ms
    Depth,
}

impl FromStr for StreamKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ticker" => Ok(Self::Ticker),
            "kline" => Ok(Self::Kline),
            "trade" => Ok(Self::Trade),
            "depth" => Ok(Self::Depth),
            other => Err(Error::validation(format!("unknown stream kind: {other}"))),
        }
    }
}

impl StreamKind {
    #[must_use]
    pub fn stream(self, symbol: &str) -> StreamName {
        match self {
            Self::Ticker => StreamName::ticker(symbol),
            Self::Kline => StreamName::kline(symbol, KlineInterval::OneMinute),
            Self::Trade => StreamName::trade(symbol),
            Self::Depth => StreamName::depth(symbol, DepthLevels::Twenty, DepthSpeed::Fast),
        }
    }
}

/// A Binance stream name such as `btcusdt@kline_1m`.
///
/// Symbols are lower-cased, as the exchange requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamName(String);

impl StreamName {
    fn with_suffix(symbol: &str, suffix: &str) -> Self {
        Self(format!("{}@{suffix}", symbol.to_lowercase()))
    }

    #[must_use]
    pub fn trade(symbol: &str) -> Self {
        Self::with_suffix(symbol, "trade")
    }

    #[must_use]
    pub fn agg_trade(symbol: &str) -> Self {
        Self::with_suffix(symbol, "aggTrade")
    }

    #[must_use]
    pub fn ticker(symbol: &str) -> Self {
        Self::with_suffix(symbol, "ticker")
    }

    #[must_use]
    pub fn mini_ticker(symbol: &str) -> Self {
        Self::with_suffix(symbol, "miniTicker")
    }

    #[must_use]
    pub fn kline(symbol: &str, interval: KlineInterval) -> Self {
        Self::with_suffix(symbol, &format!("kline_{interval}"))
    }

    /// Partial book depth snapshots.
    #[must_use]
    pub fn depth(symbol: &str, levels: DepthLevels, speed: DepthSpeed) -> Self {
        match speed {
            DepthSpeed::Standard => Self::with_suffix(symbol, &format!("depth{levels}")),
            DepthSpeed::Fast => Self::with_suffix(symbol, &format!("depth{levels}@{speed}")),
        }
    }

    /// Incremental book depth updates.
    #[must_use]
    pub fn diff_depth(symbol: &str, speed: DepthSpeed) -> Self {
        match speed {
            DepthSpeed::Standard => Self::with_suffix(symbol, "depth"),
            DepthSpeed::Fast => Self::with_suffix(symbol, &format!("depth@{speed}")),
        }
    }

    /// Stream name taken verbatim.
    #[must_use]
    pub fn raw<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbol part of the name, e.g. `btcusdt`.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StreamName> for String {
    fn from(name: StreamName) -> Self {
        name.0
    }
}

impl AsRef<str> for StreamName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
