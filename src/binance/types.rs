//! Typed market events decoded from Binance stream payloads.

use serde::Deserialize;
use serde_with::{TimestampMilliSeconds, serde_as};

use super::protocol::DEPTH_SNAPSHOT_KIND;
use super::stream::KlineInterval;
use crate::Result;
use crate::types::{DateTime, Decimal, Utc};
use crate::ws::frame::InboundFrame;

/// A market data event, tagged by the `e` field of the payload.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "e")]
pub enum MarketEvent {
    #[serde(rename = "trade")]
    Trade(Trade),
    #[serde(rename = "aggTrade")]
    AggTrade(AggTrade),
    #[serde(rename = "24hrTicker")]
    Ticker(Ticker),
    #[serde(rename = "24hrMiniTicker")]
    MiniTicker(MiniTicker),
    #[serde(rename = "kline")]
    Kline(KlineEvent),
    #[serde(rename = "depthUpdate")]
    DepthUpdate(DepthUpdate),
    /// Partial book snapshot; carries no `e` field on the wire
    #[serde(skip_deserializing)]
    DepthSnapshot(DepthSnapshot),
    /// Event type this crate does not model
    #[serde(other)]
    Other,
}

impl MarketEvent {
    /// Decode a data frame. Acks, heartbeat responses and unknown frames yield `None`.
    pub fn from_frame(frame: &InboundFrame) -> Result<Option<Self>> {
        let InboundFrame::Data { kind, body } = frame else {
            return Ok(None);
        };

        let event = if kind == DEPTH_SNAPSHOT_KIND {
            Self::DepthSnapshot(DepthSnapshot::deserialize(body)?)
        } else {
            Self::deserialize(body)?
        };
        Ok(Some(event))
    }

    /// Symbol the event refers to, when the payload names one.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Trade(trade) => Some(&trade.symbol),
            Self::AggTrade(trade) => Some(&trade.symbol),
            Self::Ticker(ticker) => Some(&ticker.symbol),
            Self::MiniTicker(ticker) => Some(&ticker.symbol),
            Self::Kline(kline) => Some(&kline.symbol),
            Self::DepthUpdate(depth) => Some(&depth.symbol),
            Self::DepthSnapshot(_) | Self::Other => None,
        }
    }
}

/// Raw trade (`<symbol>@trade`).
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Trade {
    #[serde(rename = "E")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "T")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub trade_time: DateTime<Utc>,
    /// Whether the buyer was the maker
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

/// Aggregated trade (`<symbol>@aggTrade`).
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggTrade {
    #[serde(rename = "E")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "a")]
    pub aggregate_id: u64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "f")]
    pub first_trade_id: u64,
    #[serde(rename = "l")]
    pub last_trade_id: u64,
    #[serde(rename = "T")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub trade_time: DateTime<Utc>,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

/// Rolling 24h statistics (`<symbol>@ticker`).
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ticker {
    #[serde(rename = "E")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price_change: Decimal,
    #[serde(rename = "P")]
    pub price_change_percent: Decimal,
    #[serde(rename = "c")]
    pub last_price: Decimal,
    #[serde(rename = "o")]
    pub open_price: Decimal,
    #[serde(rename = "h")]
    pub high_price: Decimal,
    #[serde(rename = "l")]
    pub low_price: Decimal,
    /// Base asset volume
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "q")]
    pub quote_volume: Decimal,
    /// Number of trades in the window
    #[serde(rename = "n")]
    pub count: u64,
}

/// Rolling 24h statistics without change fields (`<symbol>@miniTicker`).
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MiniTicker {
    #[serde(rename = "E")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub close_price: Decimal,
    #[serde(rename = "o")]
    pub open_price: Decimal,
    #[serde(rename = "h")]
    pub high_price: Decimal,
    #[serde(rename = "l")]
    pub low_price: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "q")]
    pub quote_volume: Decimal,
}

/// Candlestick update (`<symbol>@kline_<interval>`).
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KlineEvent {
    #[serde(rename = "E")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: Kline,
}

#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Kline {
    #[serde(rename = "t")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub open_time: DateTime<Utc>,
    #[serde(rename = "T")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub close_time: DateTime<Utc>,
    #[serde(rename = "i")]
    pub interval: KlineInterval,
    #[serde(rename = "o")]
    pub open: Decimal,
    #[serde(rename = "h")]
    pub high: Decimal,
    #[serde(rename = "l")]
    pub low: Decimal,
    #[serde(rename = "c")]
    pub close: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "n")]
    pub trades: u64,
    /// Whether this candle is final
    #[serde(rename = "x")]
    pub is_closed: bool,
}

/// One price level as sent on the wire: `["price", "quantity"]`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Incremental book update (`<symbol>@depth`).
#[non_exhaustive]
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepthUpdate {
    #[serde(rename = "E")]
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub event_time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "U")]
    pub first_update_id: u64,
    #[serde(rename = "u")]
    pub final_update_id: u64,
    #[serde(rename = "b")]
    pub bids: Vec<PriceLevel>,
    #[serde(rename = "a")]
    pub asks: Vec<PriceLevel>,
}

/// Top-of-book snapshot (`<symbol>@depth<levels>`).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthSnapshot {
    pub last_update_id: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}
