//! Inbound stream message types.
//!
//! The transport and exchange-specific parsing layers hand the session
//! [`StreamMessage`]s. Book levels stay as raw JSON values here; they are
//! parsed per delta against the book's [`BookKind`](crate::orderbook::BookKind)
//! so one bad level does not sink the whole message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Ohlcv, Order, TimestampMs, Trade};
use crate::orderbook::{BookKind, Rejected, Side, UpdateReport};
use crate::types::Delta;

/// Message received from the parsing layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Full book state (absolute levels)
    Snapshot(BookMessage),
    /// Incremental book update
    Delta(BookMessage),
    /// Public trade
    Trade(Trade),
    /// User order update
    Order(Order),
    /// Candle update
    Ohlcv(CandleMsg),
}

impl StreamMessage {
    /// Symbol the message belongs to
    pub fn symbol(&self) -> &str {
        match self {
            StreamMessage::Snapshot(m) | StreamMessage::Delta(m) => &m.symbol,
            StreamMessage::Trade(t) => &t.symbol,
            StreamMessage::Order(o) => &o.symbol,
            StreamMessage::Ohlcv(c) => &c.candle.symbol,
        }
    }
}

/// Book snapshot or delta batch
///
/// Levels are `[price, size]`, `[price, size, count]` or `[price, size, id]`
/// tuples (or the equivalent objects).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMessage {
    /// Unified market symbol
    pub symbol: String,
    /// Bid levels
    #[serde(default)]
    pub bids: Vec<Value>,
    /// Ask levels
    #[serde(default)]
    pub asks: Vec<Value>,
    /// Exchange timestamp
    #[serde(default)]
    pub timestamp: Option<TimestampMs>,
    /// Sequence number of the last update in this message
    #[serde(default)]
    pub nonce: Option<i64>,
    /// Sequence number of the first update in this message, for exchanges
    /// that batch several updates into one message
    #[serde(default)]
    pub first_nonce: Option<i64>,
}

impl BookMessage {
    /// Create an empty message for a symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Parse every level against `kind`
    ///
    /// Levels that fail to parse become [`Rejected`] entries indexed by their
    /// position in `bids`/`asks`.
    pub fn parse_levels(&self, kind: BookKind) -> ParsedLevels {
        let mut rejected = Vec::new();
        let (bids, bid_positions) = parse_side(&self.bids, kind, Side::Bid, &mut rejected);
        let (asks, ask_positions) = parse_side(&self.asks, kind, Side::Ask, &mut rejected);
        ParsedLevels {
            bids,
            asks,
            rejected,
            bid_positions,
            ask_positions,
        }
    }
}

/// Levels of a [`BookMessage`] parsed for one book kind
#[derive(Debug, Default)]
pub struct ParsedLevels {
    /// Bid deltas that parsed
    pub bids: Vec<Delta>,
    /// Ask deltas that parsed
    pub asks: Vec<Delta>,
    /// Levels that failed to parse
    pub rejected: Vec<Rejected>,
    bid_positions: Vec<usize>,
    ask_positions: Vec<usize>,
}

impl ParsedLevels {
    /// Combine parse rejections with the report from applying `bids`/`asks`
    ///
    /// The book reports positions within the parsed deltas; these are mapped
    /// back to positions in the raw message so every rejection in the result
    /// points at the level the exchange sent.
    pub fn into_report(self, applied: UpdateReport) -> UpdateReport {
        let mut rejected = self.rejected;
        for mut rejection in applied.rejected {
            let positions = match rejection.side {
                Side::Bid => &self.bid_positions,
                Side::Ask => &self.ask_positions,
            };
            if let Some(&raw) = positions.get(rejection.index) {
                rejection.index = raw;
            }
            rejected.push(rejection);
        }
        rejected.sort_by_key(|r| (r.side == Side::Ask, r.index));
        UpdateReport {
            applied: applied.applied,
            rejected,
        }
    }
}

fn parse_side(
    raw: &[Value],
    kind: BookKind,
    side: Side,
    rejected: &mut Vec<Rejected>,
) -> (Vec<Delta>, Vec<usize>) {
    let mut deltas = Vec::with_capacity(raw.len());
    let mut positions = Vec::with_capacity(raw.len());
    for (index, value) in raw.iter().enumerate() {
        match Delta::parse(value, kind) {
            Ok(delta) => {
                deltas.push(delta);
                positions.push(index);
            }
            Err(error) => rejected.push(Rejected { side, index, error }),
        }
    }
    (deltas, positions)
}

/// Candle update for one timeframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleMsg {
    /// Timeframe label (`1m`, `1h`, ...)
    pub timeframe: String,
    /// The candle
    pub candle: Ohlcv,
}
