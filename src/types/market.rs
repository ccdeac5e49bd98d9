//! OHLCV candles.

use serde::{Deserialize, Serialize};

use super::{Price, Size, TimestampMs};
use crate::cache::CacheRecord;

/// One candle. Candles for the same open time replace each other in the
/// candle cache while the bar is still forming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ohlcv {
    /// Unified market symbol
    pub symbol: String,
    /// Bar open time
    pub timestamp: TimestampMs,
    /// Open price
    pub open: Price,
    /// High price
    pub high: Price,
    /// Low price
    pub low: Price,
    /// Close price
    pub close: Price,
    /// Base volume
    pub volume: Size,
}

impl CacheRecord for Ohlcv {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn timestamp(&self) -> Option<TimestampMs> {
        Some(self.timestamp)
    }
}
