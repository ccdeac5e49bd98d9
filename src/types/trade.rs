//! Public trade records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, Size, TimestampMs};
use crate::cache::CacheRecord;

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TakerSide {
    /// Taker bought (lifted an ask)
    Buy,
    /// Taker sold (hit a bid)
    Sell,
}

/// A public trade as normalized by the parsing layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unified market symbol
    pub symbol: String,
    /// Exchange trade id
    #[serde(default)]
    pub id: Option<String>,
    /// Execution time
    #[serde(default)]
    pub timestamp: Option<TimestampMs>,
    /// Execution price
    pub price: Price,
    /// Executed amount
    pub amount: Size,
    /// Aggressor side, if the exchange reports it
    #[serde(default)]
    pub side: Option<TakerSide>,
}

impl Trade {
    /// Create a trade with only the required fields
    pub fn new(symbol: impl Into<String>, price: Price, amount: Size) -> Self {
        Self {
            symbol: symbol.into(),
            id: None,
            timestamp: None,
            price,
            amount,
            side: None,
        }
    }

    /// Set the trade id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the execution time
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: TimestampMs) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Quote value of the trade, `None` on overflow
    pub fn cost(&self) -> Option<Decimal> {
        self.price.checked_mul(self.amount)
    }
}

impl CacheRecord for Trade {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn timestamp(&self) -> Option<TimestampMs> {
        self.timestamp
    }
}
