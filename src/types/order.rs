//! User order records.

use serde::{Deserialize, Serialize};

use super::{Price, Size, TimestampMs};
use crate::cache::CacheRecord;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order (rests on the bid side)
    Buy,
    /// Sell order (rests on the ask side)
    Sell,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is resting on the book
    Open,
    /// Order has been fully executed
    Closed,
    /// Order has been canceled
    Canceled,
    /// Order expired
    Expired,
    /// Order was rejected by the exchange
    Rejected,
}

impl OrderStatus {
    /// Whether no further updates are expected for the order
    pub fn is_final(self) -> bool {
        !matches!(self, OrderStatus::Open)
    }
}

/// A user order update as normalized by the parsing layer
///
/// Updates for the same `(symbol, id)` replace each other in the order
/// cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unified market symbol
    pub symbol: String,
    /// Exchange order id
    pub id: String,
    /// Client-assigned id
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Last update time
    #[serde(default)]
    pub timestamp: Option<TimestampMs>,
    /// Buy or sell
    pub side: OrderSide,
    /// Current status
    pub status: OrderStatus,
    /// Limit price (None for market orders)
    #[serde(default)]
    pub price: Option<Price>,
    /// Original amount
    pub amount: Size,
    /// Executed amount
    #[serde(default)]
    pub filled: Size,
}

impl Order {
    /// Amount still open
    pub fn remaining(&self) -> Size {
        self.amount - self.filled
    }
}

impl CacheRecord for Order {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn timestamp(&self) -> Option<TimestampMs> {
        self.timestamp
    }
}
