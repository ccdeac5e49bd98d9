//! Shared types for book levels, stream messages and cached records.
//!
//! - [`level`] - Incoming deltas and stored price levels
//! - [`messages`] - Inbound stream message envelope
//! - [`trade`] - Public trade records
//! - [`order`] - User order records
//! - [`market`] - OHLCV candles

pub mod level;
pub mod market;
pub mod messages;
pub mod order;
pub mod trade;

pub use level::{Delta, PriceLevel};
pub use market::Ohlcv;
pub use messages::{BookMessage, CandleMsg, ParsedLevels, StreamMessage};
pub use order::{Order, OrderSide, OrderStatus};
pub use trade::{TakerSide, Trade};

use chrono::{DateTime, SecondsFormat};
use rust_decimal::Decimal;

/// Price of a level
///
/// Exchanges quote prices as decimal strings with arbitrary precision, so
/// prices are kept as exact decimals:
/// - Equal prices compare equal regardless of trailing zeros (`1.0 == 1.00`)
/// - No float drift in sort keys
pub type Price = Decimal;

/// Size (amount) resting at a level
pub type Size = Decimal;

/// Timestamp in milliseconds since Unix epoch
pub type TimestampMs = i64;

/// Render a millisecond timestamp as ISO-8601 UTC (`2021-01-01T00:00:00.000Z`)
///
/// Returns `None` when the timestamp is outside chrono's representable range.
pub fn iso8601(timestamp: TimestampMs) -> Option<String> {
    DateTime::from_timestamp_millis(timestamp)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601() {
        assert_eq!(iso8601(0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
        assert_eq!(
            iso8601(1_609_459_200_123).as_deref(),
            Some("2021-01-01T00:00:00.123Z")
        );
        assert_eq!(iso8601(i64::MAX), None);
    }
}
