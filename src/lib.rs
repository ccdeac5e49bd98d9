//! # orderbook-stream
//!
//! Real-time order book maintenance for multi-exchange WebSocket streams.
//!
//! Exchange adapters parse their wire format into price/size tuples; this
//! crate turns those snapshots and deltas into correct, sorted,
//! depth-bounded books and keeps bounded replay caches for trades, orders
//! and candles.
//!
//! ## Features
//!
//! - **Three book variants** - plain, counted (order count per level) and
//!   indexed (individual orders keyed by id)
//! - **Skip-and-continue deltas** - one malformed level never sinks a batch
//! - **Pluggable gap detection** - exchange layers pick a [`GapPolicy`]
//! - **Bounded caches** - FIFO, upsert-by-id and upsert-by-timestamp
//! - **Session driver** - a tokio task fed by an mpsc channel
//!
//! ## Quick Start
//!
//! ```rust
//! use orderbook_stream::orderbook::{BookKind, OrderBook, Snapshot};
//! use orderbook_stream::types::Delta;
//! use rust_decimal::Decimal;
//!
//! let mut book = OrderBook::new("ETH/USDT", BookKind::Plain, Some(3));
//!
//! let snapshot = Snapshot {
//!     bids: vec![Delta::new(Decimal::from(10), Decimal::ONE)],
//!     asks: vec![Delta::new(Decimal::from(11), Decimal::ONE)],
//!     timestamp: Some(1_700_000_000_000),
//!     nonce: Some(1),
//! };
//! book.reset(&snapshot);
//!
//! // zero size deletes
//! book.update(&[Delta::new(Decimal::from(10), Decimal::ZERO)], &[], None, Some(2));
//!
//! let view = book.limit(None);
//! assert!(view.bids.is_empty());
//! assert_eq!(view.asks.len(), 1);
//! ```
//!
//! ## Architecture
//!
//! - [`orderbook`] - book sides, books, gap policies, per-symbol registry
//! - [`cache`] - bounded record caches
//! - [`session`] - the per-connection owner of books and caches
//! - [`types`] - deltas, levels, records and inbound messages
//! - [`config`] - session defaults
//! - [`error`] - error types for the crate
//!
//! [`GapPolicy`]: orderbook::GapPolicy

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod orderbook;
pub mod session;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::Error;
pub use orderbook::{BookKind, BookView, OrderBook};
pub use session::StreamSession;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = StreamSession::new(Config::default()).unwrap();
        assert_eq!(session.config().book_kind(), BookKind::Plain);
    }
}
