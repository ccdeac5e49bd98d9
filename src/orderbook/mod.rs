//! Real-time orderbook maintenance.
//!
//! This module turns a stream of snapshots and deltas into a sorted,
//! depth-bounded book per market:
//!
//! - [`side`] - one sorted side, in plain, counted or indexed form
//! - [`book`] - bids + asks + snapshot metadata
//! - [`sequence`] - gap policies for the exchange layer
//! - [`registry`] - per-symbol books with sync state
//!
//! # Example
//!
//! ```rust
//! use orderbook_stream::orderbook::{BookKind, OrderBook};
//! use orderbook_stream::types::Delta;
//! use rust_decimal::Decimal;
//!
//! let mut book = OrderBook::new("BTC/USDT", BookKind::Plain, Some(10));
//!
//! // Apply a delta batch
//! let bids = [Delta::new(Decimal::from(100), Decimal::ONE)];
//! let asks = [Delta::new(Decimal::from(101), Decimal::TWO)];
//! let report = book.update(&bids, &asks, Some(1_700_000_000_000), Some(1));
//! assert!(report.is_clean());
//!
//! // Get best bid
//! if let Some(level) = book.best_bid() {
//!     println!("Best bid: {} @ {}", level.size, level.price);
//! }
//! ```

pub mod book;
pub mod registry;
pub mod sequence;
pub mod side;

pub use book::{BookView, OrderBook, Rejected, Snapshot, UpdateReport};
pub use registry::{BookRegistry, BookState, DeltaOutcome};
pub use sequence::{Bracketed, Contiguous, GapPolicy, Permissive, Verdict};
pub use side::{BookKind, BookSide, Side};
