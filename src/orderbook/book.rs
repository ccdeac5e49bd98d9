//! Core orderbook data structure.
//!
//! An [`OrderBook`] pairs two [`BookSide`]s with the snapshot metadata
//! (timestamp, datetime, nonce) and exposes:
//!
//! - `update` - merge incremental deltas, skip-and-continue on bad ones
//! - `reset` - rebuild from an absolute snapshot after a resync
//! - `limit` / `view` - plain serializable snapshot for consumers

use rust_decimal::Decimal;
use serde::Serialize;

use super::side::{BookKind, BookSide, Side};
use crate::error::Error;
use crate::types::{iso8601, Delta, Price, PriceLevel, TimestampMs};

/// Full book state used by [`OrderBook::reset`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Absolute bid levels
    pub bids: Vec<Delta>,
    /// Absolute ask levels
    pub asks: Vec<Delta>,
    /// Exchange timestamp
    pub timestamp: Option<TimestampMs>,
    /// Sequence number
    pub nonce: Option<i64>,
}

/// A delta that was not applied
#[derive(Debug)]
pub struct Rejected {
    /// Side the delta was meant for
    pub side: Side,
    /// Position of the delta in its batch
    pub index: usize,
    /// Why it was rejected
    pub error: Error,
}

/// Outcome of applying a batch of deltas
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Number of deltas applied
    pub applied: usize,
    /// Deltas that were skipped
    pub rejected: Vec<Rejected>,
}

impl UpdateReport {
    /// Whether every delta was applied
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: UpdateReport) {
        self.applied += other.applied;
        self.rejected.extend(other.rejected);
    }
}

/// Plain, serializable book snapshot handed to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookView {
    /// Market symbol
    pub symbol: String,
    /// Bid levels, best (highest) first
    pub bids: Vec<PriceLevel>,
    /// Ask levels, best (lowest) first
    pub asks: Vec<PriceLevel>,
    /// Exchange timestamp
    pub timestamp: Option<TimestampMs>,
    /// ISO-8601 rendering of `timestamp`
    pub datetime: Option<String>,
    /// Sequence number
    pub nonce: Option<i64>,
}

/// Order book for a single market
///
/// # Design Decisions
///
/// 1. **Decimal prices**: exact comparisons, no float drift in sort keys.
///
/// 2. **Sorted vectors**: both sides are kept best-first, so top-of-book is
///    index 0 and a depth-`n` view is a slice copy.
///
/// 3. **No gap detection**: the book never rejects a nonce. Detecting gaps
///    is the caller's job; [`OrderBook::reset`] is the correction primitive.
///
/// 4. **Permissive on crossing**: a crossed book is kept as delivered;
///    [`OrderBook::is_crossed`] lets callers inspect it.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. It is meant
/// to be owned by one session and mutated from one task.
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: String,
    bids: BookSide,
    asks: BookSide,
    timestamp: Option<TimestampMs>,
    datetime: Option<String>,
    nonce: Option<i64>,
}

impl OrderBook {
    /// Create a new empty orderbook
    #[must_use]
    pub fn new(symbol: impl Into<String>, kind: BookKind, depth: Option<usize>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BookSide::new(Side::Bid, kind, depth),
            asks: BookSide::new(Side::Ask, kind, depth),
            timestamp: None,
            datetime: None,
            nonce: None,
        }
    }

    /// Create an unbounded plain book
    #[must_use]
    pub fn plain(symbol: impl Into<String>) -> Self {
        Self::new(symbol, BookKind::Plain, None)
    }

    /// Create an unbounded counted book
    #[must_use]
    pub fn counted(symbol: impl Into<String>) -> Self {
        Self::new(symbol, BookKind::Counted, None)
    }

    /// Create an unbounded indexed book
    #[must_use]
    pub fn indexed(symbol: impl Into<String>) -> Self {
        Self::new(symbol, BookKind::Indexed, None)
    }

    /// Create a book from an initial snapshot
    pub fn from_snapshot(
        symbol: impl Into<String>,
        kind: BookKind,
        depth: Option<usize>,
        snapshot: &Snapshot,
    ) -> (Self, UpdateReport) {
        let mut book = Self::new(symbol, kind, depth);
        let report = book.reset(snapshot);
        (book, report)
    }

    /// Get the market symbol
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the book variant
    #[must_use]
    pub fn kind(&self) -> BookKind {
        self.bids.kind()
    }

    /// Get the depth bound per side
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.bids.depth()
    }

    /// Get the last exchange timestamp
    #[must_use]
    pub const fn timestamp(&self) -> Option<TimestampMs> {
        self.timestamp
    }

    /// Get the ISO-8601 datetime of the last timestamp
    #[must_use]
    pub fn datetime(&self) -> Option<&str> {
        self.datetime.as_deref()
    }

    /// Get the last nonce
    #[must_use]
    pub const fn nonce(&self) -> Option<i64> {
        self.nonce
    }

    /// Bid side
    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    /// Ask side
    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    /// Mutable access to one side, for callers applying deltas one at a time
    pub fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Apply a batch of deltas
    ///
    /// Each delta goes through [`BookSide::store_array`]. A malformed delta is
    /// skipped and recorded in the report; the rest of the batch still
    /// applies. Timestamp and nonce are only overwritten when provided.
    pub fn update(
        &mut self,
        bids: &[Delta],
        asks: &[Delta],
        timestamp: Option<TimestampMs>,
        nonce: Option<i64>,
    ) -> UpdateReport {
        let mut report = UpdateReport::default();
        apply_all(&mut self.bids, bids, &mut report);
        apply_all(&mut self.asks, asks, &mut report);
        self.stamp(timestamp, nonce);
        report
    }

    /// Apply a batch of deltas, stopping at the first malformed one
    ///
    /// Deltas before the failing one stay applied and metadata is left
    /// unchanged on failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::MalformedDelta`] encountered.
    pub fn try_update(
        &mut self,
        bids: &[Delta],
        asks: &[Delta],
        timestamp: Option<TimestampMs>,
        nonce: Option<i64>,
    ) -> Result<(), Error> {
        for delta in bids {
            self.bids.store_array(delta)?;
        }
        for delta in asks {
            self.asks.store_array(delta)?;
        }
        self.stamp(timestamp, nonce);
        Ok(())
    }

    /// Replace the whole book with a snapshot
    ///
    /// Timestamp, datetime and nonce are replaced too, including being
    /// cleared when the snapshot carries none.
    pub fn reset(&mut self, snapshot: &Snapshot) -> UpdateReport {
        self.bids.clear();
        self.asks.clear();
        self.timestamp = None;
        self.datetime = None;
        self.nonce = None;

        let mut report = UpdateReport::default();
        apply_all(&mut self.bids, &snapshot.bids, &mut report);
        apply_all(&mut self.asks, &snapshot.asks, &mut report);
        self.stamp(snapshot.timestamp, snapshot.nonce);
        report
    }

    /// Cap both sides to `n` levels (never more than the configured depth)
    /// and return the resulting book
    ///
    /// Levels beyond the cap are dropped from the book. Use
    /// [`OrderBook::view`] to read the top levels without truncating.
    pub fn limit(&mut self, n: Option<usize>) -> BookView {
        self.bids.limit(n);
        self.asks.limit(n);
        self.view(None)
    }

    /// Top `n` levels per side (all when `None`), without touching the book
    #[must_use]
    pub fn view(&self, n: Option<usize>) -> BookView {
        let take = |side: &BookSide| -> Vec<PriceLevel> {
            let levels = side.levels();
            let n = n.unwrap_or(levels.len()).min(levels.len());
            levels[..n].to_vec()
        };
        BookView {
            symbol: self.symbol.clone(),
            bids: take(&self.bids),
            asks: take(&self.asks),
            timestamp: self.timestamp,
            datetime: self.datetime.clone(),
            nonce: self.nonce,
        }
    }

    /// Set the exchange timestamp (and its datetime)
    pub fn set_timestamp(&mut self, timestamp: TimestampMs) {
        self.timestamp = Some(timestamp);
        self.datetime = iso8601(timestamp);
    }

    /// Set the nonce
    pub fn set_nonce(&mut self, nonce: i64) {
        self.nonce = Some(nonce);
    }

    /// Get the best bid
    #[must_use]
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.best()
    }

    /// Get the best ask
    #[must_use]
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.best()
    }

    /// Get the mid price
    ///
    /// Returns the average of best bid and best ask, or `None` if either is missing.
    #[must_use]
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        bid.price.checked_add(ask.price)?.checked_div(Decimal::TWO)
    }

    /// Get the spread (best ask - best bid)
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        ask.price.checked_sub(bid.price)
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// This shouldn't happen in a healthy feed but is useful for validation.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Clear the orderbook
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.timestamp = None;
        self.datetime = None;
        self.nonce = None;
    }

    /// Check if the orderbook is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get the number of levels `(bids, asks)`
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    fn stamp(&mut self, timestamp: Option<TimestampMs>, nonce: Option<i64>) {
        if let Some(timestamp) = timestamp {
            self.set_timestamp(timestamp);
        }
        if let Some(nonce) = nonce {
            self.nonce = Some(nonce);
        }
    }
}

fn apply_all(side: &mut BookSide, deltas: &[Delta], report: &mut UpdateReport) {
    for (index, delta) in deltas.iter().enumerate() {
        match side.store_array(delta) {
            Ok(()) => report.applied += 1,
            Err(error) => report.rejected.push(Rejected {
                side: side.side(),
                index,
                error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal) -> Delta {
        Delta::new(price, size)
    }

    #[test]
    fn test_new_orderbook() {
        let book = OrderBook::plain("BTC/USDT");
        assert_eq!(book.symbol(), "BTC/USDT");
        assert!(book.is_empty());
        assert_eq!(book.nonce(), None);
        assert_eq!(book.kind(), BookKind::Plain);
    }

    #[test]
    fn test_update_sets_metadata() {
        let mut book = OrderBook::plain("TEST");
        let report = book.update(
            &[level(dec!(10), dec!(1))],
            &[level(dec!(11), dec!(2))],
            Some(1_609_459_200_000),
            Some(42),
        );
        assert!(report.is_clean());
        assert_eq!(report.applied, 2);
        assert_eq!(book.nonce(), Some(42));
        assert_eq!(book.datetime(), Some("2021-01-01T00:00:00.000Z"));

        // metadata untouched when not provided
        book.update(&[level(dec!(9), dec!(1))], &[], None, None);
        assert_eq!(book.nonce(), Some(42));
        assert_eq!(book.timestamp(), Some(1_609_459_200_000));
    }

    #[test]
    fn test_update_skips_malformed() {
        let mut book = OrderBook::plain("TEST");
        let report = book.update(
            &[
                level(dec!(10), dec!(1)),
                level(dec!(11), dec!(-1)),
                level(dec!(9), dec!(1)),
            ],
            &[],
            None,
            None,
        );
        assert_eq!(report.applied, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].side, Side::Bid);
        assert_eq!(book.num_levels(), (2, 0));
    }

    #[test]
    fn test_try_update_stops() {
        let mut book = OrderBook::plain("TEST");
        let result = book.try_update(
            &[level(dec!(10), dec!(1)), level(dec!(11), dec!(-1))],
            &[level(dec!(12), dec!(1))],
            Some(5),
            Some(5),
        );
        assert!(result.is_err());
        assert_eq!(book.num_levels(), (1, 0));
        assert_eq!(book.nonce(), None);
    }

    #[test]
    fn test_reset_replaces_everything() {
        let mut book = OrderBook::plain("TEST");
        book.update(&[level(dec!(1), dec!(1))], &[], Some(1), Some(1));

        let snapshot = Snapshot {
            bids: vec![level(dec!(100), dec!(1)), level(dec!(101), dec!(2))],
            asks: vec![level(dec!(102), dec!(3))],
            timestamp: None,
            nonce: Some(10),
        };
        book.reset(&snapshot);

        assert_eq!(book.best_bid().unwrap().pair(), (dec!(101), dec!(2)));
        assert_eq!(book.num_levels(), (2, 1));
        assert_eq!(book.nonce(), Some(10));
        assert_eq!(book.timestamp(), None);
        assert_eq!(book.datetime(), None);
    }

    #[test]
    fn test_mid_price_and_spread() {
        let mut book = OrderBook::plain("TEST");
        book.update(
            &[level(dec!(45), dec!(100))],
            &[level(dec!(55), dec!(100))],
            None,
            None,
        );
        assert_eq!(book.mid_price(), Some(dec!(50)));
        assert_eq!(book.spread(), Some(dec!(10)));
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_mid_price_overflow() {
        let mut book = OrderBook::plain("TEST");
        book.update(
            &[level(Decimal::MAX, dec!(1))],
            &[level(Decimal::MAX, dec!(1))],
            None,
            None,
        );
        assert_eq!(book.mid_price(), None);
        assert_eq!(book.spread(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_crossed_book_is_kept() {
        let mut book = OrderBook::plain("TEST");
        book.update(
            &[level(dec!(55), dec!(100))],
            &[level(dec!(50), dec!(100))],
            None,
            None,
        );
        assert!(book.is_crossed());
        assert_eq!(book.num_levels(), (1, 1));
    }

    #[test]
    fn test_view_and_limit() {
        let mut book = OrderBook::new("TEST", BookKind::Plain, Some(3));
        let bids: Vec<_> = (1..=5).map(|p| level(Decimal::from(p), dec!(1))).collect();
        book.update(&bids, &[], Some(0), Some(1));

        // reading does not truncate
        let top = book.view(Some(2));
        assert_eq!(top.bids.len(), 2);
        assert_eq!(book.num_levels(), (3, 0));

        // larger than depth: depth wins
        assert_eq!(book.limit(Some(10)).bids.len(), 3);

        let view = book.limit(Some(2));
        assert_eq!(view.bids.len(), 2);
        assert_eq!(view.bids[0].price, dec!(5));
        assert_eq!(book.num_levels(), (2, 0));
        assert_eq!(view.datetime.as_deref(), Some("1970-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_view_serializes() {
        let mut book = OrderBook::plain("TEST");
        book.update(&[level(dec!(10), dec!(1))], &[], None, Some(3));
        let json = serde_json::to_value(book.view(None)).unwrap();
        assert_eq!(json["bids"], serde_json::json!([["10", "1"]]));
        assert_eq!(json["asks"], serde_json::json!([]));
        assert_eq!(json["nonce"], 3);
        assert!(json["timestamp"].is_null());
    }

    #[test]
    fn test_clear() {
        let mut book = OrderBook::plain("TEST");
        book.update(
            &[level(dec!(50), dec!(100))],
            &[level(dec!(55), dec!(100))],
            Some(1),
            Some(1),
        );
        assert!(!book.is_empty());

        book.clear();

        assert!(book.is_empty());
        assert_eq!(book.nonce(), None);
    }
}
