//! Per-symbol orderbook registry.
//!
//! This module provides [`BookRegistry`], the container a streaming session
//! uses to own one [`OrderBook`] per subscribed market.
//!
//! # Design
//!
//! The registry is plain owned state mutated through `&mut self`. Deltas are
//! applied synchronously and run to completion, so readers only ever see a
//! book between two updates.
//!
//! # Sequence Tracking
//!
//! Each book remembers its last nonce. Incoming batches are checked against
//! a [`GapPolicy`]; when a gap is detected the book is marked
//! [`BookState::NeedsResync`] and further deltas are dropped until a
//! snapshot arrives.

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::book::{BookView, OrderBook, Snapshot, UpdateReport};
use super::sequence::{GapPolicy, Verdict};
use super::side::BookKind;
use crate::error::Error;
use crate::types::BookMessage;

/// State of an orderbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Orderbook is synchronized and receiving updates
    Synchronized,
    /// Orderbook has detected a sequence gap and needs resync
    NeedsResync,
    /// Orderbook has not received initial snapshot
    WaitingForSnapshot,
}

/// What happened to a delta batch
#[derive(Debug)]
pub enum DeltaOutcome {
    /// Deltas were applied (possibly with rejections)
    Applied(UpdateReport),
    /// Symbol is not tracked
    Untracked,
    /// Book is waiting for a snapshot, batch dropped
    NotSynchronized,
    /// Batch is older than the book, dropped
    Stale,
}

/// Entry in the registry
#[derive(Debug)]
struct BookEntry {
    book: OrderBook,
    state: BookState,
}

/// Registry of orderbooks keyed by symbol
///
/// # Example
///
/// ```rust
/// use orderbook_stream::orderbook::{BookKind, BookRegistry, BookState, Permissive};
/// use orderbook_stream::types::BookMessage;
/// use serde_json::json;
///
/// let mut registry = BookRegistry::new(true);
/// registry.add_market("BTC/USDT", BookKind::Plain, Some(100));
///
/// let mut snapshot = BookMessage::new("BTC/USDT");
/// snapshot.bids = vec![json!(["100", "1"])];
/// snapshot.nonce = Some(1);
/// registry.apply_snapshot(&snapshot, BookKind::Plain, None);
///
/// assert_eq!(registry.get_state("BTC/USDT"), Some(BookState::Synchronized));
/// ```
#[derive(Debug, Default)]
pub struct BookRegistry {
    /// Orderbooks by symbol
    books: FxHashMap<String, BookEntry>,

    /// Whether new books wait for a snapshot before taking deltas
    require_snapshot: bool,
}

impl BookRegistry {
    /// Create an empty registry
    pub fn new(require_snapshot: bool) -> Self {
        Self {
            books: FxHashMap::default(),
            require_snapshot,
        }
    }

    /// Add a market to track
    ///
    /// Creates an empty orderbook, in `WaitingForSnapshot` state when
    /// snapshots are required. Returns `false` if the market was already
    /// tracked (the existing book is kept).
    pub fn add_market(&mut self, symbol: impl Into<String>, kind: BookKind, depth: Option<usize>) -> bool {
        let symbol = symbol.into();
        if self.books.contains_key(&symbol) {
            return false;
        }
        let state = if self.require_snapshot {
            BookState::WaitingForSnapshot
        } else {
            BookState::Synchronized
        };
        debug!(symbol = %symbol, ?kind, ?depth, "tracking orderbook");
        self.books.insert(
            symbol.clone(),
            BookEntry {
                book: OrderBook::new(symbol, kind, depth),
                state,
            },
        );
        true
    }

    /// Remove a market from tracking, returning its book
    pub fn remove_market(&mut self, symbol: &str) -> Option<OrderBook> {
        let removed = self.books.remove(symbol).map(|entry| entry.book);
        if removed.is_some() {
            debug!(symbol = %symbol, "dropped orderbook");
        }
        removed
    }

    /// Get the state of an orderbook
    pub fn get_state(&self, symbol: &str) -> Option<BookState> {
        self.books.get(symbol).map(|e| e.state)
    }

    /// Get all markets that need a snapshot
    pub fn markets_needing_resync(&self) -> Vec<String> {
        self.books
            .iter()
            .filter(|(_, entry)| {
                matches!(
                    entry.state,
                    BookState::NeedsResync | BookState::WaitingForSnapshot
                )
            })
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// Borrow an orderbook
    pub fn get(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol).map(|e| &e.book)
    }

    /// Top `n` levels of an orderbook
    pub fn view(&self, symbol: &str, n: Option<usize>) -> Option<BookView> {
        self.books.get(symbol).map(|e| e.book.view(n))
    }

    /// Apply a snapshot message
    ///
    /// Untracked symbols are added with `kind`/`depth`. The book is reset,
    /// marked `Synchronized`, and the parse and apply rejections are
    /// returned.
    pub fn apply_snapshot(
        &mut self,
        message: &BookMessage,
        kind: BookKind,
        depth: Option<usize>,
    ) -> UpdateReport {
        let symbol = &message.symbol;
        self.add_market(symbol.as_str(), kind, depth);
        let Some(entry) = self.books.get_mut(symbol) else {
            return UpdateReport::default();
        };

        let mut parsed = message.parse_levels(entry.book.kind());
        let snapshot = Snapshot {
            bids: std::mem::take(&mut parsed.bids),
            asks: std::mem::take(&mut parsed.asks),
            timestamp: message.timestamp,
            nonce: message.nonce,
        };
        let report = parsed.into_report(entry.book.reset(&snapshot));

        if entry.state == BookState::NeedsResync {
            info!(symbol = %symbol, nonce = ?message.nonce, "orderbook resynchronized");
        }
        entry.state = BookState::Synchronized;
        log_rejections(symbol, &report);
        report
    }

    /// Apply a delta message
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceGap`] when `policy` detects missed messages;
    /// the book is then marked `NeedsResync`.
    pub fn apply_delta(
        &mut self,
        message: &BookMessage,
        policy: &dyn GapPolicy,
    ) -> Result<DeltaOutcome, Error> {
        let symbol = &message.symbol;
        let Some(entry) = self.books.get_mut(symbol) else {
            return Ok(DeltaOutcome::Untracked);
        };

        // Skip deltas if we're not synchronized
        if entry.state != BookState::Synchronized {
            debug!(symbol = %symbol, state = ?entry.state, "dropping delta");
            return Ok(DeltaOutcome::NotSynchronized);
        }

        match policy.check(entry.book.nonce(), message) {
            Verdict::Apply => {}
            Verdict::Stale => {
                debug!(symbol = %symbol, nonce = ?message.nonce, "dropping stale delta");
                return Ok(DeltaOutcome::Stale);
            }
            Verdict::Gap { expected, got } => {
                warn!(symbol = %symbol, expected, got, "sequence gap detected");
                entry.state = BookState::NeedsResync;
                return Err(Error::SequenceGap { expected, got });
            }
        }

        let parsed = message.parse_levels(entry.book.kind());
        let applied = entry
            .book
            .update(&parsed.bids, &parsed.asks, message.timestamp, message.nonce);
        let report = parsed.into_report(applied);
        log_rejections(symbol, &report);
        Ok(DeltaOutcome::Applied(report))
    }

    /// Mark an orderbook as needing resync
    ///
    /// Used by callers running their own gap detection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`] if the symbol is not tracked.
    pub fn mark_needs_resync(&mut self, symbol: &str) -> Result<(), Error> {
        let entry = self
            .books
            .get_mut(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))?;
        entry.state = BookState::NeedsResync;
        info!(symbol = %symbol, "resync requested");
        Ok(())
    }

    /// Drop all orderbooks
    pub fn clear(&mut self) {
        self.books.clear();
    }

    /// Get number of tracked markets
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Check if no markets are tracked
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Get all tracked symbols
    pub fn symbols(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }
}

fn log_rejections(symbol: &str, report: &UpdateReport) {
    for rejected in &report.rejected {
        warn!(
            symbol = %symbol,
            side = ?rejected.side,
            index = rejected.index,
            error = %rejected.error,
            "rejected delta"
        );
    }
}
