//! Configuration for a streaming session.
//!
//! This module provides the [`Config`] struct holding the defaults a
//! [`StreamSession`](crate::session::StreamSession) applies when it creates
//! books and caches.

use crate::error::Error;
use crate::orderbook::BookKind;

/// Default capacity of trade, order and OHLCV caches
pub const DEFAULT_CACHE_LIMIT: usize = 1000;

/// Default capacity of the broadcast channel the session driver publishes to
pub const DEFAULT_UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for a streaming session
///
/// # Example
///
/// ```rust
/// use orderbook_stream::Config;
/// use orderbook_stream::orderbook::BookKind;
///
/// let config = Config::new()
///     .with_book_kind(BookKind::Counted)
///     .with_book_depth(Some(50))
///     .with_trades_limit(500);
///
/// assert_eq!(config.book_depth(), Some(50));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Variant used for books created without an explicit kind
    book_kind: BookKind,

    /// Maximum levels per side (None = unbounded)
    book_depth: Option<usize>,

    /// Capacity of each per-symbol trade cache
    trades_limit: usize,

    /// Capacity of the shared order cache
    orders_limit: usize,

    /// Capacity of each per-symbol/timeframe candle cache
    ohlcv_limit: usize,

    /// Drop deltas until the first snapshot has been applied
    require_snapshot: bool,

    /// Capacity of the outbound book update channel
    update_channel_capacity: usize,
}

impl Config {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self {
            book_kind: BookKind::default(),
            book_depth: None,
            trades_limit: DEFAULT_CACHE_LIMIT,
            orders_limit: DEFAULT_CACHE_LIMIT,
            ohlcv_limit: DEFAULT_CACHE_LIMIT,
            require_snapshot: true,
            update_channel_capacity: DEFAULT_UPDATE_CHANNEL_CAPACITY,
        }
    }

    /// Set the default book variant
    #[must_use]
    pub fn with_book_kind(mut self, kind: BookKind) -> Self {
        self.book_kind = kind;
        self
    }

    /// Set the default depth bound per side
    #[must_use]
    pub fn with_book_depth(mut self, depth: Option<usize>) -> Self {
        self.book_depth = depth;
        self
    }

    /// Set the per-symbol trade cache capacity
    #[must_use]
    pub fn with_trades_limit(mut self, limit: usize) -> Self {
        self.trades_limit = limit;
        self
    }

    /// Set the order cache capacity
    #[must_use]
    pub fn with_orders_limit(mut self, limit: usize) -> Self {
        self.orders_limit = limit;
        self
    }

    /// Set the candle cache capacity
    #[must_use]
    pub fn with_ohlcv_limit(mut self, limit: usize) -> Self {
        self.ohlcv_limit = limit;
        self
    }

    /// Whether new books wait for a snapshot before accepting deltas
    #[must_use]
    pub fn with_require_snapshot(mut self, require: bool) -> Self {
        self.require_snapshot = require;
        self
    }

    /// Set the outbound update channel capacity
    #[must_use]
    pub fn with_update_channel_capacity(mut self, capacity: usize) -> Self {
        self.update_channel_capacity = capacity;
        self
    }

    /// Get the default book variant
    pub fn book_kind(&self) -> BookKind {
        self.book_kind
    }

    /// Get the default depth bound
    pub fn book_depth(&self) -> Option<usize> {
        self.book_depth
    }

    /// Get the trade cache capacity
    pub fn trades_limit(&self) -> usize {
        self.trades_limit
    }

    /// Get the order cache capacity
    pub fn orders_limit(&self) -> usize {
        self.orders_limit
    }

    /// Get the candle cache capacity
    pub fn ohlcv_limit(&self) -> usize {
        self.ohlcv_limit
    }

    /// Whether new books wait for a snapshot
    pub fn require_snapshot(&self) -> bool {
        self.require_snapshot
    }

    /// Get the outbound update channel capacity
    pub fn update_channel_capacity(&self) -> usize {
        self.update_channel_capacity
    }

    /// Check the settings for values the session cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a cache limit, the depth or the channel
    /// capacity is zero.
    pub fn validate(&self) -> Result<(), Error> {
        if self.book_depth == Some(0) {
            return Err(Error::Config("book depth must be at least 1".into()));
        }
        for (name, value) in [
            ("trades_limit", self.trades_limit),
            ("orders_limit", self.orders_limit),
            ("ohlcv_limit", self.ohlcv_limit),
            ("update_channel_capacity", self.update_channel_capacity),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
