//! Append-only bounded cache.

use std::collections::VecDeque;

use super::{effective_limit, tail_of, CacheRecord, UpdateTracker};

/// Fixed-capacity FIFO of records
///
/// # Example
///
/// ```rust
/// use orderbook_stream::cache::ArrayCache;
/// use orderbook_stream::types::Trade;
/// use rust_decimal::Decimal;
///
/// let mut trades = ArrayCache::new(2);
/// for i in 1..=3 {
///     trades.append(Trade::new("BTC/USDT", Decimal::from(i), Decimal::ONE));
/// }
///
/// let prices: Vec<_> = trades.iter().map(|t| t.price).collect();
/// assert_eq!(prices, vec![Decimal::from(2), Decimal::from(3)]);
/// ```
#[derive(Debug)]
pub struct ArrayCache<T> {
    items: VecDeque<T>,
    capacity: usize,
    updates: UpdateTracker,
}

impl<T: CacheRecord> ArrayCache<T> {
    /// Create an empty cache holding at most `capacity` records (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            updates: UpdateTracker::new(capacity),
        }
    }

    /// Add a record, evicting the oldest if the cache is full
    pub fn append(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.updates.record(item.symbol(), None);
        self.items.push_back(item);
    }

    /// Number of most-recent records a reader should take for `symbol`
    ///
    /// Bounded by `requested`, by the capacity, and by the number of records
    /// appended for `symbol` (all symbols when `None`) since the previous
    /// call for it.
    pub fn get_limit(&mut self, symbol: Option<&str>, requested: Option<usize>) -> usize {
        let pending = self.updates.take(symbol);
        effective_limit(pending, requested, self.capacity)
    }

    /// The `n` newest records for `symbol` (all when `None`), oldest first
    pub fn tail(&self, symbol: Option<&str>, n: usize) -> Vec<&T> {
        tail_of(self.items.iter(), symbol, n)
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Newest record
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every record and reset update counters
    pub fn clear(&mut self) {
        self.items.clear();
        self.updates.reset();
    }
}
