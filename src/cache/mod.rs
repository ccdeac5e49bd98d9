//! Bounded replay caches for streamed records.
//!
//! Every cache is a fixed-capacity FIFO: appending to a full cache evicts the
//! oldest record, and iteration runs oldest-to-newest.
//!
//! - [`ArrayCache`] - append-only (public trades)
//! - [`ArrayCacheBySymbolById`] - upsert by `(symbol, id)` (user orders)
//! - [`ArrayCacheByTimestamp`] - upsert by timestamp (forming candles)
//!
//! All three track how many records arrived since a consumer last asked,
//! which is what [`ArrayCache::get_limit`] reports: a watcher that wakes up
//! after three new trades gets exactly those three.

mod array;
mod by_id;
mod by_timestamp;

pub use array::ArrayCache;
pub use by_id::ArrayCacheBySymbolById;
pub use by_timestamp::ArrayCacheByTimestamp;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::TimestampMs;

/// A record that can live in a cache
pub trait CacheRecord {
    /// Market symbol the record belongs to
    fn symbol(&self) -> &str;

    /// Exchange id, used by [`ArrayCacheBySymbolById`]
    fn id(&self) -> Option<&str> {
        None
    }

    /// Record time, used by [`ArrayCacheByTimestamp`]
    fn timestamp(&self) -> Option<TimestampMs> {
        None
    }
}

/// New records since the last read, for one symbol or overall
#[derive(Debug, Default)]
struct Pending {
    /// Records without a key
    appended: usize,
    /// Distinct keys (ids, timestamps) touched
    keys: FxHashSet<String>,
}

impl Pending {
    /// Reads never return more than `capacity` records, so once that many
    /// are pending further keys are not kept.
    fn add(&mut self, key: Option<String>, capacity: usize) {
        if self.count() >= capacity {
            return;
        }
        match key {
            Some(key) => {
                self.keys.insert(key);
            }
            None => self.appended += 1,
        }
    }

    fn count(&self) -> usize {
        self.appended + self.keys.len()
    }
}

/// Counts new records per symbol between reads
///
/// A read marks the counter for reset; the reset happens lazily on the next
/// append, so repeated reads without new data report the same count.
#[derive(Debug, Default)]
struct UpdateTracker {
    capacity: usize,
    all: Pending,
    by_symbol: FxHashMap<String, Pending>,
    clear_all: bool,
    clear_symbols: FxHashSet<String>,
}

impl UpdateTracker {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn record(&mut self, symbol: &str, key: Option<&str>) {
        if self.clear_all {
            self.clear_all = false;
            self.clear_symbols.clear();
            self.all = Pending::default();
            self.by_symbol.clear();
        }
        if self.clear_symbols.remove(symbol) {
            self.by_symbol.remove(symbol);
        }
        self.by_symbol
            .entry(symbol.to_string())
            .or_default()
            .add(key.map(str::to_string), self.capacity);
        // keys from different symbols must not collide in the overall count
        self.all
            .add(key.map(|k| format!("{}\u{0}{}", symbol, k)), self.capacity);
    }

    fn take(&mut self, symbol: Option<&str>) -> Option<usize> {
        match symbol {
            None => {
                self.clear_all = true;
                Some(self.all.count())
            }
            Some(symbol) => {
                self.clear_symbols.insert(symbol.to_string());
                self.by_symbol.get(symbol).map(Pending::count)
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.capacity);
    }
}

/// Effective read size: requested limit, new-record count and capacity
fn effective_limit(pending: Option<usize>, requested: Option<usize>, capacity: usize) -> usize {
    let limit = match (pending, requested) {
        (None, None) => capacity,
        (None, Some(requested)) => requested,
        (Some(pending), None) => pending,
        (Some(pending), Some(requested)) => pending.min(requested),
    };
    limit.min(capacity)
}

/// The `n` newest records matching `symbol`, oldest first
fn tail_of<'a, T, I>(records: I, symbol: Option<&str>, n: usize) -> Vec<&'a T>
where
    T: CacheRecord + 'a,
    I: DoubleEndedIterator<Item = &'a T>,
{
    let mut tail: Vec<&T> = records
        .rev()
        .filter(|record| symbol.map_or(true, |s| record.symbol() == s))
        .take(n)
        .collect();
    tail.reverse();
    tail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts_per_symbol() {
        let mut tracker = UpdateTracker::new(10);
        tracker.record("A", None);
        tracker.record("A", None);
        tracker.record("B", None);

        assert_eq!(tracker.take(Some("A")), Some(2));
        assert_eq!(tracker.take(Some("C")), None);
        // not cleared until the next append
        assert_eq!(tracker.take(Some("A")), Some(2));

        tracker.record("A", None);
        assert_eq!(tracker.take(Some("A")), Some(1));
        assert_eq!(tracker.take(None), Some(4));
    }

    #[test]
    fn test_tracker_counts_distinct_keys() {
        let mut tracker = UpdateTracker::new(10);
        tracker.record("A", Some("1"));
        tracker.record("A", Some("1"));
        tracker.record("B", Some("1"));
        assert_eq!(tracker.take(Some("A")), Some(1));
        assert_eq!(tracker.take(None), Some(2));
    }

    #[test]
    fn test_tracker_bounded_by_capacity() {
        let mut tracker = UpdateTracker::new(10);
        for i in 0..10_000 {
            tracker.record("X", Some(&i.to_string()));
            tracker.record("Y", None);
        }
        assert_eq!(tracker.all.keys.len() + tracker.all.appended, 10);
        assert_eq!(tracker.by_symbol["X"].keys.len(), 10);
        assert_eq!(tracker.by_symbol["Y"].appended, 10);
        assert_eq!(tracker.take(Some("X")), Some(10));

        // a read resets the bound
        tracker.record("X", Some("fresh"));
        assert_eq!(tracker.take(Some("X")), Some(1));
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(None, None, 10), 10);
        assert_eq!(effective_limit(None, Some(50), 10), 10);
        assert_eq!(effective_limit(Some(3), Some(5), 10), 3);
        assert_eq!(effective_limit(Some(30), None, 10), 10);
    }
}
