//! Bounded cache that upserts records by timestamp.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::{effective_limit, tail_of, CacheRecord, UpdateTracker};
use crate::types::TimestampMs;

/// Fixed-capacity FIFO where a record with an already cached timestamp
/// replaces the stored one in place
///
/// Meant for one symbol/timeframe stream of candles: the exchange resends
/// the forming bar until it closes.
#[derive(Debug)]
pub struct ArrayCacheByTimestamp<T> {
    items: VecDeque<T>,
    capacity: usize,
    head: u64,
    /// timestamp -> sequence number
    index: FxHashMap<TimestampMs, u64>,
    updates: UpdateTracker,
}

impl<T: CacheRecord> ArrayCacheByTimestamp<T> {
    /// Create an empty cache holding at most `capacity` records (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            head: 0,
            index: FxHashMap::default(),
            updates: UpdateTracker::new(capacity),
        }
    }

    /// Add or replace a record
    pub fn append(&mut self, item: T) {
        let timestamp = item.timestamp();
        let key = timestamp.map(|ts| ts.to_string());
        self.updates.record(item.symbol(), key.as_deref());

        if let Some(seq) = timestamp.and_then(|ts| self.index.get(&ts)).copied() {
            let position = (seq - self.head) as usize;
            self.items[position] = item;
            return;
        }

        if self.items.len() == self.capacity {
            if let Some(evicted) = self.items.pop_front() {
                if let Some(ts) = evicted.timestamp() {
                    if self.index.get(&ts) == Some(&self.head) {
                        self.index.remove(&ts);
                    }
                }
                self.head += 1;
            }
        }

        if let Some(ts) = timestamp {
            self.index.insert(ts, self.head + self.items.len() as u64);
        }
        self.items.push_back(item);
    }

    /// Number of most-recent records a reader should take
    pub fn get_limit(&mut self, symbol: Option<&str>, requested: Option<usize>) -> usize {
        let pending = self.updates.take(symbol);
        effective_limit(pending, requested, self.capacity)
    }

    /// The `n` newest records, oldest first
    pub fn tail(&self, n: usize) -> Vec<&T> {
        tail_of(self.items.iter(), None, n)
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.items.iter()
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ohlcv;
    use rust_decimal::Decimal;

    fn candle(timestamp: i64, close: i64) -> Ohlcv {
        let close = Decimal::from(close);
        Ohlcv {
            symbol: "BTC/USDT".into(),
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ONE,
        }
    }

    #[test]
    fn test_forming_bar_replaced() {
        let mut cache = ArrayCacheByTimestamp::new(10);
        cache.append(candle(60_000, 1));
        cache.append(candle(60_000, 2));
        cache.append(candle(120_000, 3));

        let closes: Vec<_> = cache.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![Decimal::from(2), Decimal::from(3)]);
        assert_eq!(cache.get_limit(None, None), 2);
    }

    #[test]
    fn test_eviction() {
        let mut cache = ArrayCacheByTimestamp::new(2);
        for (i, ts) in [1, 2, 3].into_iter().enumerate() {
            cache.append(candle(ts, i as i64));
        }
        cache.append(candle(3, 9));
        let stamps: Vec<_> = cache.iter().map(|c| (c.timestamp, c.close)).collect();
        assert_eq!(stamps, vec![(2, Decimal::from(1)), (3, Decimal::from(9))]);
        assert_eq!(cache.tail(1)[0].timestamp, 3);
    }
}
