//! Bounded cache that upserts records by `(symbol, id)`.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::{effective_limit, tail_of, CacheRecord, UpdateTracker};

/// Fixed-capacity FIFO where a record with a known `(symbol, id)` replaces
/// the stored one in place
///
/// Each slot carries an absolute sequence number; the index maps ids to
/// sequence numbers, so an upsert finds its slot in O(1) no matter how many
/// records were evicted in between. Records without an id are appended
/// without deduplication.
#[derive(Debug)]
pub struct ArrayCacheBySymbolById<T> {
    items: VecDeque<T>,
    capacity: usize,
    /// Sequence number of `items[0]`
    head: u64,
    /// symbol -> id -> sequence number
    index: FxHashMap<String, FxHashMap<String, u64>>,
    updates: UpdateTracker,
}

impl<T: CacheRecord> ArrayCacheBySymbolById<T> {
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
    ///
    /// A record whose `(symbol, id)` is already cached overwrites it and
    /// keeps its position; anything else is appended, evicting the oldest
    /// record if the cache is full.
    pub fn append(&mut self, item: T) {
        let symbol = item.symbol().to_string();
        let id = item.id().map(str::to_string);
        self.updates.record(&symbol, id.as_deref());

        if let Some(id) = id.as_deref() {
            let existing = self.index.get(&symbol).and_then(|ids| ids.get(id)).copied();
            if let Some(seq) = existing {
                let position = (seq - self.head) as usize;
                self.items[position] = item;
                return;
            }
        }

        if self.items.len() == self.capacity {
            self.evict_oldest();
        }

        let seq = self.head + self.items.len() as u64;
        if let Some(id) = id {
            self.index.entry(symbol).or_default().insert(id, seq);
        }
        self.items.push_back(item);
    }

    /// Look up a record by symbol and id
    pub fn get(&self, symbol: &str, id: &str) -> Option<&T> {
        let seq = *self.index.get(symbol)?.get(id)?;
        self.items.get((seq - self.head) as usize)
    }

    /// Number of most-recent records a reader should take for `symbol`
    ///
    /// New-record counts are per distinct id, so repeated updates of one
    /// order count once.
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
        self.index.clear();
        self.head = 0;
        self.updates.reset();
    }

    fn evict_oldest(&mut self) {
        let Some(evicted) = self.items.pop_front() else {
            return;
        };
        let seq = self.head;
        self.head += 1;

        let Some(id) = evicted.id() else {
            return;
        };
        let symbol = evicted.symbol();
        if let Some(ids) = self.index.get_mut(symbol) {
            if ids.get(id) == Some(&seq) {
                ids.remove(id);
            }
            if ids.is_empty() {
                self.index.remove(symbol);
            }
        }
    }
}
