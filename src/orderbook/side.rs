//! One side (bids or asks) of an order book.
//!
//! A [`BookSide`] is a `Vec<PriceLevel>` kept sorted best-first, plus an id
//! index for indexed books. All three variants share the same binary-search
//! positioning and the same depth cap; they differ only in how a delta finds
//! its existing entry (by price or by id).
//!
//! - O(log n) lookup of a price, O(n) shift on insert/remove
//! - O(1) access to the best level (always index 0)
//! - Ties between equal prices (indexed books only) keep arrival order

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Delta, Price, PriceLevel, Size};

/// Which side of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side, best = highest price
    Bid,
    /// Sell side, best = lowest price
    Ask,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Whether price `a` is strictly more competitive than `b` on this side
    #[inline]
    pub fn ranks_before(self, a: Price, b: Price) -> bool {
        match self {
            Side::Bid => a > b,
            Side::Ask => a < b,
        }
    }
}

/// Book variant, chosen when the book is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookKind {
    /// Aggregated levels keyed by price
    #[default]
    Plain,
    /// Aggregated levels keyed by price, with an order count per level
    Counted,
    /// Individual orders keyed by id, sorted by price
    Indexed,
}

/// One side of an order book
///
/// # Example
///
/// ```rust
/// use orderbook_stream::orderbook::{BookKind, BookSide, Side};
/// use rust_decimal::Decimal;
///
/// let mut bids = BookSide::new(Side::Bid, BookKind::Plain, Some(2));
/// bids.store(Decimal::from(10), Decimal::ONE).unwrap();
/// bids.store(Decimal::from(11), Decimal::ONE).unwrap();
/// bids.store(Decimal::from(9), Decimal::ONE).unwrap(); // beyond depth, evicted
///
/// assert_eq!(bids.len(), 2);
/// assert_eq!(bids.best().unwrap().price, Decimal::from(11));
/// ```
#[derive(Debug, Clone)]
pub struct BookSide {
    side: Side,
    kind: BookKind,
    depth: Option<usize>,

    /// Levels, best first
    levels: Vec<PriceLevel>,

    /// id -> price, indexed books only
    ids: FxHashMap<String, Price>,
}

impl BookSide {
    /// Create an empty side
    pub fn new(side: Side, kind: BookKind, depth: Option<usize>) -> Self {
        Self {
            side,
            kind,
            depth,
            levels: Vec::new(),
            ids: FxHashMap::default(),
        }
    }

    /// Create a side and load `deltas` into it
    ///
    /// Malformed deltas are skipped.
    pub fn from_deltas(side: Side, kind: BookKind, depth: Option<usize>, deltas: &[Delta]) -> Self {
        let mut book_side = Self::new(side, kind, depth);
        for delta in deltas {
            let _ = book_side.store_array(delta);
        }
        book_side
    }

    /// Which side this is
    pub fn side(&self) -> Side {
        self.side
    }

    /// Which variant this is
    pub fn kind(&self) -> BookKind {
        self.kind
    }

    /// Configured depth bound
    pub fn depth(&self) -> Option<usize> {
        self.depth
    }

    /// Apply one delta
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDelta`] (and leaves the side untouched) for
    /// a negative size, a missing price, a missing count on a counted side,
    /// or a missing id on an indexed side.
    pub fn store_array(&mut self, delta: &Delta) -> Result<(), Error> {
        if delta.size < Decimal::ZERO {
            return Err(Error::malformed(format!("negative size {}", delta.size)));
        }

        match self.kind {
            BookKind::Plain | BookKind::Counted => self.store_by_price(delta)?,
            BookKind::Indexed => self.store_by_id(delta)?,
        }

        self.enforce_depth();
        Ok(())
    }

    /// Apply a plain `(price, size)` delta
    pub fn store(&mut self, price: Price, size: Size) -> Result<(), Error> {
        self.store_array(&Delta::new(price, size))
    }

    /// Apply a `(price, size, count)` delta
    pub fn store_counted(&mut self, price: Price, size: Size, count: u32) -> Result<(), Error> {
        self.store_array(&Delta::counted(price, size, count))
    }

    /// Apply a `(price, size, id)` delta
    pub fn store_indexed(
        &mut self,
        price: Option<Price>,
        size: Size,
        id: impl Into<String>,
    ) -> Result<(), Error> {
        self.store_array(&Delta::indexed(price, size, id))
    }

    /// Truncate to the best `n` levels
    ///
    /// The configured depth still applies when `n` is larger or unset.
    pub fn limit(&mut self, n: Option<usize>) {
        let cap = match (n, self.depth) {
            (Some(n), Some(depth)) => n.min(depth),
            (Some(n), None) => n,
            (None, Some(depth)) => depth,
            (None, None) => return,
        };
        self.truncate(cap);
    }

    /// Remove every level
    pub fn clear(&mut self) {
        self.levels.clear();
        self.ids.clear();
    }

    /// All levels, best first
    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    /// Iterate levels, best first
    pub fn iter(&self) -> impl Iterator<Item = &PriceLevel> + '_ {
        self.levels.iter()
    }

    /// Best level
    pub fn best(&self) -> Option<&PriceLevel> {
        self.levels.first()
    }

    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the side holds no levels
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Sum of all resting sizes, `None` on overflow
    pub fn total_size(&self) -> Option<Size> {
        self.levels
            .iter()
            .try_fold(Size::ZERO, |total, l| total.checked_add(l.size))
    }

    /// Look up an indexed entry by id
    pub fn get_by_id(&self, id: &str) -> Option<&PriceLevel> {
        let price = *self.ids.get(id)?;
        self.position_of_id(id, price).map(|i| &self.levels[i])
    }

    /// Look up a level by price (first entry at that price)
    pub fn get(&self, price: Price) -> Option<&PriceLevel> {
        self.find_price(price).ok().map(|i| &self.levels[i])
    }

    fn store_by_price(&mut self, delta: &Delta) -> Result<(), Error> {
        let price = delta
            .price
            .ok_or_else(|| Error::malformed("missing price"))?;
        let counted = self.kind == BookKind::Counted;

        let found = self.find_price(price);
        if delta.size.is_zero() || (counted && delta.count == Some(0)) {
            if let Ok(index) = found {
                self.levels.remove(index);
            }
            return Ok(());
        }

        let count = if counted {
            Some(
                delta
                    .count
                    .ok_or_else(|| Error::malformed(format!("missing count at price {}", price)))?,
            )
        } else {
            None
        };

        match found {
            Ok(index) => {
                let level = &mut self.levels[index];
                level.size = delta.size;
                level.count = count;
            }
            Err(index) => self.levels.insert(
                index,
                PriceLevel {
                    price,
                    size: delta.size,
                    count,
                    id: None,
                },
            ),
        }
        Ok(())
    }

    fn store_by_id(&mut self, delta: &Delta) -> Result<(), Error> {
        let id = delta
            .id
            .as_deref()
            .ok_or_else(|| Error::malformed("missing id on indexed side"))?;
        let previous = self.ids.get(id).copied();

        if delta.size.is_zero() {
            if let Some(old_price) = previous {
                self.remove_id(id, old_price);
            }
            return Ok(());
        }

        let price = delta
            .price
            .or(previous)
            .ok_or_else(|| Error::malformed(format!("missing price for new id {}", id)))?;

        if let Some(old_price) = previous {
            if old_price == price {
                if let Some(index) = self.position_of_id(id, price) {
                    self.levels[index].size = delta.size;
                    return Ok(());
                }
            }
            self.remove_id(id, old_price);
        }

        let index = self.insertion_point(price);
        self.levels.insert(
            index,
            PriceLevel {
                price,
                size: delta.size,
                count: None,
                id: Some(id.to_string()),
            },
        );
        self.ids.insert(id.to_string(), price);
        Ok(())
    }

    /// Binary search for `price`: `Ok(first index at price)` or
    /// `Err(index where it would be inserted)`
    fn find_price(&self, price: Price) -> Result<usize, usize> {
        let side = self.side;
        let index = self
            .levels
            .partition_point(|level| side.ranks_before(level.price, price));
        match self.levels.get(index) {
            Some(level) if level.price == price => Ok(index),
            _ => Err(index),
        }
    }

    /// Index after every level at least as competitive as `price`
    fn insertion_point(&self, price: Price) -> usize {
        let side = self.side;
        self.levels
            .partition_point(|level| !side.ranks_before(price, level.price))
    }

    fn position_of_id(&self, id: &str, price: Price) -> Option<usize> {
        let start = self.find_price(price).ok()?;
        self.levels[start..]
            .iter()
            .take_while(|level| level.price == price)
            .position(|level| level.id.as_deref() == Some(id))
            .map(|offset| start + offset)
    }

    fn remove_id(&mut self, id: &str, price: Price) {
        if let Some(index) = self.position_of_id(id, price) {
            self.levels.remove(index);
        }
        self.ids.remove(id);
    }

    fn enforce_depth(&mut self) {
        if let Some(depth) = self.depth {
            self.truncate(depth);
        }
    }

    fn truncate(&mut self, len: usize) {
        if self.levels.len() <= len {
            return;
        }
        for evicted in self.levels.drain(len..) {
            if let Some(id) = evicted.id {
                self.ids.remove(&id);
            }
        }
    }
}

impl Default for BookSide {
    fn default() -> Self {
        Self::new(Side::Bid, BookKind::Plain, None)
    }
}

/// Volume-weighted average price of the best `n` levels
pub fn vwap(levels: &[PriceLevel], n: usize) -> Option<Decimal> {
    let top = &levels[..n.min(levels.len())];
    let mut volume = Decimal::ZERO;
    let mut notional = Decimal::ZERO;
    for level in top {
        volume = volume.checked_add(level.size)?;
        notional = notional.checked_add(level.notional()?)?;
    }
    if volume.is_zero() {
        return None;
    }
    notional.checked_div(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prices(side: &BookSide) -> Vec<Price> {
        side.iter().map(|l| l.price).collect()
    }

    #[test]
    fn test_bids_sorted_descending() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Plain, None);
        for p in [dec!(10), dec!(12), dec!(11), dec!(9)] {
            bids.store(p, dec!(1)).unwrap();
        }
        assert_eq!(prices(&bids), vec![dec!(12), dec!(11), dec!(10), dec!(9)]);
    }

    #[test]
    fn test_asks_sorted_ascending() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Plain, None);
        for p in [dec!(10), dec!(12), dec!(11), dec!(9)] {
            asks.store(p, dec!(1)).unwrap();
        }
        assert_eq!(prices(&asks), vec![dec!(9), dec!(10), dec!(11), dec!(12)]);
    }

    #[test]
    fn test_update_replaces_size() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Plain, None);
        asks.store(dec!(10), dec!(1)).unwrap();
        asks.store(dec!(10.00), dec!(3)).unwrap();
        assert_eq!(asks.len(), 1);
        assert_eq!(asks.best().unwrap().size, dec!(3));
    }

    #[test]
    fn test_zero_size_removes() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Plain, None);
        bids.store(dec!(100), dec!(1)).unwrap();
        bids.store(dec!(99), dec!(1)).unwrap();

        bids.store(dec!(100), dec!(0)).unwrap();
        assert_eq!(prices(&bids), vec![dec!(99)]);

        // absent price: no-op
        bids.store(dec!(100), dec!(0)).unwrap();
        assert_eq!(bids.len(), 1);
    }

    #[test]
    fn test_depth_evicts_tail() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Plain, Some(3));
        for p in [dec!(10), dec!(9), dec!(11), dec!(8)] {
            bids.store(p, dec!(1)).unwrap();
        }
        assert_eq!(prices(&bids), vec![dec!(11), dec!(10), dec!(9)]);
    }

    #[test]
    fn test_negative_size_rejected() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Plain, None);
        bids.store(dec!(10), dec!(1)).unwrap();
        assert!(bids.store(dec!(10), dec!(-1)).is_err());
        assert_eq!(bids.best().unwrap().size, dec!(1));
    }

    #[test]
    fn test_missing_price_rejected() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Plain, None);
        let delta = Delta {
            price: None,
            size: dec!(1),
            count: None,
            id: None,
        };
        assert!(matches!(
            asks.store_array(&delta),
            Err(Error::MalformedDelta(_))
        ));
        assert!(asks.is_empty());
    }

    #[test]
    fn test_limit() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Plain, None);
        for p in 1..=5 {
            asks.store(Decimal::from(p), dec!(1)).unwrap();
        }
        asks.limit(None);
        assert_eq!(asks.len(), 5);
        asks.limit(Some(10));
        assert_eq!(asks.len(), 5);
        asks.limit(Some(2));
        assert_eq!(prices(&asks), vec![dec!(1), dec!(2)]);
    }

    #[test]
    fn test_counted_side() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Counted, None);
        bids.store_counted(dec!(10), dec!(5), 2).unwrap();
        bids.store_counted(dec!(10), dec!(7), 3).unwrap();
        assert_eq!(bids.best().unwrap().count, Some(3));
        assert_eq!(bids.best().unwrap().size, dec!(7));

        // zero count deletes even with a size
        bids.store_counted(dec!(10), dec!(7), 0).unwrap();
        assert!(bids.is_empty());

        // count is required
        assert!(bids.store(dec!(10), dec!(1)).is_err());
    }

    #[test]
    fn test_indexed_relocates() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Indexed, None);
        asks.store_indexed(Some(dec!(10)), dec!(1), "a").unwrap();
        asks.store_indexed(Some(dec!(11)), dec!(1), "b").unwrap();
        asks.store_indexed(Some(dec!(12)), dec!(1), "a").unwrap();

        assert_eq!(asks.len(), 2);
        assert_eq!(prices(&asks), vec![dec!(11), dec!(12)]);
        assert_eq!(asks.get_by_id("a").unwrap().price, dec!(12));
    }

    #[test]
    fn test_indexed_size_update_keeps_position() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Indexed, None);
        bids.store_indexed(Some(dec!(10)), dec!(1), "a").unwrap();
        bids.store_indexed(Some(dec!(10)), dec!(1), "b").unwrap();
        bids.store_indexed(Some(dec!(10)), dec!(4), "a").unwrap();

        let ids: Vec<_> = bids.iter().map(|l| l.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(bids.get_by_id("a").unwrap().size, dec!(4));
    }

    #[test]
    fn test_indexed_missing_price_reuses_stored() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Indexed, None);
        bids.store_indexed(Some(dec!(10)), dec!(1), "a").unwrap();
        bids.store_indexed(None, dec!(2), "a").unwrap();
        assert_eq!(bids.get_by_id("a").unwrap().pair(), (dec!(10), dec!(2)));

        // unknown id without a price cannot be placed
        assert!(bids.store_indexed(None, dec!(2), "zz").is_err());
    }

    #[test]
    fn test_indexed_remove_ignores_price() {
        let mut bids = BookSide::new(Side::Bid, BookKind::Indexed, None);
        bids.store_indexed(Some(dec!(10)), dec!(1), "a").unwrap();
        bids.store_indexed(Some(dec!(999)), dec!(0), "a").unwrap();
        assert!(bids.is_empty());
        assert!(bids.get_by_id("a").is_none());

        let delta = Delta::new(dec!(10), dec!(1));
        assert!(bids.store_array(&delta).is_err());
    }

    #[test]
    fn test_indexed_depth_forgets_evicted_ids() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Indexed, Some(1));
        asks.store_indexed(Some(dec!(10)), dec!(1), "a").unwrap();
        asks.store_indexed(Some(dec!(9)), dec!(1), "b").unwrap();
        assert!(asks.get_by_id("a").is_none());

        // evicted ids are unknown again
        assert!(asks.store_indexed(None, dec!(1), "a").is_err());
    }

    #[test]
    fn test_vwap() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Plain, None);
        asks.store(dec!(10), dec!(1)).unwrap();
        asks.store(dec!(12), dec!(3)).unwrap();
        assert_eq!(vwap(asks.levels(), 2), Some(dec!(11.5)));
        assert_eq!(vwap(&[], 2), None);
        assert_eq!(asks.total_size(), Some(dec!(4)));
    }

    #[test]
    fn test_aggregates_overflow_to_none() {
        let mut asks = BookSide::new(Side::Ask, BookKind::Plain, None);
        asks.store(Decimal::MAX, Decimal::MAX).unwrap();
        asks.store(Decimal::ONE, Decimal::MAX).unwrap();

        assert_eq!(asks.get(Decimal::MAX).unwrap().notional(), None);
        assert_eq!(asks.best().unwrap().notional(), Some(Decimal::MAX));
        assert_eq!(vwap(asks.levels(), 2), None);
        assert_eq!(asks.total_size(), None);
    }
}
