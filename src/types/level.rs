//! Incoming deltas and stored price levels.
//!
//! A [`Delta`] is what the parsing layer hands to a book side: an absolute
//! size for one price (or one order id). A [`PriceLevel`] is what the side
//! stores. Zero size means "delete", so a stored level always has a
//! positive size.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::{Price, Size};
use crate::error::Error;
use crate::orderbook::BookKind;

/// One incremental change to a book side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    /// Level price. Only indexed sides accept a missing price, and only for
    /// ids they already hold.
    pub price: Option<Price>,
    /// New absolute size; zero removes the level
    pub size: Size,
    /// Number of orders at the level (counted sides)
    pub count: Option<u32>,
    /// Order id (indexed sides)
    pub id: Option<String>,
}

impl Delta {
    /// A plain `(price, size)` delta
    pub fn new(price: Price, size: Size) -> Self {
        Self {
            price: Some(price),
            size,
            count: None,
            id: None,
        }
    }

    /// A `(price, size, count)` delta for counted sides
    pub fn counted(price: Price, size: Size, count: u32) -> Self {
        Self {
            price: Some(price),
            size,
            count: Some(count),
            id: None,
        }
    }

    /// A `(price, size, id)` delta for indexed sides
    pub fn indexed(price: Option<Price>, size: Size, id: impl Into<String>) -> Self {
        Self {
            price,
            size,
            count: None,
            id: Some(id.into()),
        }
    }

    /// Whether this delta deletes its level
    pub fn is_removal(&self) -> bool {
        self.size.is_zero() || self.count == Some(0)
    }

    /// Parse a raw JSON level as sent by exchanges
    ///
    /// Accepts the tuple form `[price, size]`, `[price, size, count]`
    /// (counted) or `[price, size, id]` (indexed), and the object form
    /// `{"price": .., "size"|"amount": .., "count": .., "id": ..}`. Numbers
    /// may be JSON numbers or numeric strings, including scientific notation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDelta`] for non-numeric prices or sizes and
    /// for values that are neither an array nor an object.
    pub fn parse(value: &Value, kind: BookKind) -> Result<Self, Error> {
        let (price, size, extra) = match value {
            Value::Array(items) => {
                if items.len() < 2 {
                    return Err(Error::malformed(format!(
                        "expected at least [price, size], got {}",
                        value
                    )));
                }
                (Some(&items[0]), &items[1], items.get(2))
            }
            Value::Object(map) => {
                let size = map
                    .get("size")
                    .or_else(|| map.get("amount"))
                    .ok_or_else(|| Error::malformed(format!("missing size in {}", value)))?;
                let extra = match kind {
                    BookKind::Plain => None,
                    BookKind::Counted => map.get("count"),
                    BookKind::Indexed => map.get("id"),
                };
                (map.get("price"), size, extra)
            }
            other => {
                return Err(Error::malformed(format!(
                    "expected array or object, got {}",
                    other
                )))
            }
        };

        let price = match price {
            None | Some(Value::Null) => None,
            Some(raw) => Some(parse_decimal(raw, "price")?),
        };
        let size = parse_decimal(size, "size")?;

        let mut delta = Delta {
            price,
            size,
            count: None,
            id: None,
        };
        match (kind, extra) {
            (BookKind::Counted, Some(raw)) => delta.count = Some(parse_count(raw)?),
            (BookKind::Indexed, Some(raw)) => delta.id = parse_id(raw)?,
            _ => {}
        }
        Ok(delta)
    }
}

/// A level stored on a book side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    /// Level price
    pub price: Price,
    /// Resting size, always positive
    pub size: Size,
    /// Number of orders (counted sides)
    pub count: Option<u32>,
    /// Order id (indexed sides)
    pub id: Option<String>,
}

impl PriceLevel {
    /// A plain level
    pub fn new(price: Price, size: Size) -> Self {
        Self {
            price,
            size,
            count: None,
            id: None,
        }
    }

    /// Notional value (price * size) at this level, `None` on overflow
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.size)
    }

    /// `(price, size)` pair
    pub fn pair(&self) -> (Price, Size) {
        (self.price, self.size)
    }
}

/// Levels serialize as compact tuples: `[price, size]`, `[price, size, count]`
/// or `[price, size, id]`.
impl Serialize for PriceLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 2 + usize::from(self.count.is_some()) + usize::from(self.id.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.price)?;
        seq.serialize_element(&self.size)?;
        if let Some(count) = self.count {
            seq.serialize_element(&count)?;
        }
        if let Some(id) = &self.id {
            seq.serialize_element(id)?;
        }
        seq.end()
    }
}

fn parse_decimal(value: &Value, field: &str) -> Result<Decimal, Error> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => {
            return Err(Error::malformed(format!(
                "{} is not numeric: {}",
                field, other
            )))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| Error::malformed(format!("{} is not numeric: {:?}", field, text)))
}

fn parse_count(value: &Value) -> Result<u32, Error> {
    let count = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    count
        .and_then(|c| u32::try_from(c).ok())
        .ok_or_else(|| Error::malformed(format!("count is not a non-negative integer: {}", value)))
}

fn parse_id(value: &Value) -> Result<Option<String>, Error> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(Error::malformed(format!("id is not a string: {}", other))),
    }
}
