//! Sequence gap policies.
//!
//! The book itself never looks at nonces. Each exchange layer decides what a
//! gap is by handing the registry a [`GapPolicy`]; on a gap the registry
//! stops applying deltas until a fresh snapshot arrives.

use std::fmt::Debug;

use crate::types::BookMessage;

/// What to do with an incoming delta batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Apply the batch
    Apply,
    /// The batch is older than the book, drop it silently
    Stale,
    /// Messages were missed, the book must be resynchronized
    Gap {
        /// Nonce the policy expected next
        expected: i64,
        /// Nonce that actually arrived
        got: i64,
    },
}

/// Decides whether a delta batch continues the book's sequence
pub trait GapPolicy: Debug + Send + Sync {
    /// Check `batch` against the nonce of the last applied message
    fn check(&self, last_nonce: Option<i64>, batch: &BookMessage) -> Verdict;
}

/// Apply everything, never report a gap
#[derive(Debug, Clone, Copy, Default)]
pub struct Permissive;

impl GapPolicy for Permissive {
    fn check(&self, _last_nonce: Option<i64>, _batch: &BookMessage) -> Verdict {
        Verdict::Apply
    }
}

/// Every message carries the next nonce: `nonce == last + 1`
///
/// Batches without a nonce, or arriving before any nonce is known, are
/// applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct Contiguous;

impl GapPolicy for Contiguous {
    fn check(&self, last_nonce: Option<i64>, batch: &BookMessage) -> Verdict {
        let (Some(last), Some(nonce)) = (last_nonce, batch.nonce) else {
            return Verdict::Apply;
        };
        if nonce <= last {
            return Verdict::Stale;
        }
        // last < nonce, so this cannot overflow
        let expected = last + 1;
        if nonce == expected {
            Verdict::Apply
        } else {
            Verdict::Gap {
                expected,
                got: nonce,
            }
        }
    }
}

/// Each message covers a range `[first_nonce, nonce]` that must contain
/// `last + 1`; messages ending at or before `last` are stale
///
/// Falls back to [`Contiguous`] semantics when `first_nonce` is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bracketed;

impl GapPolicy for Bracketed {
    fn check(&self, last_nonce: Option<i64>, batch: &BookMessage) -> Verdict {
        let (Some(last), Some(nonce)) = (last_nonce, batch.nonce) else {
            return Verdict::Apply;
        };
        if nonce <= last {
            return Verdict::Stale;
        }
        let first = batch.first_nonce.unwrap_or(nonce);
        // last < nonce, so this cannot overflow
        let expected = last + 1;
        if first > expected {
            Verdict::Gap {
                expected,
                got: first,
            }
        } else {
            Verdict::Apply
        }
    }
}
