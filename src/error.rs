//! Error types for the orderbook-stream crate.
//!
//! Delta-application errors are local and recoverable: a malformed delta is
//! rejected on its own and the rest of the batch keeps going. Depth and cache
//! capacity are enforced by truncation and never surface as errors.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// A single delta could not be applied (negative size, missing price,
    /// missing id or count, non-numeric field)
    #[error("Malformed delta: {0}")]
    MalformedDelta(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Orderbook sequence gap detected (missed messages)
    #[error("Sequence gap: expected {expected}, got {got}")]
    SequenceGap {
        /// Expected nonce
        expected: i64,
        /// Actual nonce received
        got: i64,
    },

    /// Symbol is not tracked by the session
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl Error {
    /// Shorthand for building a [`Error::MalformedDelta`]
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedDelta(reason.into())
    }

    /// Whether this error only concerns a single delta and the stream can go on
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedDelta(_) | Error::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = Error::malformed("negative size -1");
        assert!(err.to_string().contains("negative size"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_sequence_gap() {
        let err = Error::SequenceGap {
            expected: 5,
            got: 8,
        };
        assert!(err.to_string().contains("5"));
        assert!(err.to_string().contains("8"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_json_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
