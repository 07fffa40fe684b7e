//! Boundary scalars for valid-time intervals.

use crate::error::{ModelError, ModelResult};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A finite boundary value for a valid-time interval.
///
/// Boundaries are either integers (version counters, epoch days) or text
/// (ISO dates and timestamps, which compare correctly as strings).
/// Integers order before text so that the ordering is total even for
/// mixed batches; in practice one era uses a single boundary type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Boundary {
    /// Integer boundary.
    Integer(i64),
    /// Textual boundary (ISO-8601 dates/timestamps sort lexicographically).
    Text(String),
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Integer(n) => write!(f, "{n}"),
            Boundary::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Boundary {
    fn from(n: i64) -> Self {
        Boundary::Integer(n)
    }
}

impl From<&str> for Boundary {
    fn from(s: &str) -> Self {
        Boundary::Text(s.to_string())
    }
}

impl From<String> for Boundary {
    fn from(s: String) -> Self {
        Boundary::Text(s)
    }
}

/// One boundary point of a valid-time interval.
///
/// `Unbounded` is the maximum sentinel standing in for an open-ended
/// `valid_until` ("infinity"). Every finite point orders before it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimePoint {
    /// A concrete boundary value.
    Finite(Boundary),
    /// The open-ended upper sentinel.
    Unbounded,
}

impl TimePoint {
    /// Returns true if this point is the unbounded sentinel.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        matches!(self, TimePoint::Unbounded)
    }

    /// Interprets a JSON value as a time point.
    ///
    /// `null` and the string `"infinity"` map to [`TimePoint::Unbounded`];
    /// numbers must be integral; any other string is a textual boundary.
    pub fn from_json(value: &serde_json::Value) -> ModelResult<Self> {
        match value {
            serde_json::Value::Null => Ok(TimePoint::Unbounded),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(|i| TimePoint::Finite(Boundary::Integer(i)))
                .ok_or_else(|| {
                    ModelError::invalid_boundary(format!("non-integer number: {n}"))
                }),
            serde_json::Value::String(s) if s == "infinity" => Ok(TimePoint::Unbounded),
            serde_json::Value::String(s) => Ok(TimePoint::Finite(Boundary::Text(s.clone()))),
            other => Err(ModelError::invalid_boundary(format!(
                "expected number, string or null, got {other}"
            ))),
        }
    }

    /// Renders this point as a JSON value (`Unbounded` becomes `null`).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TimePoint::Finite(Boundary::Integer(n)) => serde_json::Value::from(*n),
            TimePoint::Finite(Boundary::Text(s)) => serde_json::Value::from(s.as_str()),
            TimePoint::Unbounded => serde_json::Value::Null,
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePoint::Finite(b) => write!(f, "{b}"),
            TimePoint::Unbounded => write!(f, "infinity"),
        }
    }
}

impl From<i64> for TimePoint {
    fn from(n: i64) -> Self {
        TimePoint::Finite(Boundary::Integer(n))
    }
}

impl From<&str> for TimePoint {
    fn from(s: &str) -> Self {
        TimePoint::Finite(Boundary::Text(s.to_string()))
    }
}

impl Serialize for TimePoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimePoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        TimePoint::from_json(&value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_orders_before_unbounded() {
        let p: TimePoint = "2024-01-01".into();
        assert!(p < TimePoint::Unbounded);
        assert!(TimePoint::from(i64::MAX) < TimePoint::Unbounded);
    }

    #[test]
    fn text_boundaries_sort_as_dates() {
        let a: TimePoint = "2024-03-01".into();
        let b: TimePoint = "2024-12-31".into();
        assert!(a < b);
    }

    #[test]
    fn json_round_trip() {
        let p = TimePoint::from_json(&serde_json::json!("2024-01-01")).unwrap();
        assert_eq!(p.to_json(), serde_json::json!("2024-01-01"));

        let inf = TimePoint::from_json(&serde_json::Value::Null).unwrap();
        assert!(inf.is_unbounded());
        assert_eq!(inf.to_json(), serde_json::Value::Null);

        let named = TimePoint::from_json(&serde_json::json!("infinity")).unwrap();
        assert!(named.is_unbounded());
    }

    #[test]
    fn rejects_fractional_numbers() {
        let err = TimePoint::from_json(&serde_json::json!(1.5)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidBoundary { .. }));
    }

    #[test]
    fn display_forms() {
        assert_eq!(format!("{}", TimePoint::from(42)), "42");
        assert_eq!(format!("{}", TimePoint::Unbounded), "infinity");
    }
}
