//! Source and target row representations.

use crate::error::ModelResult;
use crate::interval::Interval;
use crate::payload::Payload;
use crate::value::TimePoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one row in a source batch.
///
/// Assigned by the caller; later-submitted rows carry higher ids, which is
/// what eclipse precedence keys on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SourceRowId(pub u64);

impl SourceRowId {
    /// Creates a new source row id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src:{}", self.0)
    }
}

/// Identifier of one physical row in the target table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TargetRowId(pub u64);

impl TargetRowId {
    /// Creates a new target row id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TargetRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row:{}", self.0)
    }
}

/// Canonical, order-independent key identifying one entity.
///
/// Built from an identity (or natural-key) column map; equal maps produce
/// equal keys regardless of column order, because payload maps iterate
/// sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey(String);

impl EntityKey {
    /// Builds a key from the non-null entries of a column map.
    ///
    /// Returns `None` when every entry is null or the map is empty, i.e.
    /// the map does not identify anything.
    #[must_use]
    pub fn from_map(map: &Payload) -> Option<Self> {
        let parts: Vec<String> = map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("{k}={}", canonical_value(v)))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts.join("\u{1f}")))
        }
    }

    /// Builds a synthetic key for a not-yet-identified entity.
    #[must_use]
    pub fn founding(correlation: &str) -> Self {
        Self(format!("founding\u{1f}{correlation}"))
    }

    /// The canonical encoding.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Mints a fresh surrogate identity value.
///
/// Used when an insert founds a new entity and the target's identity
/// column has no caller-provided value.
#[must_use]
pub fn generate_surrogate() -> serde_json::Value {
    serde_json::Value::String(uuid::Uuid::new_v4().to_string())
}

/// One incoming record of a merge batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Caller-assigned row id, used for feedback attribution.
    pub row_id: SourceRowId,
    /// Values for the surrogate identity columns (may be empty).
    #[serde(default)]
    pub identity: Payload,
    /// Values for the natural-key columns (may be empty).
    #[serde(default)]
    pub natural_keys: Payload,
    /// Correlation id grouping rows that jointly found one new entity.
    #[serde(default)]
    pub founding_id: Option<String>,
    /// Inclusive lower bound of the row's validity.
    pub valid_from: TimePoint,
    /// Exclusive upper bound of the row's validity.
    pub valid_until: TimePoint,
    /// Data payload.
    #[serde(default)]
    pub payload: Payload,
    /// When set, the row carves its interval out of the timeline instead
    /// of contributing a payload.
    #[serde(default)]
    pub delete_marker: bool,
}

impl SourceRow {
    /// Creates a source row with the given id, interval and payload.
    #[must_use]
    pub fn new(
        row_id: SourceRowId,
        valid_from: TimePoint,
        valid_until: TimePoint,
        payload: Payload,
    ) -> Self {
        Self {
            row_id,
            identity: Payload::new(),
            natural_keys: Payload::new(),
            founding_id: None,
            valid_from,
            valid_until,
            payload,
            delete_marker: false,
        }
    }

    /// Sets the surrogate identity values.
    #[must_use]
    pub fn identity(mut self, identity: Payload) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the natural-key values.
    #[must_use]
    pub fn natural_keys(mut self, natural_keys: Payload) -> Self {
        self.natural_keys = natural_keys;
        self
    }

    /// Sets the founding correlation id.
    #[must_use]
    pub fn founding_id(mut self, id: impl Into<String>) -> Self {
        self.founding_id = Some(id.into());
        self
    }

    /// Marks the row as a deletion carve-out.
    #[must_use]
    pub fn delete_marker(mut self) -> Self {
        self.delete_marker = true;
        self
    }

    /// The row's validity interval; errors on zero or negative duration.
    pub fn interval(&self) -> ModelResult<Interval> {
        Interval::new(self.valid_from.clone(), self.valid_until.clone())
    }
}

/// One physical row of the target's current history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRow {
    /// Physical row id.
    pub row_id: TargetRowId,
    /// Values for the surrogate identity columns.
    pub identity: Payload,
    /// Inclusive lower bound.
    pub valid_from: TimePoint,
    /// Exclusive upper bound.
    pub valid_until: TimePoint,
    /// Data payload.
    pub payload: Payload,
}

impl TargetRow {
    /// The row's validity interval; errors indicate a corrupt target.
    pub fn interval(&self) -> ModelResult<Interval> {
        Interval::new(self.valid_from.clone(), self.valid_until.clone())
    }

    /// The entity key derived from the row's identity columns.
    #[must_use]
    pub fn entity_key(&self) -> Option<EntityKey> {
        EntityKey::from_map(&self.identity)
    }

    /// Projection of the natural-key columns out of identity and payload.
    #[must_use]
    pub fn natural_key_projection(&self, columns: &[String]) -> Payload {
        columns
            .iter()
            .filter_map(|c| {
                self.payload
                    .get(c)
                    .or_else(|| self.identity.get(c))
                    .map(|v| (c.clone(), v.clone()))
            })
            .collect()
    }
}
