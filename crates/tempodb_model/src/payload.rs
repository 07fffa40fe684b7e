//! Payload maps and the equality rules used for coalescing.
//!
//! A payload is the non-temporal, non-identity portion of a row, kept as a
//! JSON object. Absent columns and explicit nulls are equivalent for
//! comparison purposes; ephemeral columns are excluded from the equality
//! used to decide whether adjacent segments coalesce.

use serde_json::Value;

/// A row payload: column name to JSON value.
///
/// `serde_json::Map` is BTreeMap-backed, so iteration order (and therefore
/// serialization) is canonical by key.
pub type Payload = serde_json::Map<String, Value>;

/// Returns a copy of `payload` without null-valued entries.
#[must_use]
pub fn strip_nulls(payload: &Payload) -> Payload {
    payload
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Overlays `patch` onto `base`, skipping null entries in `patch`.
///
/// This is PATCH semantics: an absent or null source column keeps the
/// base (target) value.
pub fn patch_into(base: &mut Payload, patch: &Payload) {
    for (k, v) in patch {
        if !v.is_null() {
            base.insert(k.clone(), v.clone());
        }
    }
}

/// Overlays `overlay` onto `base`, nulls included.
///
/// This is UPSERT semantics: an explicit null in the source nulls the
/// target column, while absent columns keep the base value.
pub fn overlay_into(base: &mut Payload, overlay: &Payload) {
    for (k, v) in overlay {
        base.insert(k.clone(), v.clone());
    }
}

/// Compares two payloads treating null and absent as equivalent and
/// ignoring the named columns.
#[must_use]
pub fn equal_ignoring(a: &Payload, b: &Payload, ignore: &[String]) -> bool {
    let significant = |payload: &Payload| -> Payload {
        payload
            .iter()
            .filter(|(k, v)| !v.is_null() && !ignore.iter().any(|i| i == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    };
    significant(a) == significant(b)
}

/// Hashes the non-null, non-ephemeral projection of a payload.
///
/// The coalescer compares these hashes instead of re-serializing payloads
/// for every adjacency check.
#[must_use]
pub fn content_hash(payload: &Payload, ephemeral: &[String]) -> u64 {
    let projected: Payload = payload
        .iter()
        .filter(|(k, v)| !v.is_null() && !ephemeral.iter().any(|e| e == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let serialized = serde_json::to_string(&Value::Object(projected)).unwrap_or_default();
    xxhash_rust::xxh3::xxh3_64(serialized.as_bytes())
}
