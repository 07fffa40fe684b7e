//! Table fixtures and batch-building helpers.

use serde_json::json;
use tempodb_model::payload::Payload;
use tempodb_model::{Era, SourceRow, SourceRowId, TableSchema};
use tempodb_store::TemporalTable;

/// A temporal table with convenience seeding helpers.
pub struct TestTable {
    /// The table under test.
    pub table: TemporalTable,
}

impl TestTable {
    /// A `positions` table: surrogate `id`, payload `title`/`rate`.
    pub fn positions() -> Self {
        let schema = TableSchema::new(
            "positions",
            vec!["title".to_string(), "rate".to_string()],
        )
        .identity_columns(vec!["id".to_string()]);
        Self {
            table: TemporalTable::new(schema).expect("valid fixture schema"),
        }
    }

    /// An `employees` table with a natural key, a required column and an
    /// ephemeral audit column.
    pub fn employees() -> Self {
        let schema = TableSchema::new(
            "employees",
            vec![
                "email".to_string(),
                "title".to_string(),
                "edited_at".to_string(),
            ],
        )
        .identity_columns(vec!["id".to_string()])
        .natural_key_columns(vec!["email".to_string()])
        .required_columns(vec!["title".to_string()])
        .era(Era::default().ephemeral_columns(vec!["edited_at".to_string()]));
        Self {
            table: TemporalTable::new(schema).expect("valid fixture schema"),
        }
    }

    /// Inserts a row directly, bypassing the merge engine.
    pub fn seed(&mut self, id: &str, from: i64, until: i64, payload: serde_json::Value) {
        let identity = as_map(json!({ "id": id }));
        self.table
            .insert(identity, from.into(), until.into(), as_map(payload))
            .expect("fixture seed row");
    }

    /// All `(interval, payload)` pairs, sorted for assertions.
    pub fn spans(&self) -> Vec<(String, Payload)> {
        let mut rows: Vec<_> = self
            .table
            .rows()
            .map(|r| {
                (
                    r.interval().expect("stored interval").to_string(),
                    r.payload.clone(),
                )
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

impl std::ops::Deref for TestTable {
    type Target = TemporalTable;

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

impl std::ops::DerefMut for TestTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.table
    }
}

/// Converts a JSON object literal into a payload map.
///
/// Panics on non-object values; fixtures only.
pub fn as_map(v: serde_json::Value) -> Payload {
    v.as_object().expect("JSON object literal").clone()
}

/// Builds a source row with integer boundaries.
pub fn source_row(row_id: u64, from: i64, until: i64, payload: serde_json::Value) -> SourceRow {
    SourceRow::new(
        SourceRowId::new(row_id),
        from.into(),
        until.into(),
        as_map(payload),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_build_valid_tables() {
        let mut t = TestTable::positions();
        t.seed("e1", 0, 10, json!({"title": "A"}));
        assert_eq!(t.len(), 1);
        assert_eq!(t.spans()[0].0, "[0, 10)");

        let e = TestTable::employees();
        assert!(e.is_empty());
        assert_eq!(e.schema().required_columns, vec!["title".to_string()]);
    }
}
