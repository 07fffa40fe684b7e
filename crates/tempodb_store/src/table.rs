//! The in-memory temporal table.

use crate::error::{StoreError, StoreResult};
use std::collections::BTreeMap;
use tempodb_model::payload::Payload;
use tempodb_model::{EntityKey, Interval, TableSchema, TargetRow, TargetRowId, TimePoint};

/// An in-memory valid-time table.
///
/// Rows are keyed by a monotonically assigned [`TargetRowId`]. The table
/// enforces, immediately on every mutation, that no two rows of one entity
/// overlap in valid time and that required columns are present — the same
/// constraint pressure a native temporal table exerts, which is what makes
/// plan-operation ordering observable.
#[derive(Debug, Clone)]
pub struct TemporalTable {
    schema: TableSchema,
    rows: BTreeMap<TargetRowId, TargetRow>,
    next_row_id: u64,
}

impl TemporalTable {
    /// Creates an empty table for a validated schema.
    pub fn new(schema: TableSchema) -> StoreResult<Self> {
        schema.validate()?;
        Ok(Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 1,
        })
    }

    /// The table's schema.
    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a row by id.
    #[must_use]
    pub fn get(&self, row_id: TargetRowId) -> Option<&TargetRow> {
        self.rows.get(&row_id)
    }

    /// All rows, ordered by row id.
    pub fn rows(&self) -> impl Iterator<Item = &TargetRow> {
        self.rows.values()
    }

    /// Rows belonging to one entity, ordered by `valid_from`.
    #[must_use]
    pub fn rows_for_entity(&self, key: &EntityKey) -> Vec<&TargetRow> {
        let mut rows: Vec<&TargetRow> = self
            .rows
            .values()
            .filter(|r| r.entity_key().as_ref() == Some(key))
            .collect();
        rows.sort_by(|a, b| a.valid_from.cmp(&b.valid_from));
        rows
    }

    /// Inserts a row, enforcing identity, required-column and overlap
    /// constraints. Returns the assigned row id.
    pub fn insert(
        &mut self,
        identity: Payload,
        valid_from: TimePoint,
        valid_until: TimePoint,
        payload: Payload,
    ) -> StoreResult<TargetRowId> {
        let interval = Interval::new(valid_from.clone(), valid_until.clone())?;
        let key = EntityKey::from_map(&identity)
            .ok_or_else(|| StoreError::missing_identity("insert with empty identity"))?;
        self.check_required(&payload)?;
        self.check_overlap(&key, &interval, None)?;

        let row_id = TargetRowId::new(self.next_row_id);
        self.next_row_id += 1;
        self.rows.insert(
            row_id,
            TargetRow {
                row_id,
                identity,
                valid_from,
                valid_until,
                payload,
            },
        );
        tracing::trace!(%row_id, entity = %key, %interval, "inserted row");
        Ok(row_id)
    }

    /// Rewrites a row's interval and payload, keeping its identity.
    pub fn update(
        &mut self,
        row_id: TargetRowId,
        valid_from: TimePoint,
        valid_until: TimePoint,
        payload: Payload,
    ) -> StoreResult<()> {
        let interval = Interval::new(valid_from.clone(), valid_until.clone())?;
        let row = self
            .rows
            .get(&row_id)
            .ok_or(StoreError::RowNotFound { row_id })?;
        let key = row
            .entity_key()
            .ok_or_else(|| StoreError::missing_identity(format!("row {row_id}")))?;
        self.check_required(&payload)?;
        self.check_overlap(&key, &interval, Some(row_id))?;

        let row = self
            .rows
            .get_mut(&row_id)
            .ok_or(StoreError::RowNotFound { row_id })?;
        row.valid_from = valid_from;
        row.valid_until = valid_until;
        row.payload = payload;
        tracing::trace!(%row_id, entity = %key, %interval, "updated row");
        Ok(())
    }

    /// Removes a row.
    pub fn delete(&mut self, row_id: TargetRowId) -> StoreResult<TargetRow> {
        let row = self
            .rows
            .remove(&row_id)
            .ok_or(StoreError::RowNotFound { row_id })?;
        tracing::trace!(%row_id, "deleted row");
        Ok(row)
    }

    fn check_required(&self, payload: &Payload) -> StoreResult<()> {
        for col in &self.schema.required_columns {
            match payload.get(col) {
                Some(v) if !v.is_null() => {}
                _ => return Err(StoreError::required_column(col)),
            }
        }
        Ok(())
    }

    fn check_overlap(
        &self,
        key: &EntityKey,
        interval: &Interval,
        exclude: Option<TargetRowId>,
    ) -> StoreResult<()> {
        for row in self.rows.values() {
            if Some(row.row_id) == exclude {
                continue;
            }
            if row.entity_key().as_ref() != Some(key) {
                continue;
            }
            let existing = row.interval()?;
            if existing.overlaps(interval) {
                return Err(StoreError::OverlapViolation {
                    entity: key.to_string(),
                    first: existing.to_string(),
                    second: interval.to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn state(&self) -> (BTreeMap<TargetRowId, TargetRow>, u64) {
        (self.rows.clone(), self.next_row_id)
    }

    pub(crate) fn restore(&mut self, state: (BTreeMap<TargetRowId, TargetRow>, u64)) {
        self.rows = state.0;
        self.next_row_id = state.1;
    }
}
