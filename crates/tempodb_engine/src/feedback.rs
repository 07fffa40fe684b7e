//! Per-source-row outcome reporting.

use crate::plan::{MergePlan, OpKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tempodb_model::payload::Payload;
use tempodb_model::{EntityKey, SourceRow, SourceRowId};

/// Why a source row was skipped rather than applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// A later-submitted row fully covers this row's interval.
    Eclipsed,
    /// The merge mode does not apply to this row (e.g. an existing entity
    /// under `INSERT_NEW_ENTITIES`).
    FilteredByMode,
    /// A portion-of mode found no existing entity to patch.
    NoMatchingEntity,
}

/// Outcome of one source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackStatus {
    /// The row founded or extended an entity with at least one insert.
    Inserted,
    /// The row changed existing coverage.
    Updated,
    /// The row removed coverage.
    Deleted,
    /// The target already reflected the row.
    Unchanged,
    /// The row was skipped.
    Skipped,
    /// The row was rejected; see the message.
    Error,
}

/// One feedback relation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// The source row this outcome belongs to.
    pub source_row_id: SourceRowId,
    /// Outcome classification.
    pub status: FeedbackStatus,
    /// Skip reason, when status is `Skipped`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Identity generated for the row's entity, when one was minted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_identity: Option<Payload>,
    /// Error message, when status is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Feedback {
    /// Creates an error feedback row.
    #[must_use]
    pub fn error(source_row_id: SourceRowId, message: impl Into<String>) -> Self {
        Self {
            source_row_id,
            status: FeedbackStatus::Error,
            skip_reason: None,
            generated_identity: None,
            error: Some(message.into()),
        }
    }

    /// Creates a skip feedback row.
    #[must_use]
    pub fn skipped(source_row_id: SourceRowId, reason: SkipReason) -> Self {
        Self {
            source_row_id,
            status: FeedbackStatus::Skipped,
            skip_reason: Some(reason),
            generated_identity: None,
            error: None,
        }
    }

    fn applied(source_row_id: SourceRowId, status: FeedbackStatus) -> Self {
        Self {
            source_row_id,
            status,
            skip_reason: None,
            generated_identity: None,
            error: None,
        }
    }
}

/// Attributes executed plan operations back to source rows.
///
/// Early feedback (errors and skips from planning) is carried through
/// unchanged; every surviving row is classified by the strongest operation
/// it contributed to: insert over update over delete over keep.
#[must_use]
pub fn attribute(
    plan: &MergePlan,
    generated: &BTreeMap<EntityKey, Payload>,
    source_rows: &[SourceRow],
) -> Vec<Feedback> {
    let mut by_row: BTreeMap<SourceRowId, Feedback> = BTreeMap::new();

    for early in &plan.early_feedback {
        by_row.insert(early.source_row_id, early.clone());
    }

    for op in &plan.ops {
        let status = match op.kind {
            // A physical insert on an existing entity (a split remnant,
            // say) is an update of that entity, not an insertion.
            OpKind::Insert if op.is_new_entity => FeedbackStatus::Inserted,
            OpKind::Insert | OpKind::Update => FeedbackStatus::Updated,
            OpKind::Delete => FeedbackStatus::Deleted,
            OpKind::Keep => FeedbackStatus::Unchanged,
        };
        for row_id in &op.sources {
            let entry = by_row
                .entry(*row_id)
                .or_insert_with(|| Feedback::applied(*row_id, status));
            if rank(status) > rank(entry.status) {
                entry.status = status;
            }
            if entry.generated_identity.is_none() {
                if let Some(identity) = generated.get(&op.entity) {
                    entry.generated_identity = Some(identity.clone());
                }
            }
        }
    }

    // Rows that reached planning but produced no operation at all saw a
    // target that already reflected them.
    let mut feedback: Vec<Feedback> = source_rows
        .iter()
        .map(|row| {
            by_row
                .remove(&row.row_id)
                .unwrap_or_else(|| Feedback::applied(row.row_id, FeedbackStatus::Unchanged))
        })
        .collect();
    feedback.sort_by_key(|f| f.source_row_id);
    feedback
}

fn rank(status: FeedbackStatus) -> u8 {
    match status {
        FeedbackStatus::Error => 5,
        FeedbackStatus::Inserted => 4,
        FeedbackStatus::Updated => 3,
        FeedbackStatus::Deleted => 2,
        FeedbackStatus::Skipped => 1,
        FeedbackStatus::Unchanged => 0,
    }
}

/// Writes generated identities back into source rows of founding groups.
pub fn backfill_identities(
    source_rows: &mut [SourceRow],
    feedback: &[Feedback],
) {
    let generated: BTreeMap<SourceRowId, &Payload> = feedback
        .iter()
        .filter_map(|f| f.generated_identity.as_ref().map(|g| (f.source_row_id, g)))
        .collect();
    for row in source_rows {
        if let Some(identity) = generated.get(&row.row_id) {
            for (k, v) in identity.iter() {
                row.identity.insert(k.clone(), v.clone());
            }
        }
    }
}
