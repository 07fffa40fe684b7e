//! The plan relation: ordered row-level operations.

use crate::feedback::Feedback;
use serde::{Deserialize, Serialize};
use std::fmt;
use tempodb_model::payload::Payload;
use tempodb_model::{AllenRelation, EntityKey, Interval, SourceRowId, TargetRowId};

/// Kind of a planned operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpKind {
    /// Remove a target row.
    Delete,
    /// Rewrite a target row's interval and/or payload, keeping its identity.
    Update,
    /// Insert a new target row.
    Insert,
    /// Target row already matches; nothing to do.
    Keep,
}

impl OpKind {
    /// Returns true for operations that mutate the target.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Keep)
    }
}

/// How an update changes a row's interval.
///
/// Drives sequencing: shrinking frees timeline, growing claims it, and a
/// move does both at once and must run isolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateEffect {
    /// Interval unchanged (payload-only update).
    None,
    /// New interval lies within the old one.
    Shrink,
    /// New interval both leaves and claims timeline.
    Move,
    /// New interval contains the old one.
    Grow,
}

impl UpdateEffect {
    /// Classifies the interval change of an update.
    #[must_use]
    pub fn classify(old: &Interval, new: &Interval) -> Self {
        if old == new {
            Self::None
        } else if old.covers(new) {
            Self::Shrink
        } else if new.covers(old) {
            Self::Grow
        } else {
            Self::Move
        }
    }
}

/// One planned row-level operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOp {
    /// Position in execution order, starting at 1.
    pub seq: u64,
    /// Statement batch; operations sharing a batch could be applied as one
    /// set-based statement.
    pub statement: u32,
    /// Operation kind.
    pub kind: OpKind,
    /// Interval effect, for updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<UpdateEffect>,
    /// Canonical key of the entity the operation belongs to.
    pub entity: EntityKey,
    /// True when the operation founds a not-yet-existing entity.
    pub is_new_entity: bool,
    /// Identity-column values (empty until minted for new entities).
    pub identity: Payload,
    /// Target row acted on (absent for inserts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_row: Option<TargetRowId>,
    /// The row's interval before the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_interval: Option<Interval>,
    /// The row's interval after the operation (absent for deletes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_interval: Option<Interval>,
    /// Payload to write (absent for deletes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    /// Allen relation between old and new interval, when both exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<AllenRelation>,
    /// Source rows contributing to this operation.
    pub sources: Vec<SourceRowId>,
}

/// An ordered merge plan plus the feedback produced during planning.
///
/// Inspectable before execution; `plan`-only calls stop here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    /// Operations in execution order.
    pub ops: Vec<PlanOp>,
    /// Per-row errors and skips raised during planning.
    pub early_feedback: Vec<Feedback>,
}

impl MergePlan {
    /// Counts operations by kind: (delete, update, insert, keep).
    #[must_use]
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for op in &self.ops {
            match op.kind {
                OpKind::Delete => summary.deletes += 1,
                OpKind::Update => summary.updates += 1,
                OpKind::Insert => summary.inserts += 1,
                OpKind::Keep => summary.keeps += 1,
            }
        }
        summary.errors = self.early_feedback.len();
        summary
    }

    /// Returns true if no operation mutates the target.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(|op| !op.kind.is_mutation())
    }
}

/// Operation counts of a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Planned deletes.
    pub deletes: usize,
    /// Planned updates.
    pub updates: usize,
    /// Planned inserts.
    pub inserts: usize,
    /// Unchanged rows.
    pub keeps: usize,
    /// Early feedback rows (errors and skips).
    pub errors: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} delete, {} update, {} insert, {} keep, {} early feedback",
            self.deletes, self.updates, self.inserts, self.keeps, self.errors
        )
    }
}
