//! Payload resolution: computing the future state of each atomic segment.
//!
//! For every segment the covering source rows are stacked over the covering
//! target row (later-submitted rows override earlier), following the merge
//! mode's override semantics. A second pass enforces required columns,
//! inheriting values across segments inside existing coverage and applying
//! the extension policy outside it.

use crate::cache::CompiledMerge;
use crate::config::ExtensionPolicy;
use crate::feedback::Feedback;
use crate::identity::EntityBatch;
use crate::mode::MergeMode;
use crate::timeline::AtomicSegment;
use std::collections::BTreeSet;
use tempodb_model::payload::{self, Payload};
use tempodb_model::{Interval, SourceRow, SourceRowId, TargetRowId};

/// One atomic segment with its resolved future payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedSegment {
    /// The segment span.
    pub interval: Interval,
    /// Resolved data-column payload; `None` means the future state has no
    /// row over this span.
    pub payload: Option<Payload>,
    /// Ephemeral-column values to carry on the written row.
    pub ephemeral: Payload,
    /// True if at least one source row covers the segment.
    pub has_source: bool,
    /// Covering source rows, ascending by row id.
    pub sources: Vec<SourceRowId>,
    /// The target row covering the segment, if any.
    pub ancestor: Option<TargetRowId>,
    /// Content hash of the resolved payload, for coalescing equality.
    pub hash: u64,
}

/// Outcome of resolving one entity's segments.
///
/// When `failed` is non-empty the listed rows could not be applied; the
/// caller records their feedback, drops them from the batch and re-resolves
/// so that surviving rows are unaffected by the failed ones.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResolveOutcome {
    pub segments: Vec<ResolvedSegment>,
    pub failed: Vec<Feedback>,
}

pub(crate) fn resolve_payloads(
    batch: &EntityBatch,
    segments: &[AtomicSegment],
    compiled: &CompiledMerge,
) -> ResolveOutcome {
    // Entity deletion applies only to entities absent from the source
    // batch; a batch whose rows were all dropped as errors keeps its
    // history.
    let prune_uncovered = compiled.mode.is_entity_scope()
        && ((!batch.sources.is_empty() && compiled.delete_mode.deletes_timeline())
            || (!batch.in_batch && compiled.delete_mode.deletes_entities()));

    let mut resolved: Vec<ResolvedSegment> = segments
        .iter()
        .map(|seg| resolve_segment(batch, seg, compiled, prune_uncovered))
        .collect();

    let failed = enforce_required(batch, &mut resolved, compiled);
    for seg in &mut resolved {
        seg.hash = seg
            .payload
            .as_ref()
            .map(|p| payload::content_hash(p, &compiled.ephemeral_columns))
            .unwrap_or_default();
    }
    ResolveOutcome {
        segments: resolved,
        failed,
    }
}

fn resolve_segment(
    batch: &EntityBatch,
    seg: &AtomicSegment,
    compiled: &CompiledMerge,
    prune_uncovered: bool,
) -> ResolvedSegment {
    let covering: Vec<&SourceRow> = seg.source_idx.iter().map(|&i| &batch.sources[i]).collect();
    let target = seg.target_idx.map(|i| &batch.targets[i]);
    let sources: Vec<SourceRowId> = covering.iter().map(|r| r.row_id).collect();
    let ancestor = target.map(|t| t.row_id);

    let mut out = ResolvedSegment {
        interval: seg.interval.clone(),
        payload: None,
        ephemeral: Payload::new(),
        has_source: !covering.is_empty(),
        sources,
        ancestor,
        hash: 0,
    };

    if covering.is_empty() {
        // Target-only span: survives untouched unless the delete mode
        // claims coverage absent from the batch.
        if let Some(t) = target {
            if !prune_uncovered {
                out.payload = Some(data_projection(&t.payload, compiled));
                out.ephemeral = ephemeral_projection(&t.payload, compiled);
            }
        }
        return out;
    }

    // The latest-submitted covering row decides deletion.
    let latest = covering
        .iter()
        .max_by_key(|r| r.row_id)
        .map(|r| (**r).clone());
    let deletes = compiled.mode == MergeMode::DeleteForPortionOf
        || latest.as_ref().is_some_and(|r| r.delete_marker);
    if deletes {
        return out;
    }

    let mut data = target
        .map(|t| data_projection(&t.payload, compiled))
        .unwrap_or_default();
    if compiled.mode.is_replace() {
        // Only columns present in the source relation are replaced;
        // columns the source cannot supply keep their target values.
        for col in &compiled.source_data_columns {
            data.remove(col.as_str());
        }
    }
    for row in &covering {
        let overlay = data_projection(&row.payload, compiled);
        if compiled.mode.is_patch() {
            payload::patch_into(&mut data, &overlay);
        } else {
            payload::overlay_into(&mut data, &overlay);
        }
    }
    if compiled.mode.is_replace() {
        // Within the replacement scope an absent or null source column
        // means no value on the row.
        data = payload::strip_nulls(&data);
    }
    out.payload = Some(data);

    // Ephemeral values come from the latest covering source, falling back
    // to the target row.
    if let Some(row) = &latest {
        out.ephemeral = ephemeral_projection(&row.payload, compiled);
    }
    if out.ephemeral.is_empty() {
        if let Some(t) = target {
            out.ephemeral = ephemeral_projection(&t.payload, compiled);
        }
    }
    out
}

/// Enforces NOT NULL data columns on resolved segments.
///
/// Inside existing coverage a missing value is inherited from the nearest
/// resolved neighbour; a span extending beyond all coverage of an existing
/// entity follows the extension policy; a new entity must supply required
/// values itself.
fn enforce_required(
    batch: &EntityBatch,
    resolved: &mut [ResolvedSegment],
    compiled: &CompiledMerge,
) -> Vec<Feedback> {
    if compiled.required_columns.is_empty() {
        return Vec::new();
    }

    let mut failed_rows: BTreeSet<SourceRowId> = BTreeSet::new();
    let mut messages: Vec<(SourceRowId, String)> = Vec::new();
    let mut drop: Vec<usize> = Vec::new();

    for i in 0..resolved.len() {
        if resolved[i].payload.is_none() {
            continue;
        }
        let missing: Vec<String> = compiled
            .required_columns
            .iter()
            .filter(|c| {
                resolved[i]
                    .payload
                    .as_ref()
                    .and_then(|p| p.get(c.as_str()))
                    .is_none_or(serde_json::Value::is_null)
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            continue;
        }

        let inside_coverage = resolved[i].ancestor.is_some();
        let mut unresolved: Vec<String> = Vec::new();
        if inside_coverage {
            for column in &missing {
                match inherit_from_neighbour(resolved, i, column) {
                    Some(value) => {
                        if let Some(p) = resolved[i].payload.as_mut() {
                            p.insert(column.clone(), value);
                        }
                    }
                    None => unresolved.push(column.clone()),
                }
            }
        } else {
            unresolved = missing;
        }
        if unresolved.is_empty() {
            continue;
        }

        if !inside_coverage && !batch.is_new_entity {
            // Timeline extension that cannot satisfy required columns.
            match compiled.extension_policy {
                ExtensionPolicy::Drop => {
                    drop.push(i);
                    continue;
                }
                ExtensionPolicy::Error => {}
            }
        }
        for row_id in &resolved[i].sources {
            if failed_rows.insert(*row_id) {
                messages.push((
                    *row_id,
                    format!(
                        "required column(s) {} unresolved over {}",
                        unresolved.join(", "),
                        resolved[i].interval
                    ),
                ));
            }
        }
    }

    for i in drop {
        resolved[i].payload = None;
    }
    messages
        .into_iter()
        .map(|(row_id, message)| Feedback::error(row_id, message))
        .collect()
}

fn inherit_from_neighbour(
    resolved: &[ResolvedSegment],
    at: usize,
    column: &str,
) -> Option<serde_json::Value> {
    let value_at = |i: usize| {
        resolved[i]
            .payload
            .as_ref()
            .and_then(|p| p.get(column))
            .filter(|v| !v.is_null())
            .cloned()
    };
    for distance in 1..resolved.len() {
        // Earlier neighbours win ties.
        if let Some(v) = at.checked_sub(distance).and_then(value_at) {
            return Some(v);
        }
        if at + distance < resolved.len() {
            if let Some(v) = value_at(at + distance) {
                return Some(v);
            }
        }
    }
    None
}

fn data_projection(p: &Payload, compiled: &CompiledMerge) -> Payload {
    p.iter()
        .filter(|(k, _)| compiled.is_data_column(k) && !compiled.is_ephemeral(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn ephemeral_projection(p: &Payload, compiled: &CompiledMerge) -> Payload {
    p.iter()
        .filter(|(k, v)| compiled.is_ephemeral(k) && !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
