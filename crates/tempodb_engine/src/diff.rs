//! Diffing the coalesced future state against the target's current rows.
//!
//! Each future row tries to reuse one of the target rows it absorbs, so an
//! unchanged span costs nothing and a changed span becomes one update
//! instead of a delete plus insert. Target rows no future row reuses are
//! deleted.

use crate::cache::CompiledMerge;
use crate::coalesce::FinalSegment;
use crate::error::{EngineError, EngineResult};
use crate::identity::EntityBatch;
use crate::plan::{OpKind, PlanOp, UpdateEffect};
use crate::resolve::ResolvedSegment;
use std::collections::BTreeSet;
use tempodb_model::payload::{self, Payload};
use tempodb_model::TargetRowId;

/// Diffs one entity's future state against its current rows.
///
/// Emitted operations carry no sequence numbers yet; the sequencer assigns
/// those across entities.
pub(crate) fn diff(
    batch: &EntityBatch,
    finals: &[FinalSegment],
    resolved: &[ResolvedSegment],
    compiled: &CompiledMerge,
) -> EngineResult<Vec<PlanOp>> {
    let mut ops = Vec::new();
    let mut claimed: BTreeSet<TargetRowId> = BTreeSet::new();

    for seg in finals {
        let reuse = seg.ancestors.iter().find(|id| !claimed.contains(id)).copied();
        let write_payload = with_ephemeral(&seg.payload, &seg.ephemeral);

        match reuse {
            Some(row_id) => {
                claimed.insert(row_id);
                let target = batch
                    .targets
                    .iter()
                    .find(|t| t.row_id == row_id)
                    .ok_or_else(|| {
                        EngineError::corrupt_target(row_id, "ancestor row vanished during diff")
                    })?;
                let old = target
                    .interval()
                    .map_err(|e| EngineError::corrupt_target(row_id, e.to_string()))?;

                let unchanged = old == seg.interval
                    && payload::equal_ignoring(
                        &write_payload,
                        &target.payload,
                        &compiled.ephemeral_columns,
                    );
                if unchanged {
                    ops.push(PlanOp {
                        seq: 0,
                        statement: 0,
                        kind: OpKind::Keep,
                        effect: None,
                        entity: batch.entity.clone(),
                        is_new_entity: false,
                        identity: batch.identity.clone(),
                        target_row: Some(row_id),
                        old_interval: Some(old.clone()),
                        new_interval: Some(old),
                        payload: None,
                        relation: None,
                        sources: seg.sources.clone(),
                    });
                } else {
                    // A carve that shrinks this row is attributed to the
                    // carving rows even though no surviving span holds them.
                    let mut sources: BTreeSet<_> = seg.sources.iter().copied().collect();
                    sources.extend(carved_sources(resolved, row_id));
                    ops.push(PlanOp {
                        seq: 0,
                        statement: 0,
                        kind: OpKind::Update,
                        effect: Some(UpdateEffect::classify(&old, &seg.interval)),
                        entity: batch.entity.clone(),
                        is_new_entity: false,
                        identity: batch.identity.clone(),
                        target_row: Some(row_id),
                        old_interval: Some(old.clone()),
                        new_interval: Some(seg.interval.clone()),
                        payload: Some(write_payload),
                        relation: Some(old.relation(&seg.interval)),
                        sources: sources.into_iter().collect(),
                    });
                }
            }
            None => {
                ops.push(PlanOp {
                    seq: 0,
                    statement: 0,
                    kind: OpKind::Insert,
                    effect: None,
                    entity: batch.entity.clone(),
                    is_new_entity: batch.is_new_entity,
                    identity: batch.identity.clone(),
                    target_row: None,
                    old_interval: None,
                    new_interval: Some(seg.interval.clone()),
                    payload: Some(write_payload),
                    relation: None,
                    sources: seg.sources.clone(),
                });
            }
        }
    }

    // Target rows no future row reuses lose their coverage entirely.
    for target in &batch.targets {
        if claimed.contains(&target.row_id) {
            continue;
        }
        let old = target
            .interval()
            .map_err(|e| EngineError::corrupt_target(target.row_id, e.to_string()))?;
        ops.push(PlanOp {
            seq: 0,
            statement: 0,
            kind: OpKind::Delete,
            effect: None,
            entity: batch.entity.clone(),
            is_new_entity: false,
            identity: batch.identity.clone(),
            target_row: Some(target.row_id),
            old_interval: Some(old),
            new_interval: None,
            payload: None,
            relation: None,
            sources: deleting_sources(resolved, finals, target.row_id),
        });
    }

    Ok(ops)
}

/// Source rows responsible for removing a target row: those covering the
/// spans of the row that resolved to nothing, plus those of future rows
/// that absorbed the row's spans without reusing it.
fn deleting_sources(
    resolved: &[ResolvedSegment],
    finals: &[FinalSegment],
    row_id: TargetRowId,
) -> Vec<tempodb_model::SourceRowId> {
    let mut sources: BTreeSet<_> = carved_sources(resolved, row_id).into_iter().collect();
    for seg in finals {
        if seg.ancestors.contains(&row_id) {
            sources.extend(seg.sources.iter().copied());
        }
    }
    sources.into_iter().collect()
}

/// Source rows whose carve-outs nullified spans of the given target row.
fn carved_sources(
    resolved: &[ResolvedSegment],
    row_id: TargetRowId,
) -> Vec<tempodb_model::SourceRowId> {
    let mut sources = Vec::new();
    for seg in resolved {
        if seg.ancestor == Some(row_id) && seg.payload.is_none() {
            sources.extend(seg.sources.iter().copied());
        }
    }
    sources
}

fn with_ephemeral(data: &Payload, ephemeral: &Payload) -> Payload {
    let mut out = data.clone();
    payload::overlay_into(&mut out, ephemeral);
    out
}
