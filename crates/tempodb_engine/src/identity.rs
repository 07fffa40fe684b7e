//! Identity resolution: matching source rows to entities.
//!
//! Each source row is resolved against the target in two steps: an
//! explicit surrogate identity must match an existing entity exactly, and
//! failing that the canonical natural-key projection is matched. Rows that
//! resolve to nothing either found a new entity (grouped by founding id or
//! natural key) or are rejected with attributable feedback. Intra-batch
//! duplicate coverage is settled here as well, before any timeline work.

use crate::cache::CompiledMerge;
use crate::config::EclipsePolicy;
use crate::error::{EngineError, EngineResult};
use crate::feedback::{Feedback, SkipReason};
use crate::mode::MergeMode;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tempodb_model::payload::Payload;
use tempodb_model::{EntityKey, SourceRow, TargetRow};

/// All rows belonging to one entity, source and target side.
#[derive(Debug, Clone)]
pub(crate) struct EntityBatch {
    /// Canonical key the entity is grouped by.
    pub entity: EntityKey,
    /// True when no target rows exist yet for this entity.
    pub is_new_entity: bool,
    /// True when the entity is represented in the source batch; stays true
    /// when its rows are later dropped as errors.
    pub in_batch: bool,
    /// Identity-column values (empty for new entities without caller ids).
    pub identity: Payload,
    /// Surviving source rows, ascending by row id.
    pub sources: Vec<SourceRow>,
    /// Target rows of the entity, ascending by `valid_from`.
    pub targets: Vec<TargetRow>,
}

/// Output of identity resolution.
#[derive(Debug, Clone)]
pub(crate) struct Resolution {
    /// Per-entity batches, in canonical entity order.
    pub batches: Vec<EntityBatch>,
    /// Early feedback for rejected or skipped rows.
    pub feedback: Vec<Feedback>,
}

/// Resolves the batch against the target's current history.
pub(crate) fn resolve(
    source_rows: &[SourceRow],
    targets: &[TargetRow],
    compiled: &CompiledMerge,
) -> EngineResult<Resolution> {
    // The target is trusted input; a malformed row there is fatal, not
    // attributable.
    for row in targets {
        row.interval()
            .map_err(|e| EngineError::corrupt_target(row.row_id, e.to_string()))?;
        if row.entity_key().is_none() {
            return Err(EngineError::corrupt_target(row.row_id, "row has no identity"));
        }
    }

    let by_identity = index_by_identity(targets);
    let by_natural_key = index_by_natural_key(targets, &compiled.natural_key_columns);

    let mut feedback = Vec::new();
    let mut groups: BTreeMap<EntityKey, EntityBatch> = BTreeMap::new();

    for row in source_rows {
        if let Err(e) = row.interval() {
            feedback.push(Feedback::error(row.row_id, e.to_string()));
            continue;
        }

        let matched = match match_row(row, &by_identity, &by_natural_key, compiled) {
            Ok(m) => m,
            Err(message) => {
                feedback.push(Feedback::error(row.row_id, message));
                continue;
            }
        };

        // Mode scoping: portion-of modes patch existing entities only;
        // INSERT_NEW_ENTITIES ignores rows that already resolved.
        match (&matched, compiled.mode) {
            (Match::New { .. }, mode) if mode.is_for_portion_of() => {
                feedback.push(Feedback::skipped(row.row_id, SkipReason::NoMatchingEntity));
                continue;
            }
            (Match::Existing { .. }, MergeMode::InsertNewEntities) => {
                feedback.push(Feedback::skipped(row.row_id, SkipReason::FilteredByMode));
                continue;
            }
            _ => {}
        }

        let (entity, is_new, identity) = match matched {
            Match::Existing { entity, identity } => (entity, false, identity),
            Match::New { entity, identity } => (entity, true, identity),
        };

        let batch = groups.entry(entity.clone()).or_insert_with(|| EntityBatch {
            entity,
            is_new_entity: is_new,
            in_batch: true,
            identity,
            sources: Vec::new(),
            targets: Vec::new(),
        });
        batch.sources.push(row.clone());
    }

    // Founding groups must agree on their natural keys: two rows founding
    // one entity with contradicting keys is a group-level error.
    reject_conflicting_founding_groups(&mut groups, &mut feedback, compiled);

    // Attach target rows to their batches.
    let mut claimed: BTreeSet<EntityKey> = BTreeSet::new();
    for row in targets {
        let key = row.entity_key().unwrap_or_else(|| EntityKey::founding(""));
        if let Some(batch) = groups.get_mut(&key) {
            batch.targets.push(row.clone());
            claimed.insert(key);
        } else if compiled.delete_mode.deletes_entities()
            && compiled.mode.is_entity_scope()
            && compiled.mode != MergeMode::InsertNewEntities
        {
            // Entities missing from the batch become source-less batches so
            // the planner can delete their timeline.
            let batch = groups.entry(key.clone()).or_insert_with(|| EntityBatch {
                entity: key,
                is_new_entity: false,
                in_batch: false,
                identity: row.identity.clone(),
                sources: Vec::new(),
                targets: Vec::new(),
            });
            batch.targets.push(row.clone());
        }
    }

    let mut batches: Vec<EntityBatch> = groups.into_values().collect();
    for batch in &mut batches {
        batch.sources.sort_by_key(|r| r.row_id);
        batch.targets.sort_by(|a, b| a.valid_from.cmp(&b.valid_from));
        detect_eclipsed(batch, compiled.eclipse_policy, &mut feedback);
    }
    batches.retain(|b| !b.sources.is_empty() || !b.targets.is_empty());

    tracing::debug!(
        entities = batches.len(),
        rejected = feedback.len(),
        "identity resolution complete"
    );
    Ok(Resolution { batches, feedback })
}

enum Match {
    Existing { entity: EntityKey, identity: Payload },
    New { entity: EntityKey, identity: Payload },
}

fn match_row(
    row: &SourceRow,
    by_identity: &HashMap<EntityKey, Payload>,
    by_natural_key: &HashMap<EntityKey, BTreeSet<EntityKey>>,
    compiled: &CompiledMerge,
) -> Result<Match, String> {
    if let Some(key) = EntityKey::from_map(&row.identity) {
        if let Some(identity) = by_identity.get(&key) {
            return Ok(Match::Existing {
                entity: key,
                identity: identity.clone(),
            });
        }
        if compiled.mode == MergeMode::InsertNewEntities {
            // Caller-assigned surrogate seeding a brand-new entity.
            return Ok(Match::New {
                entity: key,
                identity: row.identity.clone(),
            });
        }
        return Err(format!(
            "source row {} references nonexistent entity {key}",
            row.row_id
        ));
    }

    if let Some(nk) = EntityKey::from_map(&row.natural_keys) {
        if let Some(entities) = by_natural_key.get(&nk) {
            match entities.len() {
                0 => {}
                1 => {
                    let entity = entities.iter().next().cloned().unwrap_or(nk);
                    let identity = by_identity.get(&entity).cloned().unwrap_or_default();
                    return Ok(Match::Existing { entity, identity });
                }
                n => {
                    return Err(format!(
                        "ambiguous natural key on source row {}: {n} distinct target entities match",
                        row.row_id
                    ));
                }
            }
        }
        // Unmatched natural key founds a new entity, grouped so that rows
        // sharing the key (or a founding id) found it together.
        let entity = match &row.founding_id {
            Some(fid) => EntityKey::founding(fid),
            None => nk,
        };
        return Ok(Match::New {
            entity,
            identity: row.identity.clone(),
        });
    }

    if let Some(fid) = &row.founding_id {
        return Ok(Match::New {
            entity: EntityKey::founding(fid),
            identity: row.identity.clone(),
        });
    }

    Err(format!(
        "source row {} is not identifiable: no identity, natural key or founding id",
        row.row_id
    ))
}

fn index_by_identity(targets: &[TargetRow]) -> HashMap<EntityKey, Payload> {
    let mut index = HashMap::new();
    for row in targets {
        if let Some(key) = row.entity_key() {
            index.entry(key).or_insert_with(|| row.identity.clone());
        }
    }
    index
}

fn index_by_natural_key(
    targets: &[TargetRow],
    columns: &[String],
) -> HashMap<EntityKey, BTreeSet<EntityKey>> {
    let mut index: HashMap<EntityKey, BTreeSet<EntityKey>> = HashMap::new();
    if columns.is_empty() {
        return index;
    }
    for row in targets {
        let projection = row.natural_key_projection(columns);
        if let (Some(nk), Some(id)) = (EntityKey::from_map(&projection), row.entity_key()) {
            index.entry(nk).or_default().insert(id);
        }
    }
    index
}

fn reject_conflicting_founding_groups(
    groups: &mut BTreeMap<EntityKey, EntityBatch>,
    feedback: &mut Vec<Feedback>,
    compiled: &CompiledMerge,
) {
    let mut conflicted: Vec<EntityKey> = Vec::new();
    for (key, batch) in groups.iter() {
        if !batch.is_new_entity {
            continue;
        }
        let mut agreed: Option<Payload> = None;
        for row in &batch.sources {
            let nk: Payload = compiled
                .natural_key_columns
                .iter()
                .filter_map(|c| {
                    row.natural_keys
                        .get(c)
                        .filter(|v| !v.is_null())
                        .map(|v| (c.clone(), v.clone()))
                })
                .collect();
            if nk.is_empty() {
                continue;
            }
            match &agreed {
                None => agreed = Some(nk),
                Some(existing) if *existing == nk => {}
                Some(_) => {
                    conflicted.push(key.clone());
                    break;
                }
            }
        }
    }
    for key in conflicted {
        if let Some(batch) = groups.remove(&key) {
            for row in batch.sources {
                feedback.push(Feedback::error(
                    row.row_id,
                    "conflicting natural-key values within one founding group",
                ));
            }
        }
    }
}

/// Marks rows whose interval is fully covered by a later-submitted row of
/// the same entity. Later rows win under `LatestWins`; under `Error` the
/// eclipsed row is rejected instead of skipped.
fn detect_eclipsed(batch: &mut EntityBatch, policy: EclipsePolicy, feedback: &mut Vec<Feedback>) {
    // Source intervals were validated during matching.
    let Ok(intervals) = batch
        .sources
        .iter()
        .map(|r| r.interval())
        .collect::<Result<Vec<_>, _>>()
    else {
        return;
    };

    let mut eclipsed = vec![false; batch.sources.len()];
    for i in 0..batch.sources.len() {
        for j in 0..batch.sources.len() {
            if i == j || eclipsed[j] {
                continue;
            }
            if batch.sources[j].row_id > batch.sources[i].row_id
                && intervals[j].covers(&intervals[i])
            {
                eclipsed[i] = true;
                break;
            }
        }
    }

    let mut kept = Vec::with_capacity(batch.sources.len());
    for (row, is_eclipsed) in batch.sources.drain(..).zip(eclipsed) {
        if is_eclipsed {
            match policy {
                EclipsePolicy::LatestWins => {
                    feedback.push(Feedback::skipped(row.row_id, SkipReason::Eclipsed));
                }
                EclipsePolicy::Error => {
                    feedback.push(Feedback::error(
                        row.row_id,
                        "interval duplicated by a later-submitted source row",
                    ));
                }
            }
        } else {
            kept.push(row);
        }
    }
    batch.sources = kept;
}
