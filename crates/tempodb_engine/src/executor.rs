//! Plan execution against a temporal table.
//!
//! The plan is first lowered into concrete store instructions (minting
//! surrogate identities for new entities along the way), then applied in
//! plan order inside one transaction. Any store-level constraint failure
//! rolls the whole call back.

use crate::cache::CompiledMerge;
use crate::error::{EngineError, EngineResult};
use crate::plan::{MergePlan, OpKind, PlanOp};
use std::collections::BTreeMap;
use tempodb_model::payload::Payload;
use tempodb_model::row::generate_surrogate;
use tempodb_model::{EntityKey, Interval, TargetRowId};
use tempodb_store::TemporalTable;

enum Instr {
    Delete(TargetRowId),
    Update(TargetRowId, Interval, Payload),
    Insert(Payload, Interval, Payload),
}

/// Applies an ordered plan to the table in one transaction.
///
/// Returns the surrogate identities minted for new entities, keyed by the
/// entity key the planner grouped them under.
pub(crate) fn execute(
    table: &mut TemporalTable,
    plan: &MergePlan,
    compiled: &CompiledMerge,
) -> EngineResult<BTreeMap<EntityKey, Payload>> {
    let mut generated: BTreeMap<EntityKey, Payload> = BTreeMap::new();
    let mut minted: BTreeMap<EntityKey, Payload> = BTreeMap::new();
    let mut instructions = Vec::with_capacity(plan.ops.len());

    for op in &plan.ops {
        match op.kind {
            OpKind::Keep => continue,
            OpKind::Delete => {
                instructions.push(Instr::Delete(target_of(op)?));
            }
            OpKind::Update => {
                let interval = op.new_interval.clone().ok_or_else(|| {
                    EngineError::invalid_plan(format!("update {} has no new interval", op.seq))
                })?;
                let payload = op.payload.clone().ok_or_else(|| {
                    EngineError::invalid_plan(format!("update {} has no payload", op.seq))
                })?;
                instructions.push(Instr::Update(target_of(op)?, interval, payload));
            }
            OpKind::Insert => {
                let interval = op.new_interval.clone().ok_or_else(|| {
                    EngineError::invalid_plan(format!("insert {} has no interval", op.seq))
                })?;
                let payload = op.payload.clone().ok_or_else(|| {
                    EngineError::invalid_plan(format!("insert {} has no payload", op.seq))
                })?;
                let identity =
                    identity_for(op, compiled, &payload, &mut minted, &mut generated);
                instructions.push(Instr::Insert(identity, interval, payload));
            }
        }
    }

    let summary = plan.summary();
    table.transaction(|txn| {
        for instr in &instructions {
            match instr {
                Instr::Delete(row_id) => {
                    txn.delete(*row_id)?;
                }
                Instr::Update(row_id, interval, payload) => {
                    txn.update(
                        *row_id,
                        interval.from().clone(),
                        interval.until().clone(),
                        payload.clone(),
                    )?;
                }
                Instr::Insert(identity, interval, payload) => {
                    txn.insert(
                        identity.clone(),
                        interval.from().clone(),
                        interval.until().clone(),
                        payload.clone(),
                    )?;
                }
            }
        }
        Ok(())
    })?;

    tracing::info!(%summary, entities_minted = generated.len(), "plan executed");
    Ok(generated)
}

fn target_of(op: &PlanOp) -> EngineResult<TargetRowId> {
    op.target_row.ok_or_else(|| {
        EngineError::invalid_plan(format!("operation {} has no target row", op.seq))
    })
}

/// The identity map an insert writes.
///
/// Existing entities keep their identity. New entities get a freshly
/// minted surrogate for every identity column the caller left blank, one
/// minting per entity so a founding group shares its identity; schemas
/// without surrogate columns fall back to the natural keys in the payload.
fn identity_for(
    op: &PlanOp,
    compiled: &CompiledMerge,
    payload: &Payload,
    minted: &mut BTreeMap<EntityKey, Payload>,
    generated: &mut BTreeMap<EntityKey, Payload>,
) -> Payload {
    if !op.is_new_entity {
        return op.identity.clone();
    }
    if let Some(existing) = minted.get(&op.entity) {
        return existing.clone();
    }

    let mut identity = op.identity.clone();
    let mut minted_any = false;
    for column in &compiled.identity_columns {
        let blank = identity.get(column).is_none_or(serde_json::Value::is_null);
        if blank {
            identity.insert(column.clone(), generate_surrogate());
            minted_any = true;
        }
    }
    if compiled.identity_columns.is_empty() {
        for column in &compiled.natural_key_columns {
            if let Some(v) = payload.get(column).filter(|v| !v.is_null()) {
                identity.insert(column.clone(), v.clone());
            }
        }
    }

    if minted_any {
        generated.insert(op.entity.clone(), identity.clone());
    }
    minted.insert(op.entity.clone(), identity.clone());
    identity
}
