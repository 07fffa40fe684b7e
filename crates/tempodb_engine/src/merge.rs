//! The merge façade: planning and executing a source batch.
//!
//! Planning is pure: it reads the table and produces an ordered
//! [`MergePlan`] plus early feedback. Executing applies the plan in one
//! transaction and attributes every source row's outcome. When rows fail
//! during payload resolution, the affected entity is re-planned without
//! them so one bad row never poisons its neighbours.

use crate::cache::{CompiledMerge, PlannerCache};
use crate::coalesce;
use crate::config::MergeConfig;
use crate::diff;
use crate::error::EngineResult;
use crate::executor;
use crate::feedback::{self, Feedback};
use crate::identity;
use crate::plan::{MergePlan, PlanOp};
use crate::resolve;
use crate::sequence;
use crate::timeline;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tempodb_model::payload::Payload;
use tempodb_model::{EntityKey, SourceRow, TargetRow};
use tempodb_store::TemporalTable;

/// Outcome of an executed merge call.
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// The plan that was executed.
    pub plan: MergePlan,
    /// One feedback row per source row, ascending by row id.
    pub feedback: Vec<Feedback>,
    /// Surrogate identities minted for new entities.
    pub generated: BTreeMap<EntityKey, Payload>,
}

/// Computes the merge plan for a source batch without touching the table.
pub fn plan(
    table: &TemporalTable,
    source_rows: &[SourceRow],
    config: &MergeConfig,
) -> EngineResult<MergePlan> {
    let (plan, _) = plan_compiled(table, source_rows, config)?;
    Ok(plan)
}

/// Plans and executes a source batch in one call.
///
/// With [`MergeConfig::backfill_identities`] set, minted identities are
/// written back into the batch's founding rows.
pub fn merge(
    table: &mut TemporalTable,
    source_rows: &mut [SourceRow],
    config: &MergeConfig,
) -> EngineResult<MergeResult> {
    let (plan, compiled) = plan_compiled(table, source_rows, config)?;
    let generated = executor::execute(table, &plan, &compiled)?;
    let feedback = feedback::attribute(&plan, &generated, source_rows);
    if config.backfill_identities {
        feedback::backfill_identities(source_rows, &feedback);
    }
    Ok(MergeResult {
        plan,
        feedback,
        generated,
    })
}

fn plan_compiled(
    table: &TemporalTable,
    source_rows: &[SourceRow],
    config: &MergeConfig,
) -> EngineResult<(MergePlan, Arc<CompiledMerge>)> {
    let source_columns = source_columns(source_rows);
    let compiled = PlannerCache::global().compiled(table.schema(), &source_columns, config)?;
    let targets: Vec<TargetRow> = table.rows().cloned().collect();

    let resolution = identity::resolve(source_rows, &targets, &compiled)?;
    let mut early_feedback = resolution.feedback;
    let mut ops: Vec<PlanOp> = Vec::new();

    for batch in resolution.batches {
        let mut batch = batch;
        loop {
            let segments = timeline::segment(&batch)?;
            let out = resolve::resolve_payloads(&batch, &segments, &compiled);
            if out.failed.is_empty() {
                let finals = coalesce::coalesce(&out.segments)?;
                ops.extend(diff::diff(&batch, &finals, &out.segments, &compiled)?);
                break;
            }
            // Drop the failed rows and re-plan the entity so surviving
            // rows resolve as if the failed ones were never submitted.
            let failed_ids: BTreeSet<_> = out.failed.iter().map(|f| f.source_row_id).collect();
            early_feedback.extend(out.failed);
            batch.sources.retain(|r| !failed_ids.contains(&r.row_id));
            if batch.sources.is_empty() && batch.targets.is_empty() {
                break;
            }
        }
    }

    let ops = sequence::sequence(ops);
    early_feedback.sort_by_key(|f| f.source_row_id);
    let plan = MergePlan {
        ops,
        early_feedback,
    };
    tracing::debug!(summary = %plan.summary(), "planned merge batch");
    Ok((plan, compiled))
}

/// The sorted union of payload columns present in the batch, which is part
/// of the planner-cache key: REPLACE semantics depend on which columns the
/// source omitted entirely.
fn source_columns(source_rows: &[SourceRow]) -> Vec<String> {
    let mut columns: BTreeSet<&str> = BTreeSet::new();
    for row in source_rows {
        columns.extend(row.payload.keys().map(String::as_str));
    }
    columns.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackStatus;
    use crate::mode::MergeMode;
    use serde_json::json;
    use tempodb_model::{SourceRowId, TableSchema};

    fn schema() -> TableSchema {
        TableSchema::new("t", vec!["v".to_string()]).identity_columns(vec!["id".to_string()])
    }

    fn map(v: serde_json::Value) -> Payload {
        v.as_object().unwrap().clone()
    }

    fn source(row_id: u64, from: i64, until: i64, v: &str) -> SourceRow {
        SourceRow::new(
            SourceRowId::new(row_id),
            from.into(),
            until.into(),
            map(json!({"v": v})),
        )
    }

    #[test]
    fn merge_inserts_and_reports() {
        let mut table = TemporalTable::new(schema()).unwrap();
        let mut rows = vec![source(1, 0, 10, "X").founding_id("g1")];
        let result = merge(&mut table, &mut rows, &MergeConfig::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(result.feedback.len(), 1);
        assert_eq!(result.feedback[0].status, FeedbackStatus::Inserted);
        assert!(result.feedback[0].generated_identity.is_some());
    }

    #[test]
    fn merge_is_idempotent() {
        let mut table = TemporalTable::new(schema()).unwrap();
        let config = MergeConfig::default().backfill_identities(true);
        let mut rows = vec![source(1, 0, 10, "X").founding_id("g1")];
        merge(&mut table, &mut rows, &config).unwrap();

        // The backfilled identity lets the same batch match the entity.
        let result = merge(&mut table, &mut rows, &config).unwrap();
        assert!(result.plan.is_noop());
        assert_eq!(result.feedback[0].status, FeedbackStatus::Unchanged);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn plan_does_not_mutate() {
        let table = TemporalTable::new(schema()).unwrap();
        let rows = vec![source(1, 0, 10, "X").founding_id("g1")];
        let p = plan(&table, &rows, &MergeConfig::default()).unwrap();
        assert_eq!(p.ops.len(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn failed_row_does_not_poison_entity() {
        let schema = TableSchema::new("t", vec!["v".to_string(), "unit".to_string()])
            .identity_columns(vec!["id".to_string()])
            .required_columns(vec!["unit".to_string()]);
        let mut table = TemporalTable::new(schema).unwrap();
        let mut seed = vec![SourceRow::new(
            SourceRowId::new(1),
            0.into(),
            10.into(),
            map(json!({"v": "X", "unit": "m"})),
        )
        .founding_id("g1")];
        let config = MergeConfig::default().backfill_identities(true);
        merge(&mut table, &mut seed, &config).unwrap();
        let identity = seed[0].identity.clone();

        // Row 2 extends beyond coverage without "unit" under the error
        // policy; row 3 is a fine in-coverage update.
        let mut rows = vec![
            SourceRow::new(
                SourceRowId::new(2),
                20.into(),
                30.into(),
                map(json!({"v": "Y"})),
            )
            .identity(identity.clone()),
            SourceRow::new(
                SourceRowId::new(3),
                0.into(),
                10.into(),
                map(json!({"v": "Z", "unit": "m"})),
            )
            .identity(identity),
        ];
        let config = MergeConfig::default()
            .extension_policy(crate::config::ExtensionPolicy::Error);
        let result = merge(&mut table, &mut rows, &config).unwrap();
        assert_eq!(result.feedback[0].status, FeedbackStatus::Error);
        assert_eq!(result.feedback[1].status, FeedbackStatus::Updated);
        let rows_now: Vec<_> = table.rows().collect();
        assert_eq!(rows_now.len(), 1);
        assert_eq!(rows_now[0].payload.get("v"), Some(&json!("Z")));
    }

    #[test]
    fn errored_batch_row_does_not_delete_its_entity() {
        let schema = TableSchema::new("t", vec!["v".to_string(), "unit".to_string()])
            .identity_columns(vec!["id".to_string()])
            .required_columns(vec!["unit".to_string()]);
        let mut table = TemporalTable::new(schema).unwrap();
        let config = MergeConfig::default().backfill_identities(true);
        let mut seed = vec![
            SourceRow::new(
                SourceRowId::new(1),
                0.into(),
                10.into(),
                map(json!({"v": "A", "unit": "m"})),
            )
            .founding_id("a"),
            SourceRow::new(
                SourceRowId::new(2),
                0.into(),
                10.into(),
                map(json!({"v": "B", "unit": "m"})),
            )
            .founding_id("b"),
        ];
        merge(&mut table, &mut seed, &config).unwrap();
        assert_eq!(table.len(), 2);

        // Entity A is present in the batch but its only row fails payload
        // resolution; entity B is genuinely absent. Only B may be deleted.
        let mut rows = vec![SourceRow::new(
            SourceRowId::new(3),
            20.into(),
            30.into(),
            map(json!({"v": "A2"})),
        )
        .identity(seed[0].identity.clone())];
        let config = MergeConfig::default()
            .delete_mode(crate::mode::DeleteMode::DeleteMissingEntities)
            .extension_policy(crate::config::ExtensionPolicy::Error);
        let result = merge(&mut table, &mut rows, &config).unwrap();

        assert_eq!(result.feedback[0].status, FeedbackStatus::Error);
        let rows_now: Vec<_> = table.rows().collect();
        assert_eq!(rows_now.len(), 1);
        assert_eq!(rows_now[0].payload.get("v"), Some(&json!("A")));
    }

    #[test]
    fn delete_for_portion_of_round_trip() {
        let mut table = TemporalTable::new(schema()).unwrap();
        let mut seed = vec![source(1, 0, 30, "X").founding_id("g1")];
        let config = MergeConfig::default().backfill_identities(true);
        merge(&mut table, &mut seed, &config).unwrap();
        let identity = seed[0].identity.clone();

        let mut carve = vec![SourceRow::new(
            SourceRowId::new(2),
            10.into(),
            20.into(),
            Payload::new(),
        )
        .identity(identity)];
        let result = merge(
            &mut table,
            &mut carve,
            &MergeConfig::new(MergeMode::DeleteForPortionOf),
        )
        .unwrap();
        assert_eq!(result.feedback[0].status, FeedbackStatus::Updated);
        let spans: Vec<String> = table
            .rows()
            .map(|r| r.interval().unwrap().to_string())
            .collect();
        assert_eq!(spans, vec!["[0, 10)".to_string(), "[20, 30)".to_string()]);
    }
}
