//! Merge-engine invariants under randomized source batches.

use proptest::prelude::*;
use tempodb_engine::{merge, plan, MergeConfig};
use std::collections::BTreeMap;
use tempodb_model::payload;
use tempodb_model::{EntityKey, SourceRow, TargetRow, TimePoint};
use tempodb_store::TemporalTable;
use tempodb_testkit::prelude::*;

fn fresh_table() -> TemporalTable {
    TestTable::positions().table
}

fn by_entity(table: &TemporalTable) -> Vec<(EntityKey, Vec<TargetRow>)> {
    let mut keys: Vec<EntityKey> = table.rows().filter_map(|r| r.entity_key()).collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .map(|k| {
            let rows: Vec<TargetRow> =
                table.rows_for_entity(&k).into_iter().cloned().collect();
            (k, rows)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No merge outcome may leave two rows of one entity overlapping.
    #[test]
    fn merged_timelines_never_overlap(batch in batch_strategy(10)) {
        let mut table = fresh_table();
        let mut batch = batch;
        let config = MergeConfig::default().backfill_identities(true);
        merge(&mut table, &mut batch, &config).unwrap();

        for (key, rows) in by_entity(&table) {
            for pair in rows.windows(2) {
                let a = pair[0].interval().unwrap();
                let b = pair[1].interval().unwrap();
                prop_assert!(!a.overlaps(&b), "entity {key}: {a} overlaps {b}");
            }
        }
    }

    /// Re-merging the identical batch must change nothing.
    #[test]
    fn merge_is_idempotent(batch in batch_strategy(10)) {
        let mut table = fresh_table();
        let mut batch = batch;
        let config = MergeConfig::default().backfill_identities(true);
        merge(&mut table, &mut batch, &config).unwrap();
        let before: Vec<_> = table.rows().cloned().collect();

        let result = merge(&mut table, &mut batch, &config).unwrap();
        prop_assert!(result.plan.is_noop(), "second merge planned mutations");
        let after: Vec<_> = table.rows().cloned().collect();
        prop_assert_eq!(before, after);
    }

    /// A merged timeline is minimal: adjacent rows of one entity never
    /// carry equal content.
    #[test]
    fn merged_timelines_are_coalesced(batch in batch_strategy(10)) {
        let mut table = fresh_table();
        let mut batch = batch;
        let config = MergeConfig::default().backfill_identities(true);
        merge(&mut table, &mut batch, &config).unwrap();

        for (key, rows) in by_entity(&table) {
            for pair in rows.windows(2) {
                let a = pair[0].interval().unwrap();
                let b = pair[1].interval().unwrap();
                if a.meets(&b) {
                    prop_assert!(
                        !payload::equal_ignoring(&pair[0].payload, &pair[1].payload, &[]),
                        "entity {key}: adjacent equal rows {a} and {b}"
                    );
                }
            }
        }
    }

    /// Merging into an empty table covers exactly the union of each
    /// founding group's intervals, minus spans whose latest-submitted
    /// covering row is a delete marker.
    #[test]
    fn merged_coverage_matches_source_coverage(batch in batch_strategy(10)) {
        let mut table = fresh_table();
        let mut batch = batch;
        let config = MergeConfig::default().backfill_identities(true);
        let result = merge(&mut table, &mut batch, &config).unwrap();

        let mut groups: BTreeMap<&str, Vec<&SourceRow>> = BTreeMap::new();
        for row in &batch {
            if let Some(fid) = row.founding_id.as_deref() {
                groups.entry(fid).or_default().push(row);
            }
        }

        for (fid, rows) in groups {
            let merged: Vec<TargetRow> = result
                .generated
                .get(&EntityKey::founding(fid))
                .and_then(EntityKey::from_map)
                .map(|key| table.rows_for_entity(&key).into_iter().cloned().collect())
                .unwrap_or_default();

            // The generators draw integer boundaries below 52, so unit
            // spans on that axis check coverage exhaustively.
            for t in 0i64..52 {
                let point = TimePoint::from(t);
                let latest = rows
                    .iter()
                    .filter(|r| r.valid_from <= point && point < r.valid_until)
                    .max_by_key(|r| r.row_id);
                let expected = latest.is_some_and(|r| !r.delete_marker);
                let actual = merged
                    .iter()
                    .any(|r| r.interval().unwrap().contains(&point));
                prop_assert_eq!(expected, actual, "group {} at {}", fid, t);
            }
        }
    }

    /// Every source row gets exactly one feedback row, in row-id order.
    #[test]
    fn feedback_covers_the_whole_batch(batch in batch_strategy(10)) {
        let mut table = fresh_table();
        let mut batch = batch;
        let config = MergeConfig::default().backfill_identities(true);
        let result = merge(&mut table, &mut batch, &config).unwrap();

        prop_assert_eq!(result.feedback.len(), batch.len());
        for (row, fb) in batch.iter().zip(&result.feedback) {
            prop_assert_eq!(row.row_id, fb.source_row_id);
        }
    }

    /// Planning is pure: a plan-only call never mutates the table, and
    /// planning twice yields the same plan.
    #[test]
    fn planning_is_pure(batch in batch_strategy(10)) {
        let table = fresh_table();
        let config = MergeConfig::default();
        let first = plan(&table, &batch, &config).unwrap();
        let second = plan(&table, &batch, &config).unwrap();
        prop_assert!(table.is_empty());
        prop_assert_eq!(first, second);
    }
}
