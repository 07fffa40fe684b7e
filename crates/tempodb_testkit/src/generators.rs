//! Property-based test generators using proptest.
//!
//! Strategies produce source batches that satisfy the input invariants
//! (non-empty half-open intervals, sequential row ids) while exercising
//! overlap, adjacency, founding groups and delete markers.

use proptest::prelude::*;
use serde_json::Value;
use tempodb_model::payload::Payload;
use tempodb_model::{Interval, SourceRow, SourceRowId, TimePoint};

/// Strategy for a finite integer time point on a small axis, so that
/// generated intervals frequently touch and overlap.
pub fn time_point_strategy() -> impl Strategy<Value = TimePoint> {
    (0i64..40).prop_map(TimePoint::from)
}

/// Strategy for a valid half-open interval on the small axis.
pub fn interval_strategy() -> impl Strategy<Value = Interval> {
    (0i64..40, 1i64..12).prop_map(|(from, len)| {
        Interval::new(from.into(), (from + len).into()).expect("non-empty by construction")
    })
}

/// Strategy for a payload over a fixed small column set.
pub fn payload_strategy() -> impl Strategy<Value = Payload> {
    (
        prop::option::of(0i64..5),
        prop::option::of(prop::sample::select(vec!["A", "B", "C"])),
    )
        .prop_map(|(rate, title)| {
            let mut p = Payload::new();
            if let Some(rate) = rate {
                p.insert("rate".to_string(), Value::from(rate));
            }
            if let Some(title) = title {
                p.insert("title".to_string(), Value::from(title));
            }
            // At least one column, so the row carries data.
            if p.is_empty() {
                p.insert("title".to_string(), Value::from("A"));
            }
            p
        })
}

/// Strategy for one source row founding (or extending) one of a handful of
/// entities, identified by founding correlation id.
pub fn source_row_strategy(row_id: u64) -> impl Strategy<Value = SourceRow> {
    (
        interval_strategy(),
        payload_strategy(),
        0u8..4,
        prop::bool::weighted(0.1),
    )
        .prop_map(move |(interval, payload, group, delete)| {
            let row = SourceRow::new(
                SourceRowId::new(row_id),
                interval.from().clone(),
                interval.until().clone(),
                payload,
            )
            .founding_id(format!("g{group}"));
            if delete {
                row.delete_marker()
            } else {
                row
            }
        })
}

/// Strategy for a batch of up to `max_len` source rows with ascending ids.
pub fn batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<SourceRow>> {
    prop::collection::vec(prop::num::u8::ANY, 1..=max_len).prop_flat_map(|seed| {
        let strategies: Vec<_> = (0..seed.len())
            .map(|i| source_row_strategy(i as u64 + 1))
            .collect();
        strategies
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_intervals_are_valid(interval in interval_strategy()) {
            prop_assert!(interval.from() < interval.until());
        }

        #[test]
        fn generated_rows_have_valid_intervals(row in source_row_strategy(1)) {
            prop_assert!(row.interval().is_ok());
            prop_assert!(row.founding_id.is_some());
        }

        #[test]
        fn batches_have_ascending_ids(batch in batch_strategy(8)) {
            for pair in batch.windows(2) {
                prop_assert!(pair[0].row_id < pair[1].row_id);
            }
        }
    }
}
