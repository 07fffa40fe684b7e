//! Timeline unification: splitting an entity's history into atomic segments.
//!
//! Every interval boundary of the entity's source and target rows becomes a
//! cut point; consecutive cut points delimit atomic segments, the smallest
//! spans over which the set of contributing rows is constant. All later
//! stages reason about these segments only.

use crate::error::{EngineError, EngineResult};
use crate::identity::EntityBatch;
use std::collections::BTreeSet;
use tempodb_model::{Interval, TimePoint};

/// One atomic segment and the rows covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AtomicSegment {
    /// The segment span.
    pub interval: Interval,
    /// Indices into the batch's source rows covering this segment.
    pub source_idx: Vec<usize>,
    /// Index into the batch's target rows covering this segment. At most
    /// one, since the target timeline is overlap-free.
    pub target_idx: Option<usize>,
}

/// Splits the batch's combined timeline into atomic segments, ascending.
///
/// Segments covered by no row at all (gaps between cut points) are not
/// emitted.
pub(crate) fn segment(batch: &EntityBatch) -> EngineResult<Vec<AtomicSegment>> {
    let source_intervals = batch
        .sources
        .iter()
        .map(|r| r.interval())
        .collect::<Result<Vec<_>, _>>()?;
    let target_intervals = batch
        .targets
        .iter()
        .map(|r| {
            r.interval()
                .map_err(|e| EngineError::corrupt_target(r.row_id, e.to_string()))
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let mut boundaries: BTreeSet<TimePoint> = BTreeSet::new();
    for iv in source_intervals.iter().chain(target_intervals.iter()) {
        boundaries.insert(iv.from().clone());
        boundaries.insert(iv.until().clone());
    }

    let points: Vec<TimePoint> = boundaries.into_iter().collect();
    let mut segments = Vec::new();
    for pair in points.windows(2) {
        let interval = Interval::new(pair[0].clone(), pair[1].clone())?;

        let source_idx: Vec<usize> = source_intervals
            .iter()
            .enumerate()
            .filter(|(_, iv)| iv.covers(&interval))
            .map(|(i, _)| i)
            .collect();

        let mut target_idx = None;
        for (i, iv) in target_intervals.iter().enumerate() {
            if iv.covers(&interval) {
                if let Some(first) = target_idx {
                    let first_row: usize = first;
                    return Err(EngineError::corrupt_target(
                        batch.targets[i].row_id,
                        format!(
                            "overlaps row {} of the same entity",
                            batch.targets[first_row].row_id
                        ),
                    ));
                }
                target_idx = Some(i);
            }
        }

        if source_idx.is_empty() && target_idx.is_none() {
            continue;
        }
        segments.push(AtomicSegment {
            interval,
            source_idx,
            target_idx,
        });
    }
    Ok(segments)
}
