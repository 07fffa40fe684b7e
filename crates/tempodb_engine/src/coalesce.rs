//! Coalescing: merging adjacent segments with equal content.
//!
//! Adjacent resolved segments whose payloads hash equal collapse into one
//! row, so the future state is minimal. Ephemeral columns do not take part
//! in the equality; a coalesced row carries the ephemeral values of its
//! latest source-backed constituent.

use crate::error::EngineResult;
use crate::resolve::ResolvedSegment;
use tempodb_model::payload::Payload;
use tempodb_model::{Interval, SourceRowId, TargetRowId};

/// One row of the entity's future state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FinalSegment {
    /// The row's interval after coalescing.
    pub interval: Interval,
    /// Data-column payload.
    pub payload: Payload,
    /// Ephemeral-column values to write alongside.
    pub ephemeral: Payload,
    /// Content hash of the payload.
    pub hash: u64,
    /// Source rows that contributed, ascending by row id.
    pub sources: Vec<SourceRowId>,
    /// Target rows whose spans this row absorbs, in time order.
    pub ancestors: Vec<TargetRowId>,
    /// True if any constituent segment was source-backed.
    pub has_source: bool,
}

/// Coalesces resolved segments into the minimal future state.
///
/// Segments resolved to "no row" are dropped; the remainder merge when
/// they meet end-to-start and hash equal.
pub(crate) fn coalesce(segments: &[ResolvedSegment]) -> EngineResult<Vec<FinalSegment>> {
    let mut out: Vec<FinalSegment> = Vec::new();

    for seg in segments {
        let Some(data) = &seg.payload else { continue };

        if let Some(prev) = out.last_mut() {
            if prev.interval.until() == seg.interval.from() && prev.hash == seg.hash {
                prev.interval = Interval::new(
                    prev.interval.from().clone(),
                    seg.interval.until().clone(),
                )?;
                if seg.has_source && !seg.ephemeral.is_empty() {
                    prev.ephemeral = seg.ephemeral.clone();
                } else if prev.ephemeral.is_empty() {
                    prev.ephemeral = seg.ephemeral.clone();
                }
                for id in &seg.sources {
                    if !prev.sources.contains(id) {
                        prev.sources.push(*id);
                    }
                }
                if let Some(ancestor) = seg.ancestor {
                    if !prev.ancestors.contains(&ancestor) {
                        prev.ancestors.push(ancestor);
                    }
                }
                prev.has_source |= seg.has_source;
                continue;
            }
        }

        out.push(FinalSegment {
            interval: seg.interval.clone(),
            payload: data.clone(),
            ephemeral: seg.ephemeral.clone(),
            hash: seg.hash,
            sources: seg.sources.clone(),
            ancestors: seg.ancestor.into_iter().collect(),
            has_source: seg.has_source,
        });
    }

    for seg in &mut out {
        seg.sources.sort_unstable();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seg(
        from: i64,
        until: i64,
        payload: Option<serde_json::Value>,
        ancestor: Option<u64>,
        has_source: bool,
    ) -> ResolvedSegment {
        let payload: Option<Payload> = payload.map(|v| v.as_object().unwrap().clone());
        let hash = payload
            .as_ref()
            .map(|p| tempodb_model::payload::content_hash(p, &[]))
            .unwrap_or_default();
        ResolvedSegment {
            interval: Interval::new(from.into(), until.into()).unwrap(),
            payload,
            ephemeral: Payload::new(),
            has_source,
            sources: if has_source {
                vec![SourceRowId::new(1)]
            } else {
                Vec::new()
            },
            ancestor: ancestor.map(TargetRowId::new),
            hash,
        }
    }

    #[test]
    fn equal_adjacent_segments_merge() {
        let segments = vec![
            seg(0, 10, Some(json!({"v": "X"})), Some(1), false),
            seg(10, 20, Some(json!({"v": "X"})), Some(2), true),
        ];
        let out = coalesce(&segments).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].interval.to_string(), "[0, 20)");
        assert_eq!(
            out[0].ancestors,
            vec![TargetRowId::new(1), TargetRowId::new(2)]
        );
        assert!(out[0].has_source);
    }

    #[test]
    fn different_content_does_not_merge() {
        let segments = vec![
            seg(0, 10, Some(json!({"v": "X"})), None, true),
            seg(10, 20, Some(json!({"v": "Y"})), None, true),
        ];
        assert_eq!(coalesce(&segments).unwrap().len(), 2);
    }

    #[test]
    fn gap_blocks_merging() {
        let segments = vec![
            seg(0, 10, Some(json!({"v": "X"})), None, true),
            seg(15, 20, Some(json!({"v": "X"})), None, true),
        ];
        assert_eq!(coalesce(&segments).unwrap().len(), 2);
    }

    #[test]
    fn deleted_span_blocks_merging() {
        let segments = vec![
            seg(0, 10, Some(json!({"v": "X"})), Some(1), false),
            seg(10, 15, None, Some(1), true),
            seg(15, 20, Some(json!({"v": "X"})), Some(1), false),
        ];
        let out = coalesce(&segments).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].interval.to_string(), "[0, 10)");
        assert_eq!(out[1].interval.to_string(), "[15, 20)");
    }

    #[test]
    fn source_backed_ephemeral_wins() {
        let mut a = seg(0, 10, Some(json!({"v": "X"})), Some(1), false);
        a.ephemeral = json!({"edited_at": "old"}).as_object().unwrap().clone();
        let mut b = seg(10, 20, Some(json!({"v": "X"})), None, true);
        b.ephemeral = json!({"edited_at": "new"}).as_object().unwrap().clone();
        let out = coalesce(&[a, b]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ephemeral.get("edited_at"), Some(&json!("new")));
    }
}
