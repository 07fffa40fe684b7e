//! Plan sequencing: ordering operations so a target enforcing non-overlap
//! per statement never sees a transient conflict.
//!
//! Coverage is freed before it is claimed: deletes first, then shrinks,
//! then moves, then grows, then inserts. Moves both free and claim, so
//! each runs in its own statement, later spans first.

use crate::plan::{OpKind, PlanOp, UpdateEffect};
use tempodb_model::TimePoint;

/// Orders operations and assigns sequence numbers and statement batches.
///
/// Operations in one statement batch are mutually conflict-free and could
/// be applied as a single set-based statement.
pub(crate) fn sequence(mut ops: Vec<PlanOp>) -> Vec<PlanOp> {
    ops.sort_by(|a, b| {
        category(a)
            .cmp(&category(b))
            .then_with(|| a.entity.cmp(&b.entity))
            .then_with(|| tiebreak(a).cmp(&tiebreak(b)))
    });

    let mut statement: u32 = 0;
    let mut last_category: Option<u8> = None;
    for (i, op) in ops.iter_mut().enumerate() {
        let cat = category(op);
        let isolated = cat == MOVE;
        if isolated || last_category != Some(cat) {
            statement += 1;
            last_category = Some(cat);
        }
        op.seq = (i + 1) as u64;
        op.statement = statement;
    }
    ops
}

const MOVE: u8 = 2;

fn category(op: &PlanOp) -> u8 {
    match op.kind {
        OpKind::Delete => 0,
        OpKind::Update => match op.effect {
            Some(UpdateEffect::Move) => MOVE,
            Some(UpdateEffect::Grow) => 3,
            // Shrinks and payload-only updates never claim new coverage.
            _ => 1,
        },
        OpKind::Insert => 4,
        OpKind::Keep => 5,
    }
}

/// Within a category, moves run later-span-first so a move never collides
/// with the span another move is about to leave; everything else runs in
/// ascending time order.
fn tiebreak(op: &PlanOp) -> (std::cmp::Reverse<Option<TimePoint>>, Option<TimePoint>) {
    let old_from = op.old_interval.as_ref().map(|iv| iv.from().clone());
    let new_from = op.new_interval.as_ref().map(|iv| iv.from().clone());
    if category(op) == MOVE {
        (std::cmp::Reverse(old_from), new_from)
    } else {
        (
            std::cmp::Reverse(None),
            new_from.or(old_from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempodb_model::payload::Payload;
    use tempodb_model::{EntityKey, Interval, TargetRowId};

    fn iv(from: i64, until: i64) -> Interval {
        Interval::new(from.into(), until.into()).unwrap()
    }

    fn op(
        kind: OpKind,
        effect: Option<UpdateEffect>,
        entity: &str,
        old: Option<Interval>,
        new: Option<Interval>,
    ) -> PlanOp {
        PlanOp {
            seq: 0,
            statement: 0,
            kind,
            effect,
            entity: EntityKey::from_map(&json!({"id": entity}).as_object().unwrap().clone())
                .unwrap(),
            is_new_entity: false,
            identity: Payload::new(),
            target_row: old.as_ref().map(|_| TargetRowId::new(1)),
            old_interval: old,
            new_interval: new,
            payload: None,
            relation: None,
            sources: Vec::new(),
        }
    }

    #[test]
    fn category_order_frees_before_claiming() {
        let ops = sequence(vec![
            op(OpKind::Insert, None, "a", None, Some(iv(30, 40))),
            op(
                OpKind::Update,
                Some(UpdateEffect::Grow),
                "a",
                Some(iv(0, 5)),
                Some(iv(0, 10)),
            ),
            op(OpKind::Delete, None, "a", Some(iv(50, 60)), None),
            op(
                OpKind::Update,
                Some(UpdateEffect::Shrink),
                "a",
                Some(iv(10, 30)),
                Some(iv(10, 20)),
            ),
        ]);
        let kinds: Vec<_> = ops.iter().map(|o| (o.kind, o.effect)).collect();
        assert_eq!(
            kinds,
            vec![
                (OpKind::Delete, None),
                (OpKind::Update, Some(UpdateEffect::Shrink)),
                (OpKind::Update, Some(UpdateEffect::Grow)),
                (OpKind::Insert, None),
            ]
        );
        assert_eq!(ops.iter().map(|o| o.seq).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn moves_run_descending_and_isolated() {
        let ops = sequence(vec![
            op(
                OpKind::Update,
                Some(UpdateEffect::Move),
                "a",
                Some(iv(0, 10)),
                Some(iv(10, 20)),
            ),
            op(
                OpKind::Update,
                Some(UpdateEffect::Move),
                "a",
                Some(iv(10, 20)),
                Some(iv(20, 30)),
            ),
        ]);
        // The later span moves first, vacating room for the earlier one.
        assert_eq!(ops[0].old_interval.as_ref().unwrap().to_string(), "[10, 20)");
        assert_eq!(ops[1].old_interval.as_ref().unwrap().to_string(), "[0, 10)");
        assert_ne!(ops[0].statement, ops[1].statement);
    }

    #[test]
    fn same_category_shares_a_statement() {
        let ops = sequence(vec![
            op(OpKind::Delete, None, "a", Some(iv(0, 10)), None),
            op(OpKind::Delete, None, "b", Some(iv(0, 10)), None),
            op(OpKind::Insert, None, "a", None, Some(iv(20, 30))),
        ]);
        assert_eq!(ops[0].statement, ops[1].statement);
        assert_ne!(ops[1].statement, ops[2].statement);
    }

    #[test]
    fn keeps_order_last() {
        let ops = sequence(vec![
            op(OpKind::Keep, None, "a", Some(iv(0, 10)), Some(iv(0, 10))),
            op(OpKind::Insert, None, "a", None, Some(iv(20, 30))),
        ]);
        assert_eq!(ops[0].kind, OpKind::Insert);
        assert_eq!(ops[1].kind, OpKind::Keep);
    }
}
