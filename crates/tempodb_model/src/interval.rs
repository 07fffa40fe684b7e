//! Half-open valid-time intervals and Allen's interval algebra.

use crate::error::{ModelError, ModelResult};
use crate::value::TimePoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open valid-time interval `[from, until)`.
///
/// Invariant: `from < until`, and `from` is never the unbounded sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    from: TimePoint,
    until: TimePoint,
}

impl Interval {
    /// Creates an interval, rejecting empty or inverted bounds.
    pub fn new(from: TimePoint, until: TimePoint) -> ModelResult<Self> {
        if from.is_unbounded() {
            return Err(ModelError::UnboundedFrom);
        }
        if from >= until {
            return Err(ModelError::EmptyInterval {
                from: from.to_string(),
                until: until.to_string(),
            });
        }
        Ok(Self { from, until })
    }

    /// The inclusive lower bound.
    #[must_use]
    pub fn from(&self) -> &TimePoint {
        &self.from
    }

    /// The exclusive upper bound.
    #[must_use]
    pub fn until(&self) -> &TimePoint {
        &self.until
    }

    /// Returns true if `point` lies inside the interval.
    #[must_use]
    pub fn contains(&self, point: &TimePoint) -> bool {
        &self.from <= point && point < &self.until
    }

    /// Returns true if this interval fully covers `other`.
    #[must_use]
    pub fn covers(&self, other: &Interval) -> bool {
        self.from <= other.from && other.until <= self.until
    }

    /// Returns true if the two intervals share any point.
    #[must_use]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.from < other.until && other.from < self.until
    }

    /// Returns true if this interval ends exactly where `other` begins.
    #[must_use]
    pub fn meets(&self, other: &Interval) -> bool {
        self.until == other.from
    }

    /// Classifies this interval against `other` in Allen's algebra.
    #[must_use]
    pub fn relation(&self, other: &Interval) -> AllenRelation {
        use std::cmp::Ordering::{Equal, Greater, Less};
        let (xf, xu) = (&self.from, &self.until);
        let (yf, yu) = (&other.from, &other.until);

        if xu < yf {
            return AllenRelation::Precedes;
        }
        if xu == yf {
            return AllenRelation::Meets;
        }
        if yu < xf {
            return AllenRelation::PrecededBy;
        }
        if yu == xf {
            return AllenRelation::MetBy;
        }
        match (xf.cmp(yf), xu.cmp(yu)) {
            (Equal, Equal) => AllenRelation::Equals,
            (Equal, Less) => AllenRelation::Starts,
            (Equal, Greater) => AllenRelation::StartedBy,
            (Less, Equal) => AllenRelation::FinishedBy,
            (Greater, Equal) => AllenRelation::Finishes,
            (Less, Greater) => AllenRelation::Contains,
            (Greater, Less) => AllenRelation::During,
            (Less, Less) => AllenRelation::Overlaps,
            (Greater, Greater) => AllenRelation::OverlappedBy,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.until)
    }
}

/// The thirteen relations of Allen's interval algebra.
///
/// Reported in plan rows so callers can audit how a new interval relates
/// to the target row it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllenRelation {
    /// `x` ends strictly before `y` begins.
    Precedes,
    /// `x` ends exactly where `y` begins.
    Meets,
    /// `x` starts first and the intervals overlap.
    Overlaps,
    /// Same start, `x` ends first.
    Starts,
    /// `x` lies strictly inside `y`.
    During,
    /// Same end, `x` starts later.
    Finishes,
    /// Identical intervals.
    Equals,
    /// `y` ends strictly before `x` begins.
    PrecededBy,
    /// `y` ends exactly where `x` begins.
    MetBy,
    /// `y` starts first and the intervals overlap.
    OverlappedBy,
    /// Same start, `y` ends first.
    StartedBy,
    /// `y` lies strictly inside `x`.
    Contains,
    /// Same end, `y` starts later.
    FinishedBy,
}

impl AllenRelation {
    /// Stable textual name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precedes => "precedes",
            Self::Meets => "meets",
            Self::Overlaps => "overlaps",
            Self::Starts => "starts",
            Self::During => "during",
            Self::Finishes => "finishes",
            Self::Equals => "equals",
            Self::PrecededBy => "preceded_by",
            Self::MetBy => "met_by",
            Self::OverlappedBy => "overlapped_by",
            Self::StartedBy => "started_by",
            Self::Contains => "contains",
            Self::FinishedBy => "finished_by",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(from: &str, until: &str) -> Interval {
        Interval::new(from.into(), until.into()).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted() {
        assert!(Interval::new("2024-01-01".into(), "2024-01-01".into()).is_err());
        assert!(Interval::new("2024-06-01".into(), "2024-01-01".into()).is_err());
        assert!(Interval::new(TimePoint::Unbounded, TimePoint::Unbounded).is_err());
    }

    #[test]
    fn open_ended_interval() {
        let i = Interval::new("2024-01-01".into(), TimePoint::Unbounded).unwrap();
        assert!(i.contains(&"9999-12-31".into()));
        assert!(i.until().is_unbounded());
    }

    #[test]
    fn contains_is_half_open() {
        let i = iv("2024-01-01", "2024-06-01");
        assert!(i.contains(&"2024-01-01".into()));
        assert!(!i.contains(&"2024-06-01".into()));
    }

    #[test]
    fn overlap_and_meet() {
        let a = iv("2024-01-01", "2024-06-01");
        let b = iv("2024-06-01", "2024-12-01");
        let c = iv("2024-03-01", "2024-09-01");
        assert!(!a.overlaps(&b));
        assert!(a.meets(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn allen_relations() {
        let a = iv("2024-01-01", "2024-06-01");
        assert_eq!(a.relation(&iv("2024-07-01", "2024-08-01")), AllenRelation::Precedes);
        assert_eq!(a.relation(&iv("2024-06-01", "2024-08-01")), AllenRelation::Meets);
        assert_eq!(a.relation(&iv("2024-01-01", "2024-06-01")), AllenRelation::Equals);
        assert_eq!(a.relation(&iv("2024-01-01", "2024-08-01")), AllenRelation::Starts);
        assert_eq!(a.relation(&iv("2023-01-01", "2024-06-01")), AllenRelation::Finishes);
        assert_eq!(a.relation(&iv("2024-02-01", "2024-03-01")), AllenRelation::Contains);
        assert_eq!(a.relation(&iv("2023-01-01", "2025-01-01")), AllenRelation::During);
        assert_eq!(a.relation(&iv("2024-03-01", "2024-08-01")), AllenRelation::Overlaps);
        assert_eq!(a.relation(&iv("2023-06-01", "2024-03-01")), AllenRelation::OverlappedBy);
        assert_eq!(a.relation(&iv("2024-01-01", "2024-03-01")), AllenRelation::StartedBy);
        assert_eq!(a.relation(&iv("2023-01-01", "2023-06-01")), AllenRelation::PrecededBy);
        assert_eq!(a.relation(&iv("2023-01-01", "2024-01-01")), AllenRelation::MetBy);
        assert_eq!(a.relation(&iv("2023-06-01", "2024-06-01")), AllenRelation::FinishedBy);
    }

    #[test]
    fn covers_includes_equal_bounds() {
        let outer = iv("2024-01-01", "2024-12-31");
        assert!(outer.covers(&iv("2024-01-01", "2024-12-31")));
        assert!(outer.covers(&iv("2024-03-01", "2024-06-01")));
        assert!(!outer.covers(&iv("2023-12-01", "2024-06-01")));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn interval_strategy() -> impl Strategy<Value = Interval> {
            (0i64..100, 1i64..20).prop_map(|(from, len)| {
                Interval::new(from.into(), (from + len).into()).unwrap()
            })
        }

        proptest! {
            #[test]
            fn relation_agrees_with_predicates(
                a in interval_strategy(),
                b in interval_strategy(),
            ) {
                let relation = a.relation(&b);
                let disjoint = matches!(
                    relation,
                    AllenRelation::Precedes
                        | AllenRelation::Meets
                        | AllenRelation::PrecededBy
                        | AllenRelation::MetBy
                );
                prop_assert_eq!(a.overlaps(&b), !disjoint);
                if a.meets(&b) {
                    prop_assert_eq!(relation, AllenRelation::Meets);
                }
            }

            #[test]
            fn equal_relation_is_symmetric(
                a in interval_strategy(),
                b in interval_strategy(),
            ) {
                prop_assert_eq!(
                    a.relation(&b) == AllenRelation::Equals,
                    b.relation(&a) == AllenRelation::Equals
                );
            }
        }
    }
}
