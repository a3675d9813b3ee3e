//! Scores produced by evaluating a candidate against a constraining state.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::search_space::SearchPoint;

/// The outcome of scoring one `(input, output)` pair against every active
/// constraint.
///
/// Ordering considers `hard_failures` first, then `soft_failures`, then
/// `objective`; `successes` is carried for diagnostics only and never
/// compared. Within a failure level, fewer failures is smaller (better):
/// a set that is a strict subset of another orders before it, and two sets
/// that are neither subset of the other compare equal, falling through to
/// the next key.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintScore {
  successes: BTreeSet<usize>,
  hard_failures: BTreeSet<usize>,
  soft_failures: BTreeSet<usize>,
  objective: f64,
}

impl ConstraintScore {
  /// Builds a score from the constraint indices that succeeded, hard-failed,
  /// and soft-failed, plus the accumulated objective.
  pub fn new(
    successes: BTreeSet<usize>,
    hard_failures: BTreeSet<usize>,
    soft_failures: BTreeSet<usize>,
    objective: f64,
  ) -> Self {
    ConstraintScore { successes, hard_failures, soft_failures, objective }
  }

  /// Indices of constraints that were satisfied.
  pub fn successes(&self) -> &BTreeSet<usize> {
    &self.successes
  }

  /// Indices of constraints that failed with `failure_kind = Hard`.
  pub fn hard_failures(&self) -> &BTreeSet<usize> {
    &self.hard_failures
  }

  /// Indices of constraints that failed with `failure_kind = Soft`.
  pub fn soft_failures(&self) -> &BTreeSet<usize> {
    &self.soft_failures
  }

  /// The accumulated objective contribution across active constraints.
  pub fn objective(&self) -> f64 {
    self.objective
  }
}

/// Compares two failure-index sets under the "fewer failures is better"
/// order: `Less` when `a` is a strict subset of `b`, `Greater` when `b` is a
/// strict subset of `a`, and `Equal` both when the sets are identical and
/// when neither is a subset of the other (an incomparable pair falls through
/// to the next ordering key).
fn cmp_failures(a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> Ordering {
  if a == b {
    return Ordering::Equal;
  }
  match (a.is_subset(b), b.is_subset(a)) {
    (true, false) => Ordering::Less,
    (false, true) => Ordering::Greater,
    _ => Ordering::Equal,
  }
}

impl Eq for ConstraintScore {}

impl PartialOrd for ConstraintScore {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for ConstraintScore {
  fn cmp(&self, other: &Self) -> Ordering {
    cmp_failures(&self.hard_failures, &other.hard_failures)
      .then_with(|| cmp_failures(&self.soft_failures, &other.soft_failures))
      .then_with(|| self.objective.total_cmp(&other.objective))
  }
}

/// A [`ConstraintScore`] paired with the search point it was computed for.
///
/// The point is carried only as an identity tag: ordering and equality
/// delegate entirely to the wrapped score.
#[derive(Clone, Debug)]
pub struct PointScore<P: SearchPoint> {
  point: P,
  evaluation: ConstraintScore,
}

impl<P: SearchPoint> PointScore<P> {
  /// Pairs a search point with its evaluation.
  pub fn new(point: P, evaluation: ConstraintScore) -> Self {
    PointScore { point, evaluation }
  }

  /// The point this score was computed for.
  pub fn point(&self) -> &P {
    &self.point
  }

  /// The underlying constraint score.
  pub fn evaluation(&self) -> &ConstraintScore {
    &self.evaluation
  }
}

impl<P: SearchPoint> PartialEq for PointScore<P> {
  fn eq(&self, other: &Self) -> bool {
    self.evaluation == other.evaluation
  }
}

impl<P: SearchPoint> Eq for PointScore<P> {}

impl<P: SearchPoint> PartialOrd for PointScore<P> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<P: SearchPoint> Ord for PointScore<P> {
  fn cmp(&self, other: &Self) -> Ordering {
    self.evaluation.cmp(&other.evaluation)
  }
}
