//! The constraining state machine: tracks which constraints are still
//! active and turns robustness values into scores.

use std::collections::BTreeSet;

use crate::constraint::{Constraint, FailureKind, ObjectiveImpact, SuccessAction};
use crate::error::{ConstraintStateSnapshot, PExploreError, Result};
use crate::score::{ConstraintScore, PointScore};
use crate::search_space::SearchPoint;
use crate::task::Task;

/// A constraint plus its runtime flags.
pub struct ConstraintState<R: Task> {
  constraint: Constraint<R>,
  active: bool,
  succeeded: bool,
  failed: bool,
}

impl<R: Task> ConstraintState<R> {
  fn new(constraint: Constraint<R>) -> Self {
    ConstraintState { constraint, active: true, succeeded: false, failed: false }
  }

  /// The wrapped constraint.
  pub fn constraint(&self) -> &Constraint<R> {
    &self.constraint
  }

  /// Whether this constraint is still active.
  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Whether this constraint has ever succeeded.
  pub fn has_succeeded(&self) -> bool {
    self.succeeded
  }

  /// Whether this constraint has ever failed.
  pub fn has_failed(&self) -> bool {
    self.failed
  }

  fn snapshot(&self) -> ConstraintStateSnapshot {
    ConstraintStateSnapshot {
      name: self.constraint.name().to_string(),
      group_id: self.constraint.group_id(),
      active: self.active,
      succeeded: self.succeeded,
      failed: self.failed,
    }
  }
}

/// The full set of constraints for a task, plus their runtime flags.
///
/// Evaluation (`evaluate`, `evaluate_at`) only reads constraint flags and is
/// safe to call from multiple threads concurrently, as long as `update` is
/// `false`. Only `update_from` mutates flags, and must be called from a
/// single thread after all of a step's candidate evaluations have joined.
pub struct ConstrainingState<R: Task> {
  states: Vec<ConstraintState<R>>,
  num_active: usize,
}

impl<R: Task> ConstrainingState<R> {
  /// Builds a constraining state from a fresh constraint list. All
  /// constraints start active.
  pub fn new(constraints: Vec<Constraint<R>>) -> Self {
    let num_active = constraints.len();
    let states = constraints.into_iter().map(ConstraintState::new).collect();
    ConstrainingState { states, num_active }
  }

  /// The constraint states, in the order they were supplied.
  pub fn states(&self) -> &[ConstraintState<R>] {
    &self.states
  }

  /// Whether this state was ever configured with constraints.
  pub fn is_configured(&self) -> bool {
    !self.states.is_empty()
  }

  /// Whether every constraint has deactivated (or none were ever
  /// configured).
  pub fn has_no_active_constraints(&self) -> bool {
    self.num_active == 0
  }

  /// Scores `(input, output)` against every active constraint.
  ///
  /// Errors with [`PExploreError::NoActiveConstraints`] if no constraint is
  /// active. `update` must be `false` for per-candidate evaluation during a
  /// parallel step; only the post-selection call passes `true`.
  pub fn evaluate(&self, input: &R::Input, output: &R::Output, update: bool) -> Result<ConstraintScore> {
    if self.has_no_active_constraints() {
      return Err(PExploreError::NoActiveConstraints(self.states.iter().map(ConstraintState::snapshot).collect()));
    }
    let mut successes = BTreeSet::new();
    let mut hard_failures = BTreeSet::new();
    let mut soft_failures = BTreeSet::new();
    let mut objective = 0.0;
    for (i, state) in self.states.iter().enumerate() {
      if !state.is_active() {
        continue;
      }
      let constraint = state.constraint();
      let rho = constraint.robustness(input, output, update);

      match constraint.objective_impact() {
        ObjectiveImpact::None => {}
        ObjectiveImpact::Unsigned => objective += rho.abs(),
        ObjectiveImpact::Signed => objective += rho,
      }

      let is_violation = rho.is_nan() || rho < 0.0;
      if is_violation {
        match constraint.failure_kind() {
          FailureKind::None => {}
          FailureKind::Hard => {
            hard_failures.insert(i);
          }
          FailureKind::Soft => {
            soft_failures.insert(i);
          }
        }
      } else {
        successes.insert(i);
      }
    }
    Ok(ConstraintScore::new(successes, hard_failures, soft_failures, objective))
  }

  /// Convenience wrapper pairing [`ConstrainingState::evaluate`] with the
  /// candidate point it was computed for, always with `update = false`.
  pub fn evaluate_at<P: SearchPoint>(&self, point: P, input: &R::Input, output: &R::Output) -> Result<PointScore<P>> {
    let evaluation = self.evaluate(input, output, false)?;
    Ok(PointScore::new(point, evaluation))
  }

  /// Updates constraint flags from the chosen `(input, output)` pair of a
  /// step. A silent no-op if no constraint is active — unlike `evaluate`,
  /// which errors in that case, since deciding whether the caller *should*
  /// treat "no active constraints" as an error is the runner's job, not
  /// this method's.
  pub fn update_from(&mut self, input: &R::Input, output: &R::Output) -> Result<()> {
    if self.has_no_active_constraints() {
      return Ok(());
    }
    let evaluation = self.evaluate(input, output, true)?;
    let mut group_ids_to_deactivate = BTreeSet::new();
    for (i, state) in self.states.iter_mut().enumerate() {
      if !state.is_active() {
        continue;
      }
      if evaluation.successes().contains(&i) {
        if state.constraint.success_action() == SuccessAction::Deactivate {
          state.succeeded = true;
          group_ids_to_deactivate.insert(state.constraint.group_id());
        }
      } else if evaluation.hard_failures().contains(&i) {
        state.failed = true;
        group_ids_to_deactivate.insert(state.constraint.group_id());
      }
    }
    for state in self.states.iter_mut() {
      if state.is_active() && group_ids_to_deactivate.contains(&state.constraint.group_id()) {
        state.active = false;
        self.num_active -= 1;
        tracing::debug!(name = state.constraint.name(), group_id = state.constraint.group_id(), "constraint deactivated");
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constraint::Constraint;

  struct Solution;
  impl Task for Solution {
    type Input = f64;
    type Output = f64;
    type Space = crate::test_support::CalibrationSpace;
    type Error = std::convert::Infallible;

    fn run(&self, input: &f64, _configuration: &crate::test_support::CalibrationConfiguration) -> Result<f64, Self::Error> {
      Ok(*input)
    }
  }

  fn hard_fail_constraint() -> Constraint<Solution> {
    Constraint::<Solution>::builder()
      .robustness(|_: &f64, output: &f64| 12.0 - *output)
      .failure_kind(crate::constraint::FailureKind::Hard)
      .objective_impact(ObjectiveImpact::Signed)
      .build()
  }

  #[test]
  fn evaluate_errors_without_active_constraints() {
    let cs = ConstrainingState::<Solution>::new(vec![]);
    assert!(cs.evaluate(&0.0, &0.0, false).is_err());
  }

  #[test]
  fn update_from_is_a_silent_no_op_without_active_constraints() {
    let mut cs = ConstrainingState::<Solution>::new(vec![]);
    assert!(cs.update_from(&0.0, &0.0).is_ok());
  }

  #[test]
  fn hard_failure_deactivates_its_own_group() {
    let mut cs = ConstrainingState::<Solution>::new(vec![hard_fail_constraint()]);
    assert!(!cs.has_no_active_constraints());
    cs.update_from(&0.0, &20.0).unwrap();
    assert!(cs.has_no_active_constraints());
  }

  #[test]
  fn success_with_deactivate_action_deactivates_group() {
    let c = Constraint::<Solution>::builder()
      .robustness(|_: &f64, output: &f64| *output)
      .success_action(SuccessAction::Deactivate)
      .build();
    let mut cs = ConstrainingState::<Solution>::new(vec![c]);
    cs.update_from(&0.0, &1.0).unwrap();
    assert!(cs.has_no_active_constraints());
  }

  #[test]
  fn nan_robustness_routes_to_configured_failure_kind() {
    let c = Constraint::<Solution>::builder()
      .robustness(|_: &f64, _output: &f64| f64::NAN)
      .failure_kind(crate::constraint::FailureKind::Soft)
      .build();
    let cs = ConstrainingState::<Solution>::new(vec![c]);
    let score = cs.evaluate(&0.0, &0.0, false).unwrap();
    assert!(score.soft_failures().contains(&0));
    assert!(score.hard_failures().is_empty());
  }
}
