//! Constraints: the unit of robustness evaluation.

use typed_builder::TypedBuilder;

use crate::controller::Controller;
use crate::task::Task;

/// What happens to a constraint's group when it succeeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuccessAction {
  /// Nothing happens.
  #[default]
  None,
  /// The whole group the constraint belongs to is deactivated.
  Deactivate,
}

/// How a negative robustness value for this constraint is classified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailureKind {
  /// The constraint never fails (a negative robustness is ignored).
  #[default]
  None,
  /// A negative robustness is a hard failure.
  Hard,
  /// A negative robustness is a soft failure.
  Soft,
}

/// How a constraint's robustness contributes to the objective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectiveImpact {
  /// The constraint does not contribute to the objective.
  #[default]
  None,
  /// Contributes `abs(robustness)`.
  Unsigned,
  /// Contributes `robustness` (signed).
  Signed,
}

/// A single constraint: a robustness function plus the classification that
/// decides how its sign and magnitude feed into a [`crate::score::ConstraintScore`].
///
/// Built with the generated `ConstraintBuilder`; immutable once built.
/// Runtime flags (active/succeeded/failed) live on `ConstraintState`, not
/// here, since the same immutable constraint is shared read-only across
/// parallel workers.
#[derive(TypedBuilder)]
pub struct Constraint<R: Task> {
  /// Human-readable name, surfaced in diagnostics.
  #[builder(default, setter(into))]
  name: String,
  /// Constraints sharing a group id are deactivated together.
  #[builder(default)]
  group_id: u32,
  #[builder(default)]
  success_action: SuccessAction,
  #[builder(default)]
  failure_kind: FailureKind,
  #[builder(default)]
  objective_impact: ObjectiveImpact,
  #[builder(default, setter(strip_option))]
  controller: Option<Controller<R::Input, R::Output>>,
  /// The raw robustness function `rho(input, output)`: sign is satisfaction,
  /// magnitude is distance to the constraint boundary.
  #[builder(setter(transform = |f: impl Fn(&R::Input, &R::Output) -> f64 + Send + Sync + 'static| -> Box<dyn Fn(&R::Input, &R::Output) -> f64 + Send + Sync> { Box::new(f) }))]
  robustness: Box<dyn Fn(&R::Input, &R::Output) -> f64 + Send + Sync>,
}

impl<R: Task> Constraint<R> {
  /// The constraint's name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The constraint's group id.
  pub fn group_id(&self) -> u32 {
    self.group_id
  }

  /// The configured success action.
  pub fn success_action(&self) -> SuccessAction {
    self.success_action
  }

  /// The configured failure kind.
  pub fn failure_kind(&self) -> FailureKind {
    self.failure_kind
  }

  /// The configured objective impact.
  pub fn objective_impact(&self) -> ObjectiveImpact {
    self.objective_impact
  }

  /// Computes this constraint's robustness for `(input, output)`, passing it
  /// through the configured controller (if any). `update` must be `false`
  /// for per-candidate evaluation and `true` only for the single
  /// post-selection `update_from` call.
  pub fn robustness(&self, input: &R::Input, output: &R::Output, update: bool) -> f64 {
    let raw = (self.robustness)(input, output);
    match &self.controller {
      Some(controller) => controller.adjust(raw, input, output, update),
      None => raw,
    }
  }
}
