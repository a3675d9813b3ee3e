//! The user-supplied task body and its runner entry point.

use std::error::Error;

use crate::runner::TaskRunner;
use crate::search_space::SearchSpace;

/// A task body: `run` maps an input and a materialized configuration to an
/// output, or fails with its own error type. Implementors carry no state of
/// their own beyond what's needed to run — the constraining state, current
/// point, and score history all live on the [`TaskRunner`] built from it.
pub trait Task: Sized {
  /// The input pushed into the runner at each step.
  type Input;
  /// The output a step produces.
  type Output;
  /// The search space this task is explored over.
  type Space: SearchSpace;
  /// The error a failed run produces, boxed into
  /// [`crate::error::PExploreError::TaskBodyFailure`] by the runner.
  type Error: Error + Send + Sync + 'static;

  /// Runs the task body under `configuration`, derived from a search point.
  /// A step that errors aborts before any constraining-state update: the
  /// constraining state is left unchanged.
  fn run(
    &self,
    input: &Self::Input,
    configuration: &<Self::Space as SearchSpace>::Configuration,
  ) -> Result<Self::Output, Self::Error>;
}

/// Any [`Task`] can be turned into a runner by supplying the search space it
/// explores. This is the crate's "any type that carries a configuration and
/// constructs a runner on demand" entry point: the runner, not the task
/// itself, owns the constraining state, the current point, and the score
/// history.
pub trait TaskRunnable: Task {
  /// Builds the runner for this task over `space`.
  ///
  /// The runner's mode (sequential or parametric parallel) is fixed at this
  /// point, based on the thread manager's concurrency at construction time.
  fn into_runner(self, space: Self::Space) -> TaskRunner<Self> {
    TaskRunner::new(self, space)
  }
}

impl<R: Task> TaskRunnable for R {}
