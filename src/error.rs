//! Error types produced by the constraint-driven search runtime.

use thiserror::Error;

/// A frozen view of a single constraint's runtime flags, attached to
/// [`PExploreError::NoActiveConstraints`] for diagnostics once the live
/// state can no longer be borrowed.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintStateSnapshot {
  /// Name the constraint was built with.
  pub name: String,
  /// Group id the constraint belongs to.
  pub group_id: u32,
  /// Whether the constraint was still active when the snapshot was taken.
  pub active: bool,
  /// Whether the constraint had ever succeeded.
  pub succeeded: bool,
  /// Whether the constraint had ever failed.
  pub failed: bool,
}

/// Errors raised by constraint construction, evaluation, and the task
/// runners.
#[derive(Debug, Error)]
pub enum PExploreError {
  /// Raised when a scoring operation is attempted, or a step is pulled,
  /// while every constraint in the constraining state has deactivated.
  #[error("no active constraints remain out of {}", .0.len())]
  NoActiveConstraints(Vec<ConstraintStateSnapshot>),

  /// Raised by [`crate::constraint::ConstraintBuilder`] on malformed input,
  /// e.g. an unhandled classification value.
  #[error("invalid constraint configuration: {0}")]
  InvalidConstraintConfig(String),

  /// The user-supplied task body failed. The constraining state is left
  /// unchanged.
  #[error("task body failed")]
  TaskBodyFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A caller violated a runner precondition, e.g. calling
  /// `set_initial_point` after the first `push`.
  #[error("precondition violated: {0}")]
  PreconditionViolation(String),
}

/// Convenience alias for fallible pExplore operations.
pub type Result<T> = std::result::Result<T, PExploreError>;
