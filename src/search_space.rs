//! The external search-space collaborator, expressed as traits.
//!
//! pExplore does not know how configuration points are enumerated or how a
//! point is materialized into a concrete configuration; it only needs the
//! three operations below from whatever search-space/configuration library a
//! downstream crate plugs in.

use std::hash::Hash;

/// An opaque, comparable, hashable point in a configuration search space.
///
/// Carries no behaviour of its own; every operation on points lives on
/// [`SearchSpace`].
pub trait SearchPoint: Clone + Eq + Hash {}

impl<T: Clone + Eq + Hash> SearchPoint for T {}

/// The black-box search space a task is explored over.
pub trait SearchSpace {
  /// A single point in the space.
  type Point: SearchPoint;
  /// The concrete configuration a point materializes into, consumed by
  /// [`crate::task::Task::run`].
  type Configuration;

  /// The point a fresh [`crate::runner::TaskRunner`] starts from.
  fn initial_point(&self) -> Self::Point;

  /// All points reachable from `point` by moving one parameter by one step.
  /// An empty result means `point` has no neighbours.
  fn shift_one(&self, point: &Self::Point) -> Vec<Self::Point>;

  /// Materializes `point` into the configuration a task body runs under.
  fn make_configuration(&self, point: &Self::Point) -> Self::Configuration;
}
