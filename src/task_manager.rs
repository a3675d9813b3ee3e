//! Score-history bookkeeping for a single task runner.

use std::sync::Mutex;

use crate::score::PointScore;
use crate::search_space::SearchPoint;
use crate::thread_manager::ThreadManager;

/// Owns one runner's per-step score history and proxies concurrency
/// queries to the process-wide [`ThreadManager`].
///
/// The original design calls for a process-wide singleton; here each
/// `TaskRunner` owns its own `TaskManager` instead. A singleton keyed by
/// task type would need type erasure to store `PointScore<P>` for arbitrary
/// `P` in one process-wide table, trading a real win (tests can reset
/// history independently per runner) for a contrived one. This is exactly
/// the dependency-injection alternative this design calls out for tests
/// that need to reset history between runs.
pub struct TaskManager<P: SearchPoint> {
  scores: Mutex<Vec<Vec<PointScore<P>>>>,
}

impl<P: SearchPoint> TaskManager<P> {
  /// An empty score history.
  pub fn new() -> Self {
    TaskManager { scores: Mutex::new(Vec::new()) }
  }

  /// A snapshot of every step's scores recorded so far.
  pub fn scores(&self) -> Vec<Vec<PointScore<P>>> {
    self.scores.lock().unwrap().clone()
  }

  /// Appends one step's scores to the history.
  pub fn record_step(&self, step: Vec<PointScore<P>>) {
    self.scores.lock().unwrap().push(step);
  }

  /// Clears the recorded history.
  pub fn clear_scores(&self) {
    self.scores.lock().unwrap().clear();
  }

  /// The currently configured concurrency, proxied to [`ThreadManager`].
  pub fn concurrency(&self) -> usize {
    ThreadManager::instance().concurrency()
  }

  /// Sets concurrency, proxied to [`ThreadManager`].
  pub fn set_concurrency(&self, concurrency: usize) {
    ThreadManager::instance().set_concurrency(concurrency)
  }
}

impl<P: SearchPoint> Default for TaskManager<P> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeSet;

  use crate::score::ConstraintScore;

  #[test]
  fn starts_empty_and_records_steps() {
    let tm: TaskManager<u32> = TaskManager::new();
    assert!(tm.scores().is_empty());
    let score = ConstraintScore::new(BTreeSet::new(), BTreeSet::new(), BTreeSet::new(), 0.0);
    tm.record_step(vec![PointScore::new(1, score)]);
    assert_eq!(tm.scores().len(), 1);
    tm.clear_scores();
    assert!(tm.scores().is_empty());
  }
}
