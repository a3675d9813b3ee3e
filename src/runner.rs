//! The two-mode task runner: sequential, and parametric parallel.

use std::sync::{Mutex, RwLock};

use rayon::prelude::*;

use crate::constraint::Constraint;
use crate::constraining_state::ConstrainingState;
use crate::error::{PExploreError, Result};
use crate::score::PointScore;
use crate::search_space::SearchSpace;
use crate::task::Task;
use crate::task_manager::TaskManager;
use crate::thread_manager::ThreadManager;

/// Which stepping strategy a runner uses, fixed at construction time from
/// the thread manager's concurrency.
enum Mode {
  /// The current point never moves; no candidate set is ever built.
  Sequential,
  /// Each step fans out over `{current_point} ∪ shift_one(current_point)`,
  /// capped by concurrency, and selects the best-scoring candidate.
  Parallel,
}

/// Runs a [`Task`] repeatedly through a blocking `push`/`pull` rendezvous.
///
/// Construction reads [`ThreadManager::instance`]'s concurrency once:
/// `concurrency == 1` selects the sequential runner, `concurrency > 1`
/// selects the parametric parallel runner. There is no background
/// processing thread — `push` just stores the input, and `pull` both runs
/// the step and returns its output, on the caller's thread.
pub struct TaskRunner<R: Task> {
  task: R,
  space: R::Space,
  constraining_state: RwLock<ConstrainingState<R>>,
  current_point: Mutex<<R::Space as SearchSpace>::Point>,
  pending_input: Mutex<Option<R::Input>>,
  point_locked: Mutex<bool>,
  mode: Mode,
  task_manager: TaskManager<<R::Space as SearchSpace>::Point>,
}

impl<R> TaskRunner<R>
where
  R: Task + Sync,
  R::Input: Sync,
  R::Output: Send,
  R::Space: Sync,
  <R::Space as SearchSpace>::Point: Send + Sync,
{
  /// Builds a runner for `task` over `space`, with no constraints
  /// configured and the current point set to `space.initial_point()`.
  pub fn new(task: R, space: R::Space) -> Self {
    let mode = if ThreadManager::instance().concurrency() == 1 { Mode::Sequential } else { Mode::Parallel };
    let current_point = space.initial_point();
    TaskRunner {
      task,
      space,
      constraining_state: RwLock::new(ConstrainingState::new(Vec::new())),
      current_point: Mutex::new(current_point),
      pending_input: Mutex::new(None),
      point_locked: Mutex::new(false),
      mode,
      task_manager: TaskManager::new(),
    }
  }

  /// Replaces the constraint list, resetting every constraint's runtime
  /// flags to fresh/active.
  pub fn set_constraints(&self, constraints: Vec<Constraint<R>>) {
    *self.constraining_state.write().unwrap() = ConstrainingState::new(constraints);
  }

  /// Overrides the starting point. Only valid before the first `push`.
  pub fn set_initial_point(&self, point: <R::Space as SearchSpace>::Point) -> Result<()> {
    if *self.point_locked.lock().unwrap() {
      return Err(PExploreError::PreconditionViolation("set_initial_point called after the first push".to_string()));
    }
    *self.current_point.lock().unwrap() = point;
    Ok(())
  }

  /// The score history and concurrency proxy for this runner.
  pub fn task_manager(&self) -> &TaskManager<<R::Space as SearchSpace>::Point> {
    &self.task_manager
  }

  /// Pushes `input` into the single-slot input queue.
  pub fn push(&self, input: R::Input) -> Result<()> {
    *self.point_locked.lock().unwrap() = true;
    let mut slot = self.pending_input.lock().unwrap();
    if slot.is_some() {
      return Err(PExploreError::PreconditionViolation("push called before the previous input was pulled".to_string()));
    }
    *slot = Some(input);
    Ok(())
  }

  /// Runs one step on the pushed input and returns its output, blocking
  /// until the step completes.
  pub fn pull(&self) -> Result<R::Output> {
    let input = self
      .pending_input
      .lock()
      .unwrap()
      .take()
      .ok_or_else(|| PExploreError::PreconditionViolation("pull called without a matching push".to_string()))?;

    let _span = tracing::debug_span!("step").entered();
    match self.mode {
      Mode::Sequential => self.pull_sequential(input),
      Mode::Parallel => self.pull_parallel(input),
    }
  }

  fn pull_sequential(&self, input: R::Input) -> Result<R::Output> {
    let point = self.current_point.lock().unwrap().clone();
    let configuration = self.space.make_configuration(&point);
    let output = self
      .task
      .run(&input, &configuration)
      .map_err(|e| PExploreError::TaskBodyFailure(Box::new(e)))?;

    let cs = self.constraining_state.read().unwrap();
    if cs.is_configured() {
      drop(cs);
      let mut cs = self.constraining_state.write().unwrap();
      cs.update_from(&input, &output)?;
    }
    Ok(output)
  }

  fn pull_parallel(&self, input: R::Input) -> Result<R::Output> {
    let current = self.current_point.lock().unwrap().clone();
    let cs = self.constraining_state.read().unwrap();

    if cs.is_configured() && cs.has_no_active_constraints() {
      tracing::warn!("all constraints deactivated; step cannot select a candidate");
      return Err(PExploreError::NoActiveConstraints(
        cs.states().iter().map(|s| crate::error::ConstraintStateSnapshot {
          name: s.constraint().name().to_string(),
          group_id: s.constraint().group_id(),
          active: s.is_active(),
          succeeded: s.has_succeeded(),
          failed: s.has_failed(),
        }).collect(),
      ));
    }
    let scoring_enabled = cs.is_configured() && !cs.has_no_active_constraints();

    let mut candidates = vec![current.clone()];
    if scoring_enabled {
      let concurrency = ThreadManager::instance().concurrency();
      let mut neighborhood = self.space.shift_one(&current);
      let cap = concurrency.saturating_sub(1);
      neighborhood.truncate(cap);
      candidates.extend(neighborhood);
    }

    let results: Vec<(<R::Space as SearchSpace>::Point, R::Output, Option<PointScore<<R::Space as SearchSpace>::Point>>)> =
      ThreadManager::instance().install(|| {
        candidates
          .par_iter()
          .map(|point| -> Result<_> {
            let configuration = self.space.make_configuration(point);
            let output = self
              .task
              .run(&input, &configuration)
              .map_err(|e| PExploreError::TaskBodyFailure(Box::new(e)))?;
            let score =
              if scoring_enabled { Some(cs.evaluate_at(point.clone(), &input, &output)?) } else { None };
            Ok((point.clone(), output, score))
          })
          .collect::<Result<Vec<_>>>()
      })?;
    drop(cs);

    let chosen_index = if scoring_enabled {
      results
        .iter()
        .enumerate()
        .min_by(|(ia, (_, _, a)), (ib, (_, _, b))| {
          a.as_ref().unwrap().cmp(b.as_ref().unwrap()).then_with(|| ia.cmp(ib))
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
    } else {
      0
    };

    if scoring_enabled {
      let step_scores: Vec<_> = results.iter().filter_map(|(_, _, s)| s.clone()).collect();
      self.task_manager.record_step(step_scores);
    }

    let (chosen_point, chosen_output, _) = results.into_iter().nth(chosen_index).expect("candidates is never empty");

    {
      let mut cs = self.constraining_state.write().unwrap();
      cs.update_from(&input, &chosen_output)?;
    }
    *self.current_point.lock().unwrap() = chosen_point;

    Ok(chosen_output)
  }
}
