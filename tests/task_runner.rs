//! End-to-end scenarios for the two-mode task runner, exercised against the
//! shared calibration task.

use pexplore::constraint::{Constraint, FailureKind, ObjectiveImpact};
use pexplore::controller::{Controller, TimeProgressLinear};
use pexplore::error::PExploreError;
use pexplore::search_space::SearchSpace;
use pexplore::task::TaskRunnable;
use pexplore::test_support::{CalibrationInput, CalibrationSpace, CalibrationTask, FailingTask};
use pexplore::thread_manager::ThreadManager;

// `ThreadManager` is a process-wide singleton, and cargo runs tests in the
// same binary concurrently by default. Every scenario here configures
// concurrency explicitly, so they must not interleave.
static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn serial_guard() -> std::sync::MutexGuard<'static, ()> {
  static INIT_TRACING: std::sync::Once = std::sync::Once::new();
  INIT_TRACING.call_once(|| {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
  });
  SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn push_pull_ten_steps(
  runner: &pexplore::runner::TaskRunner<CalibrationTask>,
) -> pexplore::error::Result<Vec<f64>> {
  let mut outputs = Vec::new();
  for step in 0..10u32 {
    runner.push(CalibrationInput { x: 1.0, step })?;
    outputs.push(runner.pull()?.y);
  }
  Ok(outputs)
}

#[test]
fn hard_failure_deactivation_eventually_errors() {
  let _guard = serial_guard();
  ThreadManager::instance().set_concurrency(ThreadManager::instance().maximum_concurrency().max(2));
  let runner = CalibrationTask.into_runner(CalibrationSpace::default());
  // Tied to the step counter rather than to `y` so the failure is reached
  // regardless of which configuration the search settles on.
  runner.set_constraints(vec![Constraint::<CalibrationTask>::builder()
    .robustness(|_: &CalibrationInput, output: &pexplore::test_support::CalibrationOutput| 5.0 - output.step as f64)
    .failure_kind(FailureKind::Hard)
    .objective_impact(ObjectiveImpact::Signed)
    .build()]);

  let result = push_pull_ten_steps(&runner);
  assert!(result.is_err(), "the search should eventually be unable to avoid the hard failure and deactivate");
}

#[test]
fn success_search_accumulates_more_than_one_score_per_step() {
  let _guard = serial_guard();
  ThreadManager::instance().set_concurrency(ThreadManager::instance().maximum_concurrency().max(2));
  let runner = CalibrationTask.into_runner(CalibrationSpace::default());
  runner.set_constraints(vec![Constraint::<CalibrationTask>::builder()
    .robustness(|_: &CalibrationInput, output: &pexplore::test_support::CalibrationOutput| {
      let diff = output.y - 8.0;
      1.0 - diff * diff
    })
    .objective_impact(ObjectiveImpact::Signed)
    .build()]);

  runner.push(CalibrationInput { x: 1.0, step: 0 }).unwrap();
  runner.pull().unwrap();
  let history = runner.task_manager().scores();
  assert!(history[0].len() > 1, "a normal parallel step must score more than just the current point");
}

#[test]
fn lazy_output_is_readable_from_a_constraint() {
  let _guard = serial_guard();
  ThreadManager::instance().set_concurrency(ThreadManager::instance().maximum_concurrency().max(2));
  let runner = CalibrationTask.into_runner(CalibrationSpace::default());
  runner.set_constraints(vec![Constraint::<CalibrationTask>::builder()
    .robustness(|_: &CalibrationInput, output: &pexplore::test_support::CalibrationOutput| *output.expensive.value() - 1.0)
    .objective_impact(ObjectiveImpact::Unsigned)
    .build()]);

  runner.push(CalibrationInput { x: 1.0, step: 0 }).unwrap();
  runner.pull().unwrap();
  let history = runner.task_manager().scores();
  assert!(history[0].len() > 1);
  runner.task_manager().clear_scores();
  assert!(runner.task_manager().scores().is_empty());
}

#[test]
fn concurrency_one_never_moves_the_point_and_never_scores() {
  let _guard = serial_guard();
  ThreadManager::instance().set_concurrency(1);
  let runner = CalibrationTask.into_runner(CalibrationSpace::default());
  runner.set_constraints(vec![Constraint::<CalibrationTask>::builder()
    .robustness(|_: &CalibrationInput, output: &pexplore::test_support::CalibrationOutput| output.y)
    .objective_impact(ObjectiveImpact::Signed)
    .build()]);

  let outputs = push_pull_ten_steps(&runner).unwrap();
  assert!(outputs.windows(2).all(|w| w[0] == w[1]), "the sequential runner's point never advances");
  assert!(runner.task_manager().scores().is_empty(), "the sequential runner never touches the score history");
}

#[test]
fn unconstrained_runner_degenerates_like_concurrency_one() {
  let _guard = serial_guard();
  ThreadManager::instance().set_concurrency(ThreadManager::instance().maximum_concurrency().max(2));
  let runner = CalibrationTask.into_runner(CalibrationSpace::default());
  runner.set_constraints(vec![]);

  let outputs = push_pull_ten_steps(&runner).unwrap();
  assert!(outputs.windows(2).all(|w| w[0] == w[1]));
  assert!(runner.task_manager().scores().is_empty());
}

#[test]
fn time_progress_linear_controller_scales_the_objective_over_scores() {
  let _guard = serial_guard();
  ThreadManager::instance().set_concurrency(ThreadManager::instance().maximum_concurrency().max(2));
  let runner = CalibrationTask.into_runner(CalibrationSpace::default());
  runner.set_constraints(vec![Constraint::<CalibrationTask>::builder()
    .robustness(|_: &CalibrationInput, output: &pexplore::test_support::CalibrationOutput| output.y)
    .objective_impact(ObjectiveImpact::Unsigned)
    .controller(Controller::TimeProgressLinear(TimeProgressLinear::new(
      |_: &CalibrationInput, output: &pexplore::test_support::CalibrationOutput| output.step as f64,
      10.0,
    )))
    .build()]);

  runner.push(CalibrationInput { x: 1.0, step: 0 }).unwrap();
  runner.pull().unwrap();
  let history = runner.task_manager().scores();
  assert!(history[0].len() > 1);
}

#[test]
fn task_body_failure_aborts_the_step_and_leaves_constraining_state_unchanged() {
  let _guard = serial_guard();
  ThreadManager::instance().set_concurrency(ThreadManager::instance().maximum_concurrency().max(2));
  let runner = FailingTask { fail_at_step: 2 }.into_runner(CalibrationSpace::default());
  runner.set_constraints(vec![Constraint::<FailingTask>::builder()
    .robustness(|_: &CalibrationInput, output: &pexplore::test_support::CalibrationOutput| output.y)
    .objective_impact(ObjectiveImpact::Unsigned)
    .build()]);

  for step in 0..2u32 {
    runner.push(CalibrationInput { x: 1.0, step }).unwrap();
    runner.pull().unwrap();
  }

  runner.push(CalibrationInput { x: 1.0, step: 2 }).unwrap();
  let result = runner.pull();
  assert!(matches!(result, Err(PExploreError::TaskBodyFailure(_))), "a failing task body must surface as TaskBodyFailure");
}

#[test]
fn choosing_an_initial_point_is_rejected_after_the_first_push() {
  let _guard = serial_guard();
  let runner = CalibrationTask.into_runner(CalibrationSpace::default());
  let point = CalibrationSpace::default().initial_point();
  assert!(runner.set_initial_point(point.clone()).is_ok());
  runner.push(CalibrationInput { x: 1.0, step: 0 }).unwrap();
  runner.pull().unwrap();
  assert!(runner.set_initial_point(point).is_err());
}
