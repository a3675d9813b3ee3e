//! A shared calibration task used by the end-to-end test scenarios, mirroring
//! the original task harness's `Configuration<A>` / `TaskInput<A>` /
//! `TaskOutput<A>` fixtures.

use typed_builder::TypedBuilder;

use crate::lazy::Lazy;
use crate::search_space::SearchSpace;
use crate::task::Task;

/// The calibration task's tunable knobs. Built with `typed-builder`, mirroring
/// the original harness's many-independent-setter `Configuration<A>` object.
#[derive(Clone, Debug, TypedBuilder)]
pub struct CalibrationConfiguration {
  #[builder(default)]
  pub use_reconditioning: bool,
  #[builder(default = 5)]
  pub maximum_order: i32,
  #[builder(default = f64::INFINITY)]
  pub maximum_step_size: f64,
  #[builder(default)]
  pub level: Level,
  #[builder(default)]
  pub use_something: bool,
}

/// A coarse tuning level, contributing a fixed amount to the task's output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Level {
  #[default]
  Low,
  Medium,
}

impl Level {
  fn value(self) -> f64 {
    match self {
      Level::Low => 0.0,
      Level::Medium => 1.0,
    }
  }
}

/// A point in the calibration search space: every tunable knob's concrete
/// value. Two points are equal iff every field matches, which is all
/// `SearchPoint` needs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CalibrationPoint {
  pub use_reconditioning: bool,
  pub maximum_order: i32,
  pub maximum_step_size_milli: i64,
  pub level: LevelTag,
  pub use_something: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelTag {
  Low,
  Medium,
}

/// A minimal calibration search space: one boolean toggle, an integer range,
/// a log2-spaced step size, a two-valued level, and a nested boolean.
pub struct CalibrationSpace {
  pub maximum_order_range: (i32, i32),
  pub maximum_step_size_log2_range: (f64, f64),
}

impl Default for CalibrationSpace {
  fn default() -> Self {
    CalibrationSpace { maximum_order_range: (1, 5), maximum_step_size_log2_range: (0.001, 0.1) }
  }
}

impl SearchSpace for CalibrationSpace {
  type Point = CalibrationPoint;
  type Configuration = CalibrationConfiguration;

  fn initial_point(&self) -> Self::Point {
    CalibrationPoint {
      use_reconditioning: false,
      maximum_order: self.maximum_order_range.0,
      maximum_step_size_milli: (self.maximum_step_size_log2_range.0 * 1000.0) as i64,
      level: LevelTag::Low,
      use_something: false,
    }
  }

  fn shift_one(&self, point: &Self::Point) -> Vec<Self::Point> {
    let mut neighbours = Vec::new();
    neighbours.push(CalibrationPoint { use_reconditioning: !point.use_reconditioning, ..point.clone() });
    if point.maximum_order < self.maximum_order_range.1 {
      neighbours.push(CalibrationPoint { maximum_order: point.maximum_order + 1, ..point.clone() });
    }
    if point.maximum_order > self.maximum_order_range.0 {
      neighbours.push(CalibrationPoint { maximum_order: point.maximum_order - 1, ..point.clone() });
    }
    let step_ceiling = (self.maximum_step_size_log2_range.1 * 1000.0) as i64;
    if point.maximum_step_size_milli < step_ceiling {
      neighbours.push(CalibrationPoint { maximum_step_size_milli: point.maximum_step_size_milli * 2, ..point.clone() });
    }
    let other_level = match point.level {
      LevelTag::Low => LevelTag::Medium,
      LevelTag::Medium => LevelTag::Low,
    };
    neighbours.push(CalibrationPoint { level: other_level, ..point.clone() });
    neighbours.push(CalibrationPoint { use_something: !point.use_something, ..point.clone() });
    neighbours
  }

  fn make_configuration(&self, point: &Self::Point) -> Self::Configuration {
    CalibrationConfiguration::builder()
      .use_reconditioning(point.use_reconditioning)
      .maximum_order(point.maximum_order)
      .maximum_step_size(point.maximum_step_size_milli as f64 / 1000.0)
      .level(match point.level {
        LevelTag::Low => Level::Low,
        LevelTag::Medium => Level::Medium,
      })
      .use_something(point.use_something)
      .build()
  }
}

/// `TaskInput<A>`: the step counter and the x-value driving the task.
#[derive(Clone, Debug)]
pub struct CalibrationInput {
  pub x: f64,
  pub step: u32,
}

/// `TaskOutput<A>`: the task's result, plus a lazily-constructed value a
/// constraint may or may not read.
pub struct CalibrationOutput {
  pub y: f64,
  pub step: u32,
  pub expensive: Lazy<f64>,
}

/// The calibration task itself: `y` sums the x-value with every knob's
/// contribution.
pub struct CalibrationTask;

impl Task for CalibrationTask {
  type Input = CalibrationInput;
  type Output = CalibrationOutput;
  type Space = CalibrationSpace;
  type Error = std::convert::Infallible;

  fn run(&self, input: &Self::Input, configuration: &CalibrationConfiguration) -> Result<Self::Output, Self::Error> {
    let y = input.x
      + configuration.level.value()
      + configuration.maximum_order as f64
      + configuration.maximum_step_size
      + if configuration.use_reconditioning { 1.0 } else { 0.0 }
      + if configuration.use_something { 1.0 } else { 0.0 };
    let next_step = input.step + 1;
    Ok(CalibrationOutput { y, step: next_step, expensive: Lazy::new(move || next_step as f64 * 2.0) })
  }
}

/// The error a [`FailingTask`] produces once `input.step` reaches its
/// configured threshold.
#[derive(Debug, thiserror::Error)]
#[error("calibration task body failed at step {step}")]
pub struct CalibrationTaskError {
  pub step: u32,
}

/// A calibration task that fails once `input.step >= fail_at_step`, used to
/// exercise `TaskBodyFailure` end to end.
pub struct FailingTask {
  pub fail_at_step: u32,
}

impl Task for FailingTask {
  type Input = CalibrationInput;
  type Output = CalibrationOutput;
  type Space = CalibrationSpace;
  type Error = CalibrationTaskError;

  fn run(&self, input: &Self::Input, configuration: &CalibrationConfiguration) -> Result<Self::Output, Self::Error> {
    if input.step >= self.fail_at_step {
      return Err(CalibrationTaskError { step: input.step });
    }
    let y = input.x
      + configuration.level.value()
      + configuration.maximum_order as f64
      + configuration.maximum_step_size
      + if configuration.use_reconditioning { 1.0 } else { 0.0 }
      + if configuration.use_something { 1.0 } else { 0.0 };
    let next_step = input.step + 1;
    Ok(CalibrationOutput { y, step: next_step, expensive: Lazy::new(move || next_step as f64 * 2.0) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn initial_point_materializes_low_defaults() {
    let space = CalibrationSpace::default();
    let point = space.initial_point();
    let configuration = space.make_configuration(&point);
    assert!(!configuration.use_reconditioning);
    assert_eq!(configuration.level, Level::Low);
  }

  #[test]
  fn shift_one_is_nonempty_from_the_initial_point() {
    let space = CalibrationSpace::default();
    let point = space.initial_point();
    assert!(!space.shift_one(&point).is_empty());
  }
}
