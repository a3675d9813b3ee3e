//! Controllers that post-process raw robustness before it is classified.

use std::sync::Mutex;

/// Adjusts a raw robustness value, optionally recording bookkeeping state.
///
/// `None` passes the raw value through unchanged. `TimeProgressLinear` scales
/// robustness by a time-progress ratio. `Custom` wraps an arbitrary
/// stateful closure. This is a tagged variant rather than a trait object
/// hierarchy: a controller's only job is `adjust`, and the concrete set of
/// shapes it can take is small and fixed, so a dynamic-dispatch hierarchy
/// would add an indirection the problem doesn't need.
pub enum Controller<I, O> {
  /// No adjustment: `adjust` returns `rho_raw` unchanged.
  None,
  /// Scales `rho_raw` by `tau(input, output) / final_time`.
  TimeProgressLinear(TimeProgressLinear<I, O>),
  /// An arbitrary user-supplied adjustment function.
  Custom(CustomController<I, O>),
}

impl<I, O> Controller<I, O> {
  /// Adjusts `rho_raw` for the given `(input, output)` pair. Bookkeeping
  /// state, if any, is updated only when `update` is `true` — the same
  /// contract as [`crate::constraining_state::ConstrainingState::evaluate`]:
  /// per-candidate evaluation passes `update = false` so parallel workers
  /// never race on controller state.
  pub fn adjust(&self, rho_raw: f64, input: &I, output: &O, update: bool) -> f64 {
    match self {
      Controller::None => rho_raw,
      Controller::TimeProgressLinear(c) => c.adjust(rho_raw, input, output, update),
      Controller::Custom(c) => c.adjust(rho_raw, input, output, update),
    }
  }
}

impl<I, O> Default for Controller<I, O> {
  fn default() -> Self {
    Controller::None
  }
}

/// Scales robustness linearly with elapsed time, per
/// `rho = rho_raw * (tau(input, output) / final_time)`.
pub struct TimeProgressLinear<I, O> {
  tau: Box<dyn Fn(&I, &O) -> f64 + Send + Sync>,
  final_time: f64,
  last_progress: Mutex<f64>,
}

impl<I, O> TimeProgressLinear<I, O> {
  /// Builds a controller from a time-progress function and the horizon it is
  /// normalized against.
  pub fn new(tau: impl Fn(&I, &O) -> f64 + Send + Sync + 'static, final_time: f64) -> Self {
    TimeProgressLinear { tau: Box::new(tau), final_time, last_progress: Mutex::new(0.0) }
  }

  /// The `tau` value recorded at the most recent `update = true` call, or
  /// `0.0` if the controller has never been updated.
  pub fn last_progress(&self) -> f64 {
    *self.last_progress.lock().unwrap()
  }

  fn adjust(&self, rho_raw: f64, input: &I, output: &O, update: bool) -> f64 {
    let progress = (self.tau)(input, output);
    if update {
      *self.last_progress.lock().unwrap() = progress;
    }
    rho_raw * (progress / self.final_time)
  }
}

/// A user-supplied stateful adjustment function.
pub struct CustomController<I, O> {
  f: Mutex<Box<dyn FnMut(f64, &I, &O, bool) -> f64 + Send>>,
}

impl<I, O> CustomController<I, O> {
  /// Wraps an arbitrary `(rho_raw, input, output, update) -> rho` closure.
  pub fn new(f: impl FnMut(f64, &I, &O, bool) -> f64 + Send + 'static) -> Self {
    CustomController { f: Mutex::new(Box::new(f)) }
  }

  fn adjust(&self, rho_raw: f64, input: &I, output: &O, update: bool) -> f64 {
    (self.f.lock().unwrap())(rho_raw, input, output, update)
  }
}
