//! Process-wide handle to the rayon thread pool used for candidate fan-out.

use std::sync::{Arc, Mutex, OnceLock};

use rayon::{ThreadPool, ThreadPoolBuilder};

struct ThreadManagerInner {
  concurrency: usize,
  pool: Arc<ThreadPool>,
}

/// A process-wide, adjustable-concurrency `rayon::ThreadPool` handle.
///
/// Grounded on the `OnceLock`-backed singletons already used elsewhere in
/// this codebase's reference crates for one-time process-wide state.
pub struct ThreadManager {
  inner: Mutex<ThreadManagerInner>,
}

impl ThreadManager {
  /// The process-wide instance, built on first access with concurrency set
  /// to [`ThreadManager::maximum_concurrency`].
  pub fn instance() -> &'static ThreadManager {
    static INSTANCE: OnceLock<ThreadManager> = OnceLock::new();
    INSTANCE.get_or_init(ThreadManager::new)
  }

  fn new() -> Self {
    let concurrency = Self::detect_maximum_concurrency();
    let pool = Arc::new(ThreadPoolBuilder::new().num_threads(concurrency).build().expect("failed to build thread pool"));
    ThreadManager { inner: Mutex::new(ThreadManagerInner { concurrency, pool }) }
  }

  fn detect_maximum_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
  }

  /// The number of threads available on this machine, independent of the
  /// currently configured concurrency.
  pub fn maximum_concurrency(&self) -> usize {
    Self::detect_maximum_concurrency()
  }

  /// The currently configured concurrency.
  pub fn concurrency(&self) -> usize {
    self.inner.lock().unwrap().concurrency
  }

  /// Rebuilds the thread pool with `concurrency` threads. `concurrency = 1`
  /// selects the sequential task runner; `concurrency > 1` selects the
  /// parametric parallel runner.
  pub fn set_concurrency(&self, concurrency: usize) {
    let concurrency = concurrency.max(1);
    let pool = Arc::new(ThreadPoolBuilder::new().num_threads(concurrency).build().expect("failed to build thread pool"));
    let mut inner = self.inner.lock().unwrap();
    inner.concurrency = concurrency;
    inner.pool = pool;
  }

  /// Runs `f` on this manager's thread pool. The pool handle is cloned out
  /// from under the lock before `install` runs, so concurrent steps on
  /// different runners never serialize against each other here.
  pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
    let pool = self.inner.lock().unwrap().pool.clone();
    pool.install(f)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn concurrency_defaults_to_maximum() {
    let tm = ThreadManager::instance();
    assert_eq!(tm.concurrency(), tm.maximum_concurrency());
  }

  #[test]
  fn set_concurrency_is_observable() {
    let tm = ThreadManager::instance();
    let original = tm.concurrency();
    tm.set_concurrency(1);
    assert_eq!(tm.concurrency(), 1);
    tm.set_concurrency(original);
    assert_eq!(tm.concurrency(), original);
  }
}
