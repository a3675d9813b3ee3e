//! A one-shot, thread-safe deferred value.

use std::sync::{Mutex, OnceLock};

/// A value computed at most once, on whichever thread first asks for it.
///
/// Mirrors the `Lazy<T>` used by the original task harness to avoid paying
/// for an expensive output field (e.g. a reconstructed domain object) unless
/// a constraint actually reads it.
pub struct Lazy<T> {
  cell: OnceLock<T>,
  init: Mutex<Option<Box<dyn FnOnce() -> T + Send>>>,
}

impl<T> Lazy<T> {
  /// Defers `f` until the first call to [`Lazy::value`].
  pub fn new(f: impl FnOnce() -> T + Send + 'static) -> Self {
    Lazy { cell: OnceLock::new(), init: Mutex::new(Some(Box::new(f))) }
  }

  /// Returns the value, computing it on first access. `OnceLock` guarantees
  /// the initializer runs exactly once even under concurrent access.
  pub fn value(&self) -> &T {
    self.cell.get_or_init(|| {
      let f = self.init.lock().unwrap().take().expect("Lazy initializer already consumed");
      f()
    })
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Lazy<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.cell.get() {
      Some(v) => f.debug_tuple("Lazy").field(v).finish(),
      None => f.write_str("Lazy(<unevaluated>)"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[test]
  fn computes_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = calls.clone();
    let lazy = Lazy::new(move || {
      calls2.fetch_add(1, Ordering::SeqCst);
      42
    });
    assert_eq!(*lazy.value(), 42);
    assert_eq!(*lazy.value(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn concurrent_first_access_runs_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = calls.clone();
    let lazy = Arc::new(Lazy::new(move || {
      calls2.fetch_add(1, Ordering::SeqCst);
      7
    }));
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let lazy = lazy.clone();
        std::thread::spawn(move || *lazy.value())
      })
      .collect();
    for h in handles {
      assert_eq!(h.join().unwrap(), 7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
