#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing the packages of this workspace.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// Lock-based code that goes wrong tends to deadlock rather than fail, which would hang the test
/// run forever. The limit is 10 seconds, or 60 seconds under Miri.
///
/// Setting the `MUTATION_TESTING` environment variable to "1" runs the test directly on the
/// calling thread with no limit, so that mutation testing can tell hanging mutants apart.
///
/// # Panics
///
/// Panics if the test does not finish in time. A panic in the test itself is resumed on the
/// calling thread.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_thread = thread::spawn(move || {
        // The receiver is gone if we already timed out. Nobody to tell.
        drop(tx.send(test_fn()));
    });

    let limit = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(limit) {
        Ok(result) => {
            test_thread
                .join()
                .expect("test thread finished sending so it cannot have panicked");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {limit:?}, probably deadlocked");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_thread.join() {
            Ok(()) => panic!("test thread exited without producing a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}

/// A shared log of values, for recording what callbacks observed.
///
/// Clones share the same log, so one clone can be moved into a callback while the test keeps
/// another to inspect.
///
/// # Example
///
/// ```rust
/// use testing::Recorder;
///
/// let edges = Recorder::new();
/// let callback = {
///     let edges = edges.clone();
///     move |is_full: bool| edges.record(is_full)
/// };
///
/// callback(true);
/// callback(false);
///
/// assert_eq!(edges.take(), [true, false]);
/// assert!(edges.is_empty());
/// ```
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Recorder<T> {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends a value to the log.
    pub fn record(&self, value: T) {
        self.values.lock().push(value);
    }

    /// Removes and returns everything recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.lock())
    }

    /// The number of values recorded and not yet taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether nothing has been recorded since the last [`take()`][Self::take].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl<T: Clone> Recorder<T> {
    /// Everything recorded so far, leaving the log intact.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Recorder<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Recorder").field(&*self.values.lock()).finish()
    }
}

/// Counts calls from any number of threads. Clones share the same count.
#[derive(Clone, Debug, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one call.
    pub fn increment(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// The number of calls counted so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A callback that counts one call each time it is invoked.
    #[must_use]
    pub fn hook(&self) -> impl Fn() + Send + Sync + 'static {
        let counter = self.clone();
        move || counter.increment()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn watchdog_returns_test_result() {
        assert_eq!(with_watchdog(|| "done"), "done");
    }

    #[test]
    #[should_panic]
    fn watchdog_resumes_test_panic() {
        with_watchdog(|| panic!("test failure"));
    }

    #[test]
    fn recorder_clones_share_log() {
        let recorder = Recorder::new();
        let clone = recorder.clone();

        clone.record(1);
        recorder.record(2);

        assert_eq!(recorder.values(), [1, 2]);
        assert_eq!(clone.len(), 2);
        assert_eq!(clone.take(), [1, 2]);
        assert!(recorder.is_empty());
    }

    #[test]
    fn call_counter_counts_across_threads() {
        let counter = CallCounter::new();
        let hook = counter.hook();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| hook());
            }
        });

        assert_eq!(counter.count(), 4);
    }
}
