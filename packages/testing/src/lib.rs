#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests that drive an event loop on the real clock.

use std::env;
use std::panic;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// How long a guarded test may run before it is considered hung.
///
/// Real-clock tests sleep for at most a few hundred milliseconds, so anything near this limit
/// means the event loop is parked on a deadline that never arrives or is spinning.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Under Miri everything is dramatically slower, so the limit is relaxed.
const MIRI_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs `test_fn` on a separate thread and fails the test if it does not finish in time.
///
/// The event loop is single-threaded and not `Send`, so `test_fn` must create its own loop
/// inside the closure. Panics in `test_fn` are propagated unchanged.
///
/// When the `MUTATION_TESTING` environment variable is set to `1`, the watchdog is disabled
/// and `test_fn` runs directly on the calling thread, so that mutation testing can detect
/// mutations that hang.
///
/// # Panics
///
/// Panics if `test_fn` panics or does not complete within the timeout.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 40 + 2);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let timeout = if cfg!(miri) {
        MIRI_WATCHDOG_TIMEOUT
    } else {
        WATCHDOG_TIMEOUT
    };

    let (tx, rx) = mpsc::channel();

    let test_thread = thread::spawn(move || {
        let result = test_fn();

        // If this fails, the watchdog has already given up on us.
        drop(tx.send(result));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_thread
                .join()
                .expect("test thread finished sending, so it cannot have panicked");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {timeout:?} - is the event loop hung?");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_thread.join() {
            Ok(()) => panic!("test thread exited without reporting a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

#[cfg(test)]
#[cfg(not(miri))] // Miri is too slow for threads that sleep.
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn returns_result_of_test() {
        assert_eq!(with_watchdog(|| "done"), "done");
    }

    #[test]
    fn waits_for_slow_but_finite_test() {
        let started = Instant::now();

        with_watchdog(|| thread::sleep(Duration::from_millis(20)));

        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    #[should_panic(expected = "inner failure")]
    fn propagates_test_panic() {
        with_watchdog::<_, ()>(|| panic!("inner failure"));
    }
}
