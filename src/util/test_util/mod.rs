//! Helpers shared by the unit tests, the scenario tests and the benchmarks.

use std::panic;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

pub mod fixtures;

/// Run `f` on its own thread and fail if it has not returned after `millis` milliseconds.
///
/// A collection whose workers never agree to terminate would otherwise hang the test run. A panic
/// inside `f` is re-raised here with its original payload.
pub fn panic_after<T, F>(millis: u64, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (finished, timer) = mpsc::channel::<()>();
    let runner = thread::spawn(move || {
        let result = f();
        // Nobody listens once the timer has fired.
        let _ = finished.send(());
        result
    });

    match timer.recv_timeout(Duration::from_millis(millis)) {
        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
            runner.join().unwrap_or_else(|payload| panic::resume_unwind(payload))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => panic!("no result after {} ms", millis),
    }
}

lazy_static::lazy_static! {
    static ref PROCESS_STATE: Mutex<()> = Mutex::default();
}

/// Run `f` while holding a process-wide lock. Tests that set environment variables use this.
pub fn serial_test<F: FnOnce()>(f: F) {
    let _held = PROCESS_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f();
}

/// Run `test`, then `cleanup` whether or not `test` panicked.
pub fn with_cleanup<T, C>(test: T, cleanup: C)
where
    T: FnOnce() + panic::UnwindSafe,
    C: FnOnce(),
{
    let outcome = panic::catch_unwind(test);
    cleanup();
    if let Err(payload) = outcome {
        panic::resume_unwind(payload);
    }
}
