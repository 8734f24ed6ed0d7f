use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Decides when a parallel scavenge is over.
///
/// Every worker starts out running. A worker that runs out of local work calls
/// [`TerminationBarrier::idle`], which keeps it polling for claimable work until either some
/// shows up (the worker resumes) or no worker is running any more. Work is only ever created by
/// running workers, so once the running count reaches zero no more can appear.
pub struct TerminationBarrier {
    running: AtomicUsize,
    /// A worker died. Idle workers give up instead of waiting for it.
    aborted: AtomicBool,
}

impl TerminationBarrier {
    pub fn new(workers: usize) -> Self {
        TerminationBarrier {
            running: AtomicUsize::new(workers),
            aborted: AtomicBool::new(false),
        }
    }

    /// Wait for work or for the phase to end. Returns true if the caller should resume
    /// scavenging, false if every worker is idle and nothing is left to claim.
    pub fn idle<F: Fn() -> bool>(&self, any_work: F) -> bool {
        let running = self.running.fetch_sub(1, Ordering::SeqCst) - 1;
        trace!("Worker idle, {} still running", running);
        let backoff = Backoff::new();
        loop {
            if any_work() {
                self.running.fetch_add(1, Ordering::SeqCst);
                return true;
            }
            if self.running.load(Ordering::SeqCst) == 0 || self.aborted.load(Ordering::SeqCst) {
                return false;
            }
            if backoff.is_completed() {
                std::thread::yield_now();
            } else {
                backoff.snooze();
            }
        }
    }

    /// Release every idle worker. Called when a worker panics, since it will never go idle.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::panic_after;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn last_idle_worker_ends_the_phase() {
        let barrier = TerminationBarrier::new(1);
        assert!(!barrier.idle(|| false));
        assert_eq!(barrier.running(), 0);
    }

    #[test]
    fn abort_releases_idle_workers() {
        let barrier = TerminationBarrier::new(2);
        barrier.abort();
        assert!(!barrier.idle(|| false));
        assert_eq!(barrier.running(), 1);
    }

    #[test]
    fn idle_worker_resumes_on_new_work() {
        panic_after(5000, || {
            let barrier = Arc::new(TerminationBarrier::new(2));
            let work = Arc::new(AtomicBool::new(false));
            let waiter = {
                let barrier = barrier.clone();
                let work = work.clone();
                std::thread::spawn(move || barrier.idle(|| work.load(Ordering::SeqCst)))
            };
            work.store(true, Ordering::SeqCst);
            assert!(waiter.join().unwrap());
            // The resumed worker and this one are running.
            assert_eq!(barrier.running(), 2);
            work.store(false, Ordering::SeqCst);
            let b1 = barrier.clone();
            let t = std::thread::spawn(move || b1.idle(|| false));
            assert!(!barrier.idle(|| false));
            assert!(!t.join().unwrap());
        })
    }
}
