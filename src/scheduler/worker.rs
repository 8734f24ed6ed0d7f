use super::termination::TerminationBarrier;
use crate::scavenge::{GcCycle, Parallel, ScavengeContext, WorkerRemnant};
use crate::storage::Heap;
use crate::util::ObjectReference;

/// The roots handed to one worker.
pub(crate) struct WorkerRoots<'r> {
    pub threads: &'r mut [ObjectReference],
    pub closures: &'r mut [ObjectReference],
}

/// The body of one parallel GC worker: evacuate its share of the roots, trace claimed
/// remembered-set chunks, then scan and steal until the termination barrier says every worker
/// is out of work.
pub(crate) fn run(heap: &Heap, cycle: &GcCycle, ordinal: usize, roots: WorkerRoots) -> WorkerRemnant {
    let _abort_on_panic = AbortOnPanic(&cycle.termination);
    let WorkerRoots { threads, closures } = roots;
    let mut cx = ScavengeContext::<Parallel>::new(heap, cycle, ordinal);
    debug!(
        "Worker {} starts with {} thread roots and {} closure roots",
        ordinal,
        threads.len(),
        closures.len()
    );
    for thread in threads.iter_mut() {
        cx.scavenge_thread_root(thread);
    }
    for closure in closures.iter_mut() {
        cx.evacuate_root(closure);
    }
    loop {
        cx.scavenge_claimed_mut_lists();
        cx.scavenge_loop();
        if !cycle.termination.idle(|| cycle.has_claimable_work()) {
            break;
        }
        cx.note_idle_round();
    }
    debug!("Worker {} done", ordinal);
    cx.into_remnant()
}

/// Releases the other workers if this one panics.
struct AbortOnPanic<'a>(&'a TerminationBarrier);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort();
        }
    }
}

/// Split `items` into `n` runs of nearly equal length.
pub(crate) fn split_for_workers<T>(items: &mut [T], n: usize) -> Vec<&mut [T]> {
    let mut parts = Vec::with_capacity(n);
    let mut rest = items;
    for i in 0..n {
        let take = rest.len() / (n - i);
        let (part, tail) = std::mem::take(&mut rest).split_at_mut(take);
        parts.push(part);
        rest = tail;
    }
    parts
}
