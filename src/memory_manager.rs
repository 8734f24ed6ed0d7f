//! Runtime-to-scavenger interface.
//!
//! A runtime creates a [`Heap`] and one [`Capability`] per mutator, allocates through the heap,
//! reports old-to-young writes through the write-barrier functions here, and calls
//! [`collect`] when a generation fills up.

use crate::collection::{Collection, Roots};
use crate::object::builtin;
use crate::object::closure::{self, MutArrPtrs};
use crate::object::ClosureKind;
use crate::storage::{sanity, Capability, Heap};
use crate::util::options::Options;
use crate::util::statistics::ScavengeStats;
use crate::util::ObjectReference;

/// Create a heap. Options not set by the caller come from `SCAVENGER_*` environment variables.
///
/// This attempts to initialise the built-in logger. A runtime that wants its own logger should
/// install it first.
pub fn heap_init(options: Options) -> Heap {
    Heap::new(options)
}

/// Collect generations `0..=collect_gen`, using as many GC threads as the `threads` option
/// asks for. The roots are updated in place.
pub fn collect(heap: &Heap, collect_gen: usize, roots: Roots, caps: &mut [Capability]) -> ScavengeStats {
    collect_with_workers(heap, collect_gen, roots, caps, heap.options().threads)
}

/// Collect generations `0..=collect_gen` with `workers` GC threads. One worker runs the
/// sequential scavenger on the calling thread.
pub fn collect_with_workers(
    heap: &Heap,
    collect_gen: usize,
    roots: Roots,
    caps: &mut [Capability],
    workers: usize,
) -> ScavengeStats {
    let collection = Collection::prepare(heap, collect_gen, caps);
    if workers <= 1 {
        collection.run_sequential(roots, caps)
    } else {
        collection.run_parallel(roots, caps, workers)
    }
}

/// Write barrier for a mutable variable: store `value` and, the first time the variable is
/// written since it was last scavenged, record it on the capability.
pub fn mut_var_write(cap: &mut Capability, var: ObjectReference, value: ObjectReference) {
    closure::write_ref(closure::field(var, closure::MUT_VAR_VAR), value);
    if closure::get_info(var).kind() == ClosureKind::MutVarClean {
        closure::set_info(var, &builtin::MUT_VAR_DIRTY);
        cap.record_mutable(var);
    }
}

/// Write barrier for a mutable array: store `value` at `index`, mark the card covering it and,
/// if the array was clean, record it on the capability.
pub fn mut_arr_write(heap: &Heap, cap: &mut Capability, array: ObjectReference, index: usize, value: ObjectReference) {
    let arr = MutArrPtrs::new(array, heap.options().card_bits);
    debug_assert!(index < arr.ptrs());
    closure::write_ref(arr.element(index), value);
    arr.mark_element(index);
    if closure::get_info(array).kind() == ClosureKind::MutArrPtrsClean {
        closure::set_info(array, &builtin::MUT_ARR_PTRS_DIRTY);
        cap.record_mutable(array);
    }
}

/// Check that every reference in the heap leads to a live object. Returns the number of
/// objects checked; a dangling reference is fatal.
pub fn verify_heap(heap: &Heap) -> usize {
    sanity::verify_heap(heap)
}
