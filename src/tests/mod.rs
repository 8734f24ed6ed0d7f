// Scenario tests: whole collections over small hand-built heaps.
//
// Each test builds its own heap with the builders in `crate::util::test_util::fixtures`, runs
// one or more collections, and inspects the heap afterwards. Tests that drive a tracer by hand
// use `Collection::prepare` and `Collection::context`, and hand the remnant back to
// `Collection::finish` so the heap is consistent when it is dropped.

pub(crate) mod test_prelude {
    pub(crate) use super::{collect_n, graph_shape, random_graph, single_cap};
    pub use crate::collection::{Collection, Roots};
    pub use crate::memory_manager;
    pub use crate::object::builtin;
    pub use crate::object::closure::{self, MutArrPtrs, StackChunk, Tso};
    pub use crate::object::info::{Bitmap, ClosureKind, InfoTable, Srt};
    pub use crate::storage::{Capability, Heap};
    pub use crate::util::statistics::ScavengeStats;
    pub use crate::util::test_util::fixtures::*;
    pub use crate::util::test_util::panic_after;
    pub use crate::util::ObjectReference;
}

mod cards;
mod corruption;
mod remembered_set;

use crate::object::closure;
use crate::object::info::{Bitmap, InfoTable};
use crate::storage::sanity::for_each_pointer_slot;
use crate::storage::{Capability, Heap};
use crate::util::statistics::ScavengeStats;
use crate::util::test_util::fixtures::*;
use crate::util::{Address, ObjectReference};
use crate::{memory_manager, Roots};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, VecDeque};

pub(crate) fn single_cap(heap: &Heap) -> Vec<Capability> {
    vec![Capability::new(0, heap.n_generations())]
}

/// Collect generations `0..=collect_gen` of `heap` from closure roots on `workers` threads.
pub(crate) fn collect_n(
    heap: &Heap,
    collect_gen: usize,
    roots: &mut [ObjectReference],
    caps: &mut [Capability],
    workers: usize,
) -> ScavengeStats {
    memory_manager::collect_with_workers(heap, collect_gen, Roots::closures(roots), caps, workers)
}

static NODES: [InfoTable; 4] = [
    InfoTable::constr("Node0", 0, 1),
    InfoTable::constr("Node1", 1, 1),
    InfoTable::constr("Node2", 2, 1),
    InfoTable::constr("Node3", 3, 1),
];
static SUSPENSION: InfoTable = InfoTable::thunk("suspension", 1, 1);
// Pointer, non-pointer.
static APPLY2: InfoTable = InfoTable::fun("apply2", 0, 0).with_bitmap(Bitmap::small(2, 0b01));

/// A random graph of `n` objects in the nursery, with cycles. Returns the roots.
///
/// The shape depends only on `seed`, so two heaps built from the same seed hold isomorphic
/// graphs.
pub(crate) fn random_graph(heap: &Heap, seed: u64, n: usize) -> Vec<ObjectReference> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let apply = alloc_closure(heap, 0, &APPLY2, &[], &[]);
    let mut objects: Vec<ObjectReference> = vec![apply];
    for id in 0..n {
        let pick = |rng: &mut ChaCha8Rng| objects[rng.random_range(0..objects.len())];
        let object = match rng.random_range(0..10) {
            0..=4 => {
                let ptrs = rng.random_range(0..4usize);
                let fields: Vec<ObjectReference> = (0..ptrs).map(|_| pick(&mut rng)).collect();
                alloc_closure(heap, 0, &NODES[ptrs], &fields, &[id])
            }
            5 => {
                let value = pick(&mut rng);
                alloc_mut_var(heap, 0, value)
            }
            6 => {
                let target = pick(&mut rng);
                alloc_ind(heap, 0, target)
            }
            7 => {
                let len = rng.random_range(0..20);
                let elements: Vec<ObjectReference> = (0..len).map(|_| pick(&mut rng)).collect();
                alloc_mut_arr(heap, 0, &elements)
            }
            8 => alloc_arr_words(heap, 0, rng.random_range(0..64)),
            _ => {
                if rng.random_bool(0.5) {
                    let arg = pick(&mut rng);
                    alloc_pap(heap, 0, apply, &[arg.value(), id])
                } else {
                    let arg = pick(&mut rng);
                    alloc_closure(heap, 0, &SUSPENSION, &[arg], &[id])
                }
            }
        };
        objects.push(object);
    }
    // Back edges make cycles.
    for _ in 0..n / 4 {
        let from = objects[rng.random_range(0..objects.len())];
        let to = objects[rng.random_range(0..objects.len())];
        let info = closure::get_info(from);
        if info.kind().has_plain_layout() && info.layout().ptrs > 0 {
            set_field_ref(from, 0, to);
        }
    }
    let mut roots: Vec<ObjectReference> = objects
        .iter()
        .copied()
        .filter(|_| rng.random_bool(0.05))
        .collect();
    roots.push(objects[objects.len() - 1]);
    roots
}

/// Walk the graphs reachable from two root sets in step and check that they have the same
/// shape: same kinds, same non-pointer words, and pointers that correspond one to one.
/// Returns the number of distinct objects reached.
pub(crate) fn graph_shape(a: (&Heap, &[ObjectReference]), b: (&Heap, &[ObjectReference])) -> usize {
    let (heap_a, roots_a) = a;
    let (heap_b, roots_b) = b;
    assert_eq!(roots_a.len(), roots_b.len());
    let mut pairs: HashMap<ObjectReference, ObjectReference> = HashMap::new();
    let mut queue: VecDeque<(ObjectReference, ObjectReference)> =
        roots_a.iter().copied().zip(roots_b.iter().copied()).collect();
    let mut visited = 0;
    while let Some((x, y)) = queue.pop_front() {
        assert_eq!(x.is_null(), y.is_null());
        if x.is_null() {
            continue;
        }
        if let Some(&seen) = pairs.get(&x) {
            assert_eq!(seen, y, "{} reached as two different objects", x);
            continue;
        }
        pairs.insert(x, y);
        visited += 1;

        let info_x = closure::get_info(x);
        let info_y = closure::get_info(y);
        assert_eq!(info_x.kind(), info_y.kind());
        assert_eq!(heap_a.generation_of(x), heap_b.generation_of(y));
        let size = closure::closure_size(x, info_x);
        assert_eq!(size, closure::closure_size(y, info_y));

        let mut slots_x = vec![];
        for_each_pointer_slot(x, heap_a.options().card_bits, &mut |slot| slots_x.push(slot.words_from(x.to_raw_address())));
        let mut slots_y = vec![];
        for_each_pointer_slot(y, heap_b.options().card_bits, &mut |slot| slots_y.push(slot.words_from(y.to_raw_address())));
        assert_eq!(slots_x, slots_y);

        for i in 0..size {
            let word_x = closure::read_word(x.to_raw_address().word(i));
            let word_y = closure::read_word(y.to_raw_address().word(i));
            if slots_x.contains(&i) {
                queue.push_back((
                    ObjectReference::from_raw_address(unsafe { Address::from_usize(word_x) }),
                    ObjectReference::from_raw_address(unsafe { Address::from_usize(word_y) }),
                ));
            } else {
                assert_eq!(word_x, word_y, "word {} of {} and {}", i, x, y);
            }
        }
    }
    visited
}

#[test]
fn random_graphs_are_reproducible() {
    let heap_a = test_heap(2);
    let heap_b = test_heap(2);
    let roots_a = random_graph(&heap_a, 7, 300);
    let roots_b = random_graph(&heap_b, 7, 300);
    assert!(graph_shape((&heap_a, &roots_a), (&heap_b, &roots_b)) > 1);
    assert_eq!(
        heap_a.generation(0).live_words(),
        heap_b.generation(0).live_words()
    );
}
