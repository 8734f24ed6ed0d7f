use criterion::{BatchSize, Criterion};
use scavenger::memory_manager;
use scavenger::util::test_util::fixtures::*;
use scavenger::{Capability, Heap, ObjectReference};

const ARRAYS: usize = 64;
const ELEMENTS: usize = 4096;

/// Old arrays on the remembered set, each with a single freshly written element.
fn sparse_writes() -> (Heap, Vec<Capability>) {
    let heap = test_heap(2);
    let mut caps = vec![Capability::new(0, 2)];
    let filler = alloc_closure(&heap, 1, constr_info("Old", 0, 1), &[], &[0]);
    let young = constr_info("Young", 0, 1);
    for i in 0..ARRAYS {
        let array = alloc_mut_arr(&heap, 1, &[filler; ELEMENTS]);
        let value = alloc_closure(&heap, 0, young, &[], &[i]);
        memory_manager::mut_arr_write(&heap, &mut caps[0], array, (i * 97) % ELEMENTS, value);
    }
    (heap, caps)
}

pub fn bench(c: &mut Criterion) {
    c.bench_function("remembered_card_marked_arrays", |b| {
        b.iter_batched(
            sparse_writes,
            |(heap, mut caps)| {
                let mut roots: [ObjectReference; 0] = [];
                let stats = memory_manager::collect_with_workers(
                    &heap,
                    0,
                    scavenger::Roots::closures(&mut roots),
                    &mut caps,
                    1,
                );
                stats.cards_scanned
            },
            BatchSize::LargeInput,
        )
    });
}
