use criterion::{BatchSize, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scavenger::memory_manager;
use scavenger::object::InfoTable;
use scavenger::util::test_util::fixtures::*;
use scavenger::{Capability, Heap, ObjectReference, Roots};

const OBJECTS: usize = 200_000;

static NODES: [InfoTable; 3] = [
    InfoTable::constr("Node0", 0, 1),
    InfoTable::constr("Node1", 1, 1),
    InfoTable::constr("Node2", 2, 1),
];

/// A nursery full of a random DAG, about half of it reachable.
fn nursery(workers: usize) -> (Heap, Vec<ObjectReference>) {
    let mut options = test_options(2);
    options.threads = workers;
    let heap = Heap::new(options);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut objects: Vec<ObjectReference> = Vec::with_capacity(OBJECTS);
    for id in 0..OBJECTS {
        let ptrs = if objects.is_empty() { 0 } else { rng.random_range(0..3) };
        let fields: Vec<ObjectReference> = (0..ptrs)
            .map(|_| objects[rng.random_range(0..objects.len())])
            .collect();
        objects.push(alloc_closure(&heap, 0, &NODES[ptrs], &fields, &[id]));
    }
    let roots = objects.iter().copied().filter(|_| rng.random_bool(0.01)).collect();
    (heap, roots)
}

fn collect(heap: Heap, mut roots: Vec<ObjectReference>, workers: usize) -> usize {
    let mut caps = vec![Capability::new(0, heap.n_generations())];
    let stats = memory_manager::collect_with_workers(&heap, 0, Roots::closures(&mut roots), &mut caps, workers);
    stats.objects_copied
}

pub fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("minor_gc_random_dag");
    group.sample_size(10);
    for workers in [1, 2, 4] {
        group.bench_function(format!("{}_workers", workers), |b| {
            b.iter_batched(
                || nursery(workers),
                |(heap, roots)| collect(heap, roots, workers),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}
