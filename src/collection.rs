//! One collection of generations `0..=N`, from flipping the from-space to handing the
//! survivors back to their generations.

use crate::scavenge::{
    reset_static_links, GcCycle, ScavengeContext, Sequential, WorkerRemnant, END_OF_STATIC_LIST,
};
use crate::scheduler::termination::TerminationBarrier;
use crate::scheduler::work_queues::MutListClaims;
use crate::scheduler::worker::{self, WorkerRoots};
use crate::storage::{Block, BlockFlags, Capability, Heap};
use crate::util::statistics::ScavengeStats;
use crate::util::ObjectReference;

/// The roots of a collection: thread objects and other closures held outside the heap. Each
/// slot is updated to where its object lives after the collection.
pub struct Roots<'r> {
    pub threads: &'r mut [ObjectReference],
    pub closures: &'r mut [ObjectReference],
}

impl<'r> Roots<'r> {
    pub fn new(threads: &'r mut [ObjectReference], closures: &'r mut [ObjectReference]) -> Self {
        Roots { threads, closures }
    }

    pub fn closures(closures: &'r mut [ObjectReference]) -> Self {
        Roots {
            threads: &mut [],
            closures,
        }
    }
}

pub struct Collection<'h> {
    heap: &'h Heap,
    cycle: GcCycle,
}

impl<'h> Collection<'h> {
    /// Start a collection of generations `0..=collect_gen`: their blocks become the
    /// from-space, and the remembered sets of older generations are set aside for tracing.
    pub fn prepare(heap: &'h Heap, collect_gen: usize, caps: &mut [Capability]) -> Self {
        assert!(
            collect_gen < heap.n_generations(),
            "Cannot collect generation {} of a {}-generation heap",
            collect_gen,
            heap.n_generations()
        );
        assert!(!caps.is_empty(), "A collection needs at least one capability");
        let major = collect_gen == heap.oldest_generation();
        for gen in 0..=collect_gen {
            heap.generation(gen).flip();
        }
        for cap in caps.iter_mut() {
            cap.save_mut_lists(collect_gen);
        }
        info!(
            "{} collection of generations 0..={} started",
            if major { "Major" } else { "Minor" },
            collect_gen
        );
        Collection {
            heap,
            cycle: GcCycle::new(collect_gen, major, heap.n_generations()),
        }
    }

    pub fn cycle(&self) -> &GcCycle {
        &self.cycle
    }

    /// A sequential scavenger for driving the collection by hand. Pass its remnant to
    /// [`Collection::finish`].
    pub fn context(&self) -> ScavengeContext<'_, Sequential> {
        ScavengeContext::new(self.heap, &self.cycle, 0)
    }

    /// Run the whole collection on the calling thread.
    pub fn run_sequential(self, roots: Roots, caps: &mut [Capability]) -> ScavengeStats {
        let Roots { threads, closures } = roots;
        let remnant = {
            let mut cx = self.context();
            for thread in threads.iter_mut() {
                cx.scavenge_thread_root(thread);
            }
            for closure in closures.iter_mut() {
                cx.evacuate_root(closure);
            }
            for cap in caps.iter_mut() {
                cx.scavenge_capability_mut_lists(cap);
            }
            cx.scavenge_loop();
            cx.into_remnant()
        };
        self.finish(vec![remnant], caps)
    }

    /// Run the collection on `workers` GC threads.
    pub fn run_parallel(mut self, roots: Roots, caps: &mut [Capability], workers: usize) -> ScavengeStats {
        assert!(workers > 0);
        let collect_gen = self.cycle.collect_gen();
        let mut lists = vec![];
        for cap in caps.iter_mut() {
            for gen in (collect_gen + 1)..self.heap.n_generations() {
                let list = cap.take_saved_mut_list(gen);
                if !list.is_empty() {
                    lists.push((gen, list.into_vec()));
                }
            }
        }
        self.cycle.mut_list_claims = MutListClaims::new(lists, self.heap.options().mut_list_chunk);
        self.cycle.termination = TerminationBarrier::new(workers);

        let heap = self.heap;
        let cycle = &self.cycle;
        let threads = worker::split_for_workers(roots.threads, workers);
        let closures = worker::split_for_workers(roots.closures, workers);
        let remnants = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = threads
                .into_iter()
                .zip(closures)
                .enumerate()
                .map(|(ordinal, (threads, closures))| {
                    s.builder()
                        .name(format!("scavenger-worker-{}", ordinal))
                        .spawn(move |_| {
                            worker::run(heap, cycle, ordinal, WorkerRoots { threads, closures })
                        })
                        .unwrap_or_else(|e| panic!("Failed to spawn GC worker {}: {}", ordinal, e))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Vec<WorkerRemnant>>()
        })
        .unwrap_or_else(|e| std::panic::resume_unwind(e));
        self.finish(remnants, caps)
    }

    /// End the collection: check that the scavenge reached its fixed point, free the
    /// from-space, give the to-space to its generations, reset the static links and merge the
    /// workers' remembered objects into the capabilities.
    pub fn finish(self, remnants: Vec<WorkerRemnant>, caps: &mut [Capability]) -> ScavengeStats {
        let heap = self.heap;
        let collect_gen = self.cycle.collect_gen();
        if !self.cycle.todo.is_empty() || self.cycle.mut_list_claims.has_unclaimed() {
            fatal!("Collection finished with work left in the shared queues");
        }

        let workers = remnants.len();
        let mut stats = ScavengeStats::default();
        let mut to_space: Vec<(Vec<Block>, Vec<Block>)> = vec![(vec![], vec![]); heap.n_generations()];
        for remnant in remnants {
            if remnant.pending_static_objects != END_OF_STATIC_LIST {
                fatal!("Worker {} left static closures unscanned", remnant.ordinal);
            }
            for ws in remnant.workspaces {
                if ws.has_work() {
                    fatal!(
                        "Worker {} left unscanned objects in generation {}",
                        remnant.ordinal,
                        ws.gen_no
                    );
                }
                let (blocks, large) = &mut to_space[ws.gen_no];
                blocks.extend(ws.scavenged);
                blocks.extend(ws.todo_block);
                large.extend(ws.scavenged_large);
            }
            let statics = reset_static_links(remnant.scavenged_static_objects);
            trace!("Worker {} reset {} static links", remnant.ordinal, statics);

            let cap = &mut caps[remnant.ordinal % caps.len()];
            for (gen, objects) in remnant.remembered.into_iter().enumerate() {
                for object in objects {
                    cap.record_mutable_in(object, gen);
                }
            }
            stats += &remnant.stats;
        }

        // Unclaimed large objects are dead. Claimed ones are owned by a worker's to-space now.
        for gen in 0..=collect_gen {
            let (blocks, large) = heap.generation(gen).take_from_space();
            for block in blocks {
                heap.free_group(block);
            }
            for block in large.into_iter().filter(|b| !b.has_flag(BlockFlags::EVACUATED)) {
                heap.free_group(block);
            }
        }
        for (gen, (blocks, large)) in to_space.into_iter().enumerate() {
            for block in blocks.iter().chain(large.iter()) {
                debug_assert!(block.is_scanned(), "{:?} was not fully scanned", block);
                block.clear_flag(BlockFlags::EVACUATED);
            }
            heap.generation(gen).adopt(blocks, large);
        }

        #[cfg(feature = "extreme_assertions")]
        crate::storage::sanity::verify_heap(heap);

        stats.log_summary(collect_gen, workers);
        info!(
            "Collection of generations 0..={} finished, {} blocks in use",
            collect_gen,
            heap.blocks_in_use()
        );
        stats
    }
}
