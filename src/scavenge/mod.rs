//! The scavenger: the scan loop and the tracers that turn a set of evacuated roots into a
//! complete to-space.
//!
//! A [`ScavengeContext`] is the state of one GC thread for one collection. It is generic over
//! a [`ScavengeMode`] so that the same tracers serve the sequential and the parallel scavenger.

mod evacuate;
pub mod mode;
mod mut_arr;
mod mut_list;
mod object;
mod scan_loop;
mod srt;
mod stack;
mod static_objects;
pub(crate) mod workspace;

pub use mode::{Parallel, ScavengeMode, Sequential};
pub(crate) use static_objects::{reset_static_links, END_OF_STATIC_LIST};

use crate::scheduler::termination::TerminationBarrier;
use crate::scheduler::work_queues::{MutListClaims, TodoQueues};
use crate::storage::Heap;
use crate::util::statistics::ScavengeStats;
use crate::util::ObjectReference;
use std::marker::PhantomData;
use std::time::Instant;
use workspace::GenWorkspace;

/// State shared by every worker of one collection.
pub struct GcCycle {
    collect_gen: usize,
    major: bool,
    pub(crate) todo: TodoQueues,
    pub(crate) mut_list_claims: MutListClaims,
    pub(crate) termination: TerminationBarrier,
}

impl GcCycle {
    pub(crate) fn new(collect_gen: usize, major: bool, generations: usize) -> Self {
        GcCycle {
            collect_gen,
            major,
            todo: TodoQueues::new(generations),
            mut_list_claims: MutListClaims::default(),
            termination: TerminationBarrier::new(1),
        }
    }

    /// The oldest generation being collected.
    pub fn collect_gen(&self) -> usize {
        self.collect_gen
    }

    /// Is every generation being collected?
    pub fn is_major(&self) -> bool {
        self.major
    }

    /// Is there work that an idle worker could claim?
    pub(crate) fn has_claimable_work(&self) -> bool {
        !self.todo.is_empty() || self.mut_list_claims.has_unclaimed()
    }
}

/// What a worker leaves behind when its scavenge is over.
#[derive(Debug)]
pub struct WorkerRemnant {
    pub(crate) ordinal: usize,
    pub(crate) workspaces: Vec<GenWorkspace>,
    pub(crate) pending_static_objects: usize,
    pub(crate) scavenged_static_objects: usize,
    pub(crate) remembered: Vec<Vec<ObjectReference>>,
    pub(crate) stats: ScavengeStats,
}

/// The state of one GC thread during one collection.
pub struct ScavengeContext<'c, M: ScavengeMode> {
    heap: &'c Heap,
    cycle: &'c GcCycle,
    ordinal: usize,
    workspaces: Vec<GenWorkspace>,
    /// Objects referenced from what is being scanned must end up in this generation or an
    /// older one.
    evac_gen: usize,
    /// Set when an object could not be moved to `evac_gen`: the object being scanned keeps a
    /// pointer into a younger generation.
    failed_to_evac: bool,
    eager_promotion: bool,
    card_bits: usize,
    /// Widest frame layout that may use the one-word bitmap encoding.
    small_bitmap_max_bits: usize,
    /// The block the scan loop is walking, if any.
    scan_block: Option<crate::storage::Block>,
    static_objects: usize,
    scavenged_static_objects: usize,
    /// Objects found to point into younger generations, by generation.
    remembered: Vec<Vec<ObjectReference>>,
    stats: ScavengeStats,
    started: Instant,
    _mode: PhantomData<M>,
}

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    pub(crate) fn new(heap: &'c Heap, cycle: &'c GcCycle, ordinal: usize) -> Self {
        let generations = heap.n_generations();
        ScavengeContext {
            heap,
            cycle,
            ordinal,
            workspaces: (0..generations).map(GenWorkspace::new).collect(),
            evac_gen: 0,
            failed_to_evac: false,
            eager_promotion: heap.options().eager_promotion,
            card_bits: heap.options().card_bits,
            small_bitmap_max_bits: heap.options().small_bitmap_max_bits,
            scan_block: None,
            static_objects: END_OF_STATIC_LIST,
            scavenged_static_objects: END_OF_STATIC_LIST,
            remembered: vec![vec![]; generations],
            stats: ScavengeStats::default(),
            started: Instant::now(),
            _mode: PhantomData,
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn stats(&self) -> &ScavengeStats {
        &self.stats
    }

    /// Did the tracing since the last reset leave a pointer into a younger generation behind?
    pub fn failed_to_evac(&self) -> bool {
        self.failed_to_evac
    }

    /// Trace what is referenced from the current object as if it lived in `gen`.
    pub fn set_evac_gen(&mut self, gen: usize) {
        self.evac_gen = gen;
    }

    fn note_generation(&mut self, gen: usize) {
        if gen < self.evac_gen {
            self.failed_to_evac = true;
        }
    }

    /// Record an object of generation `gen` as pointing into a younger generation.
    fn remember(&mut self, object: ObjectReference, gen: usize) {
        if gen > 0 {
            self.remembered[gen].push(object);
            self.stats.objects_remembered += 1;
        }
    }

    /// Is any scanning work left in this worker's workspaces?
    pub fn has_local_work(&self) -> bool {
        self.workspaces.iter().any(GenWorkspace::has_work)
            || self.static_objects != END_OF_STATIC_LIST
    }

    pub(crate) fn note_idle_round(&mut self) {
        self.stats.idle_rounds += 1;
    }

    /// End this worker's part of the collection.
    pub fn into_remnant(mut self) -> WorkerRemnant {
        self.stats.elapsed = self.started.elapsed();
        WorkerRemnant {
            ordinal: self.ordinal,
            workspaces: self.workspaces,
            pending_static_objects: self.static_objects,
            scavenged_static_objects: self.scavenged_static_objects,
            remembered: self.remembered,
            stats: self.stats,
        }
    }
}
