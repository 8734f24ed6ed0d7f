use crate::storage::Block;
use crate::util::ObjectReference;
use crossbeam::deque::{Injector, Steal};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Full to-space blocks waiting to be scanned, one shared queue per generation. Any worker may
/// claim a queued block; a block is scanned by exactly one worker.
pub struct TodoQueues {
    queues: Box<[Injector<Block>]>,
}

impl TodoQueues {
    pub fn new(generations: usize) -> Self {
        TodoQueues {
            queues: (0..generations).map(|_| Injector::new()).collect(),
        }
    }

    pub fn push(&self, gen: usize, block: Block) {
        self.queues[gen].push(block)
    }

    pub fn steal(&self, gen: usize) -> Option<Block> {
        loop {
            match self.queues[gen].steal() {
                Steal::Success(block) => return Some(block),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(Injector::is_empty)
    }
}

/// Saved remembered sets cut into chunks. Workers claim chunks with an atomic cursor, so every
/// entry is traced by exactly one worker.
#[derive(Default)]
pub struct MutListClaims {
    chunks: Vec<(usize, Vec<ObjectReference>)>,
    next: AtomicUsize,
}

impl MutListClaims {
    /// `lists` holds `(generation, entries)` pairs.
    pub fn new(lists: Vec<(usize, Vec<ObjectReference>)>, chunk_size: usize) -> Self {
        let mut chunks = vec![];
        for (gen, entries) in lists {
            for chunk in entries.chunks(chunk_size) {
                chunks.push((gen, chunk.to_vec()));
            }
        }
        MutListClaims {
            chunks,
            next: AtomicUsize::new(0),
        }
    }

    pub fn claim(&self) -> Option<(usize, &[ObjectReference])> {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.chunks
            .get(i)
            .map(|(gen, entries)| (*gen, entries.as_slice()))
    }

    pub fn has_unclaimed(&self) -> bool {
        self.next.load(Ordering::Relaxed) < self.chunks.len()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
