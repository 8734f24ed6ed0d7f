//! The scan loop: scan to-space until no worker can find anything left to scan.

use super::{ScavengeContext, ScavengeMode};
use crate::object::closure;
use crate::storage::Block;
use crate::util::ObjectReference;

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Scan until this worker has no work left: pending static closures, to-space blocks with
    /// unscanned objects, claimed large objects, and (in a parallel collection) blocks queued
    /// by other workers. Older generations are looked at first, and every pass starts over from
    /// the oldest one, since scanning a young block can fill an older one.
    pub fn scavenge_loop(&mut self) {
        loop {
            if self.cycle.is_major() && self.has_pending_statics() {
                self.scavenge_static();
            }
            if !self.scavenge_find_work() {
                break;
            }
        }
        debug_assert!(!self.has_local_work());
    }

    /// Do one unit of work. Returns false if there was none.
    fn scavenge_find_work(&mut self) -> bool {
        for gen in (0..self.workspaces.len()).rev() {
            let ws = &mut self.workspaces[gen];
            if let Some(block) = ws.todo_block.filter(|b| !b.is_scanned()) {
                self.scavenge_block(block);
                return true;
            }
            if let Some(block) = ws.todo_large.pop() {
                self.scavenge_large(block);
                return true;
            }
            if let Some(block) = ws.todo_q.pop() {
                self.scavenge_block(block);
                return true;
            }
        }
        if M::PARALLEL && self.heap.options().work_stealing {
            for gen in (0..self.workspaces.len()).rev() {
                if let Some(block) = self.cycle.todo.steal(gen) {
                    self.stats.blocks_claimed += 1;
                    self.scavenge_block(block);
                    return true;
                }
            }
        }
        false
    }

    /// Scan a to-space block from its scan pointer up to its free pointer. The free pointer may
    /// advance while the block is scanned, if the block is also being copied into.
    fn scavenge_block(&mut self, block: Block) {
        let gen = block.gen_no();
        let saved_evac_gen = self.evac_gen;
        self.evac_gen = gen;
        self.scan_block = Some(block);
        let mut p = block.scan();
        while p < block.free() {
            let object = ObjectReference::from_raw_address(p);
            self.failed_to_evac = false;
            let size = self.scavenge_object(object);
            if self.failed_to_evac {
                self.failed_to_evac = false;
                self.remember(object, gen);
            }
            p = p.word(size);
            block.set_scan(p);
        }
        if p != block.free() {
            fatal!("Scan of {:?} ended at {}, past its free pointer {}", block, p, block.free());
        }
        self.scan_block = None;
        self.evac_gen = saved_evac_gen;
        self.stats.blocks_scanned += 1;
        if self.workspaces[gen].todo_block != Some(block) {
            self.workspaces[gen].scavenged.push(block);
        }
    }

    /// Scan a large object claimed by this worker.
    fn scavenge_large(&mut self, block: Block) {
        let gen = block.gen_no();
        let object = ObjectReference::from_raw_address(block.payload_start());
        let saved_evac_gen = self.evac_gen;
        self.evac_gen = gen;
        self.failed_to_evac = false;
        let size = self.scavenge_object(object);
        debug_assert_eq!(size, closure::closure_size(object, closure::get_info(object)));
        if self.failed_to_evac {
            self.failed_to_evac = false;
            self.remember(object, gen);
        }
        block.set_scan(block.free());
        self.evac_gen = saved_evac_gen;
        self.workspaces[gen].scavenged_large.push(block);
    }
}
