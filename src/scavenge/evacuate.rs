//! Evacuation: moving a reachable object out of the from-space and redirecting the reference.

use super::{ScavengeContext, ScavengeMode};
use crate::object::closure::{self, StackChunk};
use crate::object::{ClosureKind, InfoTable};
use crate::storage::{Block, BlockFlags};
use crate::util::object_forwarding::{self, HeaderState};
use crate::util::{Address, ObjectReference};

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Evacuate the object referenced from `slot` and update the slot.
    pub fn evacuate(&mut self, slot: Address) {
        let object = closure::read_ref(slot);
        let new_object = self.evacuate_object(object);
        if new_object != object {
            closure::write_ref(slot, new_object);
        }
    }

    /// Evacuate a root held outside the heap.
    pub fn evacuate_root(&mut self, root: &mut ObjectReference) {
        *root = self.evacuate_object(*root);
    }

    /// Make sure `object` survives the collection and return where it lives now.
    ///
    /// Objects outside the collected generations stay put. Objects of a collected generation
    /// are copied once into their destination generation (or `evac_gen`, if that is older and
    /// eager promotion is on). Large objects are relinked rather than copied. Indirections are
    /// short-circuited. Whenever the result ends up younger than `evac_gen`, `failed_to_evac`
    /// is set.
    pub fn evacuate_object(&mut self, mut object: ObjectReference) -> ObjectReference {
        loop {
            if object.is_null() {
                return object;
            }
            let block = Block::containing(object);
            let flags = block.flags();
            if flags.contains(BlockFlags::STATIC) {
                if self.cycle.is_major() {
                    self.keep_static_alive(object);
                }
                return object;
            }
            if flags.contains(BlockFlags::EVACUATED) || block.gen_no() > self.cycle.collect_gen() {
                self.note_generation(block.gen_no());
                return object;
            }
            if flags.contains(BlockFlags::LARGE) {
                self.evacuate_large(object, block);
                return object;
            }

            let header = object_forwarding::load_header(object);
            match HeaderState::decode(header) {
                HeaderState::Forwarded(new_object) => {
                    self.note_generation(Block::containing(new_object).gen_no());
                    return new_object;
                }
                HeaderState::BeingForwarded => {
                    let new_object = object_forwarding::spin_and_get_forwarded_object(object);
                    self.note_generation(Block::containing(new_object).gen_no());
                    return new_object;
                }
                HeaderState::Info(word) => {
                    let info = InfoTable::from_header(word);
                    match info.kind() {
                        ClosureKind::Ind => {
                            object = closure::read_ref(closure::field(object, closure::IND_INDIRECTEE));
                        }
                        kind if kind.is_frame() || kind.is_static() => fatal!(
                            "evacuate: object {} of kind {} found in heap block {:?}",
                            object,
                            kind.name(),
                            block
                        ),
                        _ => return self.copy(object, header, info, block),
                    }
                }
            }
        }
    }

    /// Does `object` need no evacuation (any more) in this collection?
    ///
    /// True for null and static references, objects outside the collected generations or in
    /// to-space, claimed large objects, and objects that have been (or are being) forwarded.
    pub fn is_evacuated(&self, object: ObjectReference) -> bool {
        if object.is_null() {
            return true;
        }
        let block = Block::containing(object);
        let flags = block.flags();
        if flags.intersects(BlockFlags::STATIC | BlockFlags::EVACUATED) || block.gen_no() > self.cycle.collect_gen() {
            return true;
        }
        !flags.contains(BlockFlags::LARGE) && object_forwarding::is_forwarded_or_being_forwarded(object)
    }

    /// The generation a survivor of `block` goes to, honouring `evac_gen`.
    fn target_generation(&mut self, block: Block) -> usize {
        let gen = block.dest_no();
        if gen < self.evac_gen {
            if self.eager_promotion {
                return self.evac_gen;
            }
            self.failed_to_evac = true;
        }
        gen
    }

    fn copy(
        &mut self,
        object: ObjectReference,
        header: usize,
        info: &'static InfoTable,
        block: Block,
    ) -> ObjectReference {
        if M::PARALLEL {
            if let Err(observed) = object_forwarding::attempt_to_forward(object, header) {
                let new_object = match HeaderState::decode(observed) {
                    HeaderState::Forwarded(new_object) => new_object,
                    HeaderState::BeingForwarded => {
                        object_forwarding::spin_and_get_forwarded_object(object)
                    }
                    HeaderState::Info(word) => fatal!(
                        "Header of {} changed from {:#x} to {:#x} during evacuation",
                        object,
                        header,
                        word
                    ),
                };
                self.note_generation(Block::containing(new_object).gen_no());
                return new_object;
            }
        }

        let size = closure::closure_size(object, info);
        let gen = self.target_generation(block);
        let to = self.alloc_for_copy(gen, size);
        unsafe {
            std::ptr::copy_nonoverlapping(
                object.to_raw_address().to_ptr::<usize>(),
                to.to_mut_ptr::<usize>(),
                size,
            );
        }
        let new_object = ObjectReference::from_raw_address(to);
        if M::PARALLEL {
            // The copy picked up the claim marker from the from-space header.
            object_forwarding::store_header(new_object, header);
        }
        if info.kind() == ClosureKind::Stack {
            StackChunk::new(new_object).relocate_sp(StackChunk::new(object));
        }
        object_forwarding::forward_object(object, new_object);
        self.stats.objects_copied += 1;
        self.stats.words_copied += size;
        new_object
    }

    /// Large objects stay where they are: the group is claimed, moved to its target generation
    /// and queued for scanning.
    fn evacuate_large(&mut self, object: ObjectReference, block: Block) {
        if block.set_flag(BlockFlags::EVACUATED) {
            // Another worker claimed it first.
            self.note_generation(block.gen_no());
            return;
        }
        let gen = self.target_generation(block);
        block.set_gen_no(gen);
        block.set_dest_no(self.heap.generation(gen).to());
        trace!("evacuate_large({}) into generation {}", object, gen);
        self.workspaces[gen].todo_large.push(block);
        self.stats.large_objects_promoted += 1;
    }

    /// Bump-allocate `words` words in this worker's to-space for generation `gen`.
    fn alloc_for_copy(&mut self, gen: usize, words: usize) -> Address {
        if let Some(addr) = self.workspaces[gen].todo_block.and_then(|b| b.alloc(words)) {
            return addr;
        }
        self.retire_todo_block(gen);
        let block = self.heap.alloc_to_space_block(gen);
        self.workspaces[gen].todo_block = Some(block);
        match block.alloc(words) {
            Some(addr) => addr,
            None => fatal!("Object of {} words does not fit a to-space block", words),
        }
    }

    /// The todo block of `gen` is full. Hand it on to whoever must scan the rest of it.
    fn retire_todo_block(&mut self, gen: usize) {
        let Some(block) = self.workspaces[gen].todo_block.take() else {
            return;
        };
        // A block the scan loop is walking is disposed of by the scan loop.
        if self.scan_block == Some(block) {
            return;
        }
        if block.is_scanned() {
            self.workspaces[gen].scavenged.push(block);
        } else if M::PARALLEL && self.heap.options().work_stealing {
            self.cycle.todo.push(gen, block);
        } else {
            self.workspaces[gen].todo_q.push(block);
        }
    }
}
