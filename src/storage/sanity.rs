//! Heap verification, run after a collection in tests and with `extreme_assertions`.

use super::block::Block;
use super::heap::Heap;
use super::linear_scan::ObjectIterator;
use crate::object::closure::{self, frame, MutArrPtrs, StackChunk};
use crate::object::info::Bitmap;
use crate::object::ClosureKind;
use crate::util::object_forwarding::{load_header, HeaderState};
use crate::util::{Address, ObjectReference};
use std::collections::HashSet;

/// Visit every pointer slot of an object, in the order the scavenger traces them.
pub fn for_each_pointer_slot<F: FnMut(Address)>(object: ObjectReference, card_bits: usize, f: &mut F) {
    let info = closure::get_info(object);
    match info.kind() {
        kind if kind.has_plain_layout() => {
            for i in 0..info.layout().ptrs as usize {
                f(closure::field(object, closure::HEADER_WORDS + i));
            }
        }
        ClosureKind::Pap | ClosureKind::Ap => {
            let fun_slot = closure::field(object, closure::PAP_FUN);
            f(fun_slot);
            let n_args = closure::read_word(closure::field(object, closure::PAP_N_ARGS));
            let fun_info = closure::get_info(closure::read_ref(fun_slot));
            if let Some(bitmap) = fun_info.bitmap() {
                for_each_bitmap_slot(closure::field(object, closure::PAP_PAYLOAD), bitmap, n_args, f);
            }
        }
        ClosureKind::ApStack => {
            f(closure::field(object, closure::AP_STACK_FUN));
            let size = closure::read_word(closure::field(object, closure::AP_STACK_SIZE));
            let payload = closure::field(object, closure::AP_STACK_PAYLOAD);
            for_each_frame_slot(payload, payload.word(size), f);
        }
        ClosureKind::Ind | ClosureKind::MutVarClean | ClosureKind::MutVarDirty => {
            f(closure::field(object, 1));
        }
        ClosureKind::MutArrPtrsClean | ClosureKind::MutArrPtrsDirty => {
            let array = MutArrPtrs::new(object, card_bits);
            for i in 0..array.ptrs() {
                f(array.element(i));
            }
        }
        ClosureKind::ArrWords => {}
        ClosureKind::Tso => {
            for offset in closure::tso::LINK_FIELDS {
                f(closure::field(object, offset));
            }
            f(closure::field(object, closure::tso::STACKOBJ));
        }
        ClosureKind::Stack => {
            let chunk = StackChunk::new(object);
            for_each_frame_slot(chunk.sp(), chunk.stack_end(), f);
        }
        kind => fatal!("Frame kind {} found as heap object {}", kind.name(), object),
    }
}

fn for_each_bitmap_slot<F: FnMut(Address)>(base: Address, bitmap: &Bitmap, n: usize, f: &mut F) {
    for i in (0..n).filter(|i| bitmap.is_pointer(*i)) {
        f(base.word(i));
    }
}

fn for_each_frame_slot<F: FnMut(Address)>(mut p: Address, end: Address, f: &mut F) {
    while p < end {
        let info = closure::get_frame_info(p);
        match info.kind() {
            ClosureKind::UpdateFrame | ClosureKind::UnderflowFrame => {
                f(p.word(frame::UPDATEE));
                p = p.word(frame::UPDATE_WORDS);
            }
            ClosureKind::StopFrame => p = p.word(frame::STOP_WORDS),
            _ => {
                let Some(bitmap) = info.bitmap() else {
                    fatal!("Return frame {} at {} has no layout", info.name(), p);
                };
                for_each_bitmap_slot(p.word(frame::PAYLOAD), bitmap, bitmap.size(), f);
                p = p.word(frame::PAYLOAD + bitmap.size());
            }
        }
    }
}

/// Checks that every pointer in the heap refers to a live, unforwarded object.
pub struct SanityChecker {
    live_blocks: HashSet<Block>,
    /// Objects checked
    checked: usize,
}

impl SanityChecker {
    pub fn new(heap: &Heap) -> Self {
        let mut live_blocks: HashSet<Block> = HashSet::new();
        for generation in heap.generations() {
            live_blocks.extend(generation.blocks());
            live_blocks.extend(generation.large_objects());
        }
        live_blocks.extend(heap.static_blocks());
        SanityChecker {
            live_blocks,
            checked: 0,
        }
    }

    fn check_target(&self, slot: Address, source: ObjectReference) {
        let target = closure::read_ref(slot);
        if target.is_null() {
            return;
        }
        let block = Block::containing(target);
        let in_live_block = self.live_blocks.contains(&block)
            && target.to_raw_address() >= block.payload_start()
            && target.to_raw_address() < block.free();
        if !in_live_block {
            fatal!("Object {} refers to {} outside the live heap (slot {})", source, target, slot);
        }
        if let state @ (HeaderState::Forwarded(_) | HeaderState::BeingForwarded) =
            HeaderState::decode(load_header(target))
        {
            fatal!("Object {} refers to {} which is {:?}", source, target, state);
        }
    }

    /// Check every object of every generation and the static area. Returns the number of
    /// objects checked.
    pub fn check(mut self, heap: &Heap) -> usize {
        let card_bits = heap.options().card_bits;
        let mut objects = vec![];
        for gen in 0..heap.n_generations() {
            objects.extend(heap.objects_in(gen));
        }
        objects.extend(heap.static_blocks().into_iter().flat_map(ObjectIterator::new));
        for object in objects {
            for_each_pointer_slot(object, card_bits, &mut |slot| self.check_target(slot, object));
            self.checked += 1;
        }
        debug!("Sanity check passed for {} objects", self.checked);
        self.checked
    }
}

/// Verify the whole heap. Dangling or forwarded references are fatal.
pub fn verify_heap(heap: &Heap) -> usize {
    SanityChecker::new(heap).check(heap)
}
