// Not every test uses every builder.
#![allow(dead_code)]

//! Builders for heap graphs used by the tests and the benchmarks.

use crate::object::builtin;
use crate::object::closure::{self, frame, tso, MutArrPtrs, StackChunk};
use crate::object::info::{ClosureKind, InfoTable};
use crate::storage::Heap;
use crate::util::conversions::bytes_to_words_up;
use crate::util::options::Options;
use crate::util::{Address, ObjectReference};

/// Options for a test heap: `generations` generations, one GC thread.
pub fn test_options(generations: usize) -> Options {
    let mut options = Options::new();
    options.generations = generations;
    options.threads = 1;
    options
}

pub fn test_heap(generations: usize) -> Heap {
    Heap::new(test_options(generations))
}

pub fn constr_info(name: &'static str, ptrs: u32, nptrs: u32) -> &'static InfoTable {
    InfoTable::constr(name, ptrs, nptrs).leak()
}

fn init_object(addr: Address, info: &'static InfoTable, payload: &[usize]) -> ObjectReference {
    let object = ObjectReference::from_raw_address(addr);
    closure::set_info(object, info);
    for (i, word) in payload.iter().enumerate() {
        closure::write_word(closure::field(object, closure::HEADER_WORDS + i), *word);
    }
    object
}

fn words_of(ptrs: &[ObjectReference], nptrs: &[usize]) -> Vec<usize> {
    ptrs.iter().map(|p| p.value()).chain(nptrs.iter().copied()).collect()
}

/// Allocate an object with the given payload words in generation `gen`.
pub fn alloc_object(heap: &Heap, gen: usize, info: &'static InfoTable, payload: &[usize]) -> ObjectReference {
    init_object(heap.alloc(gen, closure::HEADER_WORDS + payload.len()), info, payload)
}

/// A constructor, function or thunk: pointer fields, then non-pointer fields.
pub fn alloc_closure(
    heap: &Heap,
    gen: usize,
    info: &'static InfoTable,
    ptrs: &[ObjectReference],
    nptrs: &[usize],
) -> ObjectReference {
    assert_eq!(info.layout().ptrs as usize, ptrs.len(), "{}", info.name());
    assert_eq!(info.layout().nptrs as usize, nptrs.len(), "{}", info.name());
    alloc_object(heap, gen, info, &words_of(ptrs, nptrs))
}

/// A static closure, not on any static-object list.
pub fn alloc_static(heap: &Heap, info: &'static InfoTable, ptrs: &[ObjectReference], nptrs: &[usize]) -> ObjectReference {
    assert!(info.kind().is_static());
    assert_eq!(info.layout().ptrs as usize, ptrs.len());
    assert_eq!(info.layout().nptrs as usize, nptrs.len());
    let mut payload = words_of(ptrs, nptrs);
    payload.push(0);
    init_object(heap.alloc_static(closure::static_closure_words(info)), info, &payload)
}

pub fn static_info(kind: ClosureKind, name: &'static str, ptrs: u32) -> &'static InfoTable {
    InfoTable::static_closure(kind, name, ptrs, 0).leak()
}

/// A return-frame table whose encoding follows the heap's `small_bitmap_max_bits`.
pub fn ret_info(heap: &Heap, name: &'static str, slots: &[bool]) -> &'static InfoTable {
    InfoTable::ret(name, slots, heap.options().small_bitmap_max_bits).leak()
}

pub fn alloc_ind(heap: &Heap, gen: usize, target: ObjectReference) -> ObjectReference {
    alloc_object(heap, gen, &builtin::IND, &[target.value()])
}

pub fn alloc_mut_var(heap: &Heap, gen: usize, value: ObjectReference) -> ObjectReference {
    alloc_object(heap, gen, &builtin::MUT_VAR_CLEAN, &[value.value()])
}

/// A clean mutable array with every card clear.
pub fn alloc_mut_arr(heap: &Heap, gen: usize, elements: &[ObjectReference]) -> ObjectReference {
    let card_bits = heap.options().card_bits;
    let ptrs = elements.len();
    let card_words = MutArrPtrs::card_table_words(ptrs, card_bits);
    let mut payload = vec![ptrs, ptrs + card_words];
    payload.extend(elements.iter().map(|e| e.value()));
    payload.extend(std::iter::repeat(0).take(card_words));
    let object = alloc_object(heap, gen, &builtin::MUT_ARR_PTRS_CLEAN, &payload);
    debug_assert_eq!(
        MutArrPtrs::new(object, card_bits).end(),
        object.to_raw_address().word(MutArrPtrs::words_for(ptrs, card_bits))
    );
    object
}

pub fn alloc_arr_words(heap: &Heap, gen: usize, bytes: usize) -> ObjectReference {
    let mut payload = vec![bytes];
    payload.extend((0..bytes_to_words_up(bytes)).map(|i| 0xdead_0000 + i));
    alloc_object(heap, gen, &builtin::ARR_WORDS, &payload)
}

/// A partial application of `fun` to `args`, laid out by the function's argument bitmap.
pub fn alloc_pap(heap: &Heap, gen: usize, fun: ObjectReference, args: &[usize]) -> ObjectReference {
    let mut payload = vec![args.len(), fun.value()];
    payload.extend_from_slice(args);
    alloc_object(heap, gen, &builtin::PAP, &payload)
}

pub fn alloc_ap_stack(heap: &Heap, gen: usize, fun: ObjectReference, frames: &Frames) -> ObjectReference {
    let mut payload = vec![frames.len(), fun.value()];
    payload.extend_from_slice(frames.words());
    alloc_object(heap, gen, &builtin::AP_STACK, &payload)
}

/// A sequence of stack frames, most recent first.
#[derive(Clone, Debug, Default)]
pub struct Frames {
    words: Vec<usize>,
    count: usize,
}

impl Frames {
    pub fn new() -> Self {
        Self::default()
    }

    /// A return frame. `slots` must match the frame's bitmap in length.
    pub fn ret(mut self, info: &'static InfoTable, slots: &[usize]) -> Self {
        let bitmap = info.bitmap().expect("return frame without a bitmap");
        assert_eq!(bitmap.size(), slots.len(), "{}", info.name());
        self.words.push(info.header_word());
        self.words.extend_from_slice(slots);
        self.count += 1;
        self
    }

    pub fn update(mut self, updatee: ObjectReference) -> Self {
        self.words.extend_from_slice(&[builtin::UPDATE_FRAME.header_word(), updatee.value()]);
        self.count += 1;
        self
    }

    pub fn underflow(mut self, next_chunk: ObjectReference) -> Self {
        self.words.extend_from_slice(&[builtin::UNDERFLOW_FRAME.header_word(), next_chunk.value()]);
        self.count += 1;
        self
    }

    pub fn stop(mut self) -> Self {
        self.words.push(builtin::STOP_FRAME.header_word());
        self.count += 1;
        self
    }

    /// Words that are not a well-formed frame, for testing how corrupt stacks are handled.
    pub fn raw(mut self, words: &[usize]) -> Self {
        self.words.extend_from_slice(words);
        self.count += 1;
        self
    }

    pub fn words(&self) -> &[usize] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// A stack chunk of `stack_size` words whose bottom holds `frames`.
pub fn alloc_stack(heap: &Heap, gen: usize, stack_size: usize, frames: &Frames, dirty: bool) -> ObjectReference {
    assert!(frames.len() <= stack_size);
    let mut payload = vec![stack_size, dirty as usize, 0];
    // Unused stack space below sp.
    payload.extend(std::iter::repeat(0xbad_5ace).take(stack_size - frames.len()));
    payload.extend_from_slice(frames.words());
    let object = alloc_object(heap, gen, &builtin::STACK, &payload);
    let chunk = StackChunk::new(object);
    chunk.set_sp(chunk.stack_start().word(stack_size - frames.len()));
    object
}

pub fn alloc_tso(heap: &Heap, gen: usize, stack: ObjectReference, id: usize) -> ObjectReference {
    let mut payload = vec![0usize; tso::WORDS - 1];
    payload[tso::STACKOBJ - 1] = stack.value();
    payload[tso::ID - 1] = id;
    alloc_object(heap, gen, &builtin::TSO, &payload)
}

/// Payload word `i` of an object, as a reference.
pub fn field_ref(object: ObjectReference, i: usize) -> ObjectReference {
    closure::read_ref(closure::field(object, closure::HEADER_WORDS + i))
}

/// Payload word `i` of an object.
pub fn field_word(object: ObjectReference, i: usize) -> usize {
    closure::read_word(closure::field(object, closure::HEADER_WORDS + i))
}

pub fn set_field_ref(object: ObjectReference, i: usize, value: ObjectReference) {
    closure::write_ref(closure::field(object, closure::HEADER_WORDS + i), value)
}

pub fn kind_of(object: ObjectReference) -> ClosureKind {
    closure::get_info(object).kind()
}

/// Word `i` of a stack chunk's live frames, counted from `sp`.
pub fn stack_word(stack: ObjectReference, i: usize) -> usize {
    closure::read_word(StackChunk::new(stack).sp().word(i))
}

/// Offset of the payload of the first frame after `frames`, for reading slots with
/// [`stack_word`].
pub fn frame_payload_offset(frames: &Frames) -> usize {
    frames.len() + frame::PAYLOAD
}
