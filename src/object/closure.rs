//! Closure layouts and field access.
//!
//! Every heap closure starts with a one-word header holding its info pointer (or forwarding
//! state, see [`crate::util::object_forwarding`]). The payload that follows depends on the kind:
//!
//! | kind                         | payload (word offsets from the header)                          |
//! |------------------------------|-----------------------------------------------------------------|
//! | constr / fun / thunk         | `ptrs` pointers, then `nptrs` plain words                        |
//! | static closures              | as above, then the static link word                             |
//! | PAP / AP                     | `1: n_args`, `2: fun`, `3..: args`                               |
//! | AP_STACK                     | `1: size`, `2: fun`, `3..: size words of captured frames`        |
//! | IND                          | `1: indirectee`                                                 |
//! | MUT_VAR                      | `1: var`                                                        |
//! | MUT_ARR_PTRS                 | `1: ptrs`, `2: size`, `3..: elements`, then the card bytes      |
//! | ARR_WORDS                    | `1: bytes`, `2..: data`                                         |
//! | TSO                          | see [`tso`]                                                     |
//! | STACK                        | `1: stack_size`, `2: dirty`, `3: sp`, `4..: stack words`        |
//!
//! Stack frames start with their info pointer too. Frames grow downwards, so the most recent
//! frame sits at `sp` and older frames follow at higher addresses up to the stack end.

use super::info::{ClosureKind, InfoTable};
use crate::util::constants::*;
use crate::util::conversions::bytes_to_words_up;
use crate::util::object_forwarding::{load_header, store_header, HeaderState};
use crate::util::{Address, ObjectReference};

pub const HEADER_WORDS: usize = 1;

pub const PAP_N_ARGS: usize = 1;
pub const PAP_FUN: usize = 2;
pub const PAP_PAYLOAD: usize = 3;

pub const AP_STACK_SIZE: usize = 1;
pub const AP_STACK_FUN: usize = 2;
pub const AP_STACK_PAYLOAD: usize = 3;

pub const IND_INDIRECTEE: usize = 1;
pub const MUT_VAR_VAR: usize = 1;

pub const MUT_ARR_PTRS: usize = 1;
pub const MUT_ARR_SIZE: usize = 2;
pub const MUT_ARR_PAYLOAD: usize = 3;

pub const ARR_WORDS_BYTES: usize = 1;
pub const ARR_WORDS_PAYLOAD: usize = 2;

/// TSO field offsets.
pub mod tso {
    pub const STACKOBJ: usize = 1;
    pub const LINK: usize = 2;
    pub const BLOCK_INFO: usize = 3;
    pub const BLOCKED_EXCEPTIONS: usize = 4;
    pub const BQ: usize = 5;
    pub const WHAT_NEXT: usize = 6;
    pub const ID: usize = 7;
    pub const DIRTY: usize = 8;
    pub const WORDS: usize = 9;
    /// The pointer fields apart from the stack.
    pub const LINK_FIELDS: [usize; 4] = [BLOCKED_EXCEPTIONS, BQ, BLOCK_INFO, LINK];
}

pub const STACK_SIZE: usize = 1;
pub const STACK_DIRTY: usize = 2;
pub const STACK_SP: usize = 3;
pub const STACK_PAYLOAD: usize = 4;

/// Frame field offsets.
pub mod frame {
    pub const INFO: usize = 0;
    pub const PAYLOAD: usize = 1;
    pub const UPDATEE: usize = 1;
    pub const NEXT_CHUNK: usize = 1;
    pub const UPDATE_WORDS: usize = 2;
    pub const UNDERFLOW_WORDS: usize = 2;
    pub const STOP_WORDS: usize = 1;
}

pub fn read_word(addr: Address) -> usize {
    unsafe { addr.load::<usize>() }
}

pub fn write_word(addr: Address, value: usize) {
    unsafe { addr.store::<usize>(value) }
}

pub fn read_ref(slot: Address) -> ObjectReference {
    ObjectReference::from_raw_address(unsafe { Address::from_usize(read_word(slot)) })
}

pub fn write_ref(slot: Address, object: ObjectReference) {
    write_word(slot, object.value())
}

/// Address of the `n`-th word of an object, the header being word 0.
pub fn field(object: ObjectReference, n: usize) -> Address {
    object.to_raw_address().word(n)
}

/// The info table of an object that is not forwarded.
pub fn get_info(object: ObjectReference) -> &'static InfoTable {
    match HeaderState::decode(load_header(object)) {
        HeaderState::Info(word) => InfoTable::from_header(word),
        state => fatal!("Object {} has no info pointer ({:?})", object, state),
    }
}

/// Overwrite the info pointer of an object.
pub fn set_info(object: ObjectReference, info: &'static InfoTable) {
    store_header(object, info.header_word())
}

/// The info table of the frame at `frame`. Anything but a frame kind is corruption.
pub fn get_frame_info(frame: Address) -> &'static InfoTable {
    let info = InfoTable::from_header(read_word(frame));
    if !info.kind().is_frame() {
        fatal!(
            "Weird activation record {} ({}) found on stack at {}",
            info.name(),
            info.kind().name(),
            frame
        );
    }
    info
}

/// Size of an object in words, header included.
pub fn closure_size(object: ObjectReference, info: &InfoTable) -> usize {
    let kind = info.kind();
    match kind {
        ClosureKind::Constr | ClosureKind::Fun | ClosureKind::Thunk => {
            HEADER_WORDS + info.layout().payload_words()
        }
        k if k.is_static() => static_closure_words(info),
        ClosureKind::Pap | ClosureKind::Ap => PAP_PAYLOAD + read_word(field(object, PAP_N_ARGS)),
        ClosureKind::ApStack => AP_STACK_PAYLOAD + read_word(field(object, AP_STACK_SIZE)),
        ClosureKind::Ind | ClosureKind::MutVarClean | ClosureKind::MutVarDirty => 2,
        ClosureKind::MutArrPtrsClean | ClosureKind::MutArrPtrsDirty => {
            MUT_ARR_PAYLOAD + read_word(field(object, MUT_ARR_SIZE))
        }
        ClosureKind::ArrWords => {
            ARR_WORDS_PAYLOAD + bytes_to_words_up(read_word(field(object, ARR_WORDS_BYTES)))
        }
        ClosureKind::Tso => tso::WORDS,
        ClosureKind::Stack => STACK_PAYLOAD + read_word(field(object, STACK_SIZE)),
        _ => fatal!(
            "Object {} has frame kind {} and no closure size",
            object,
            kind.name()
        ),
    }
}

/// Words taken by a static closure, its static link included.
pub fn static_closure_words(info: &InfoTable) -> usize {
    HEADER_WORDS + info.layout().payload_words() + 1
}

/// The word threading a static closure onto a static-object list. Zero when the closure is on
/// no list.
pub fn static_link(object: ObjectReference, info: &InfoTable) -> Address {
    debug_assert!(info.kind().is_static());
    field(object, HEADER_WORDS + info.layout().payload_words())
}

/// A mutable array of pointers with its card table.
#[derive(Copy, Clone, Debug)]
pub struct MutArrPtrs {
    object: ObjectReference,
    card_bits: usize,
}

impl MutArrPtrs {
    pub fn new(object: ObjectReference, card_bits: usize) -> Self {
        MutArrPtrs { object, card_bits }
    }

    /// Total words of an array of `ptrs` elements, header and card table included.
    pub fn words_for(ptrs: usize, card_bits: usize) -> usize {
        MUT_ARR_PAYLOAD + ptrs + Self::card_table_words(ptrs, card_bits)
    }

    pub fn card_table_words(ptrs: usize, card_bits: usize) -> usize {
        bytes_to_words_up(Self::cards_for(ptrs, card_bits))
    }

    fn cards_for(ptrs: usize, card_bits: usize) -> usize {
        (ptrs + (1 << card_bits) - 1) >> card_bits
    }

    pub fn object(&self) -> ObjectReference {
        self.object
    }

    pub fn ptrs(&self) -> usize {
        read_word(field(self.object, MUT_ARR_PTRS))
    }

    /// Elements plus card-table words.
    pub fn size(&self) -> usize {
        read_word(field(self.object, MUT_ARR_SIZE))
    }

    pub fn cards(&self) -> usize {
        Self::cards_for(self.ptrs(), self.card_bits)
    }

    pub fn element(&self, i: usize) -> Address {
        field(self.object, MUT_ARR_PAYLOAD + i)
    }

    /// Element indices covered by `card`. The last card may be partial.
    pub fn card_elements(&self, card: usize) -> std::ops::Range<usize> {
        let start = card << self.card_bits;
        let end = ((card + 1) << self.card_bits).min(self.ptrs());
        start..end
    }

    fn card_byte(&self, card: usize) -> Address {
        field(self.object, MUT_ARR_PAYLOAD + self.ptrs()) + card
    }

    pub fn is_card_dirty(&self, card: usize) -> bool {
        unsafe { self.card_byte(card).load::<u8>() != 0 }
    }

    pub fn set_card(&self, card: usize, dirty: bool) {
        unsafe { self.card_byte(card).store::<u8>(dirty as u8) }
    }

    /// Mark the card covering element `i`, as the mutator's write barrier does.
    pub fn mark_element(&self, i: usize) {
        self.set_card(i >> self.card_bits, true)
    }

    /// The first address after the array.
    pub fn end(&self) -> Address {
        field(self.object, MUT_ARR_PAYLOAD + self.size())
    }
}

/// One chunk of a thread stack.
#[derive(Copy, Clone, Debug)]
pub struct StackChunk(ObjectReference);

impl StackChunk {
    pub fn new(object: ObjectReference) -> Self {
        StackChunk(object)
    }

    pub fn object(&self) -> ObjectReference {
        self.0
    }

    pub fn stack_size(&self) -> usize {
        read_word(field(self.0, STACK_SIZE))
    }

    pub fn is_dirty(&self) -> bool {
        read_word(field(self.0, STACK_DIRTY)) != 0
    }

    pub fn set_dirty(&self, dirty: bool) {
        write_word(field(self.0, STACK_DIRTY), dirty as usize)
    }

    /// Address of the most recent frame.
    pub fn sp(&self) -> Address {
        unsafe { Address::from_usize(read_word(field(self.0, STACK_SP))) }
    }

    pub fn set_sp(&self, sp: Address) {
        write_word(field(self.0, STACK_SP), sp.as_usize())
    }

    pub fn stack_start(&self) -> Address {
        field(self.0, STACK_PAYLOAD)
    }

    /// The first address after the oldest frame.
    pub fn stack_end(&self) -> Address {
        self.stack_start().word(self.stack_size())
    }

    /// `sp` is an interior pointer. After the chunk has been copied from `from`, point it into
    /// the copy.
    pub fn relocate_sp(&self, from: StackChunk) {
        let depth = from.sp().words_from(from.stack_start());
        self.set_sp(self.stack_start().word(depth));
    }
}

/// A thread control block.
#[derive(Copy, Clone, Debug)]
pub struct Tso(ObjectReference);

impl Tso {
    pub fn new(object: ObjectReference) -> Self {
        Tso(object)
    }

    pub fn stack_slot(&self) -> Address {
        field(self.0, tso::STACKOBJ)
    }

    pub fn stack(&self) -> ObjectReference {
        read_ref(self.stack_slot())
    }

    pub fn slot(&self, offset: usize) -> Address {
        field(self.0, offset)
    }

    pub fn id(&self) -> usize {
        read_word(field(self.0, tso::ID))
    }

    pub fn is_dirty(&self) -> bool {
        read_word(field(self.0, tso::DIRTY)) != 0
    }

    pub fn set_dirty(&self, dirty: bool) {
        write_word(field(self.0, tso::DIRTY), dirty as usize)
    }
}

static_assertions::const_assert_eq!(tso::WORDS, tso::DIRTY + 1);
static_assertions::const_assert!(BYTES_IN_WORD >= 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_table_geometry() {
        // 40 elements, 4 per card: 10 cards in two words of card bytes on 64-bit.
        assert_eq!(MutArrPtrs::cards_for(40, 2), 10);
        assert_eq!(MutArrPtrs::card_table_words(40, 2), bytes_to_words_up(10));
        assert_eq!(
            MutArrPtrs::words_for(40, 2),
            MUT_ARR_PAYLOAD + 40 + bytes_to_words_up(10)
        );
        // A partial last card.
        assert_eq!(MutArrPtrs::cards_for(41, 2), 11);
    }
}
