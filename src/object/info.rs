//! Info tables: the immutable, program-lifetime descriptors a closure header points to.

use crate::util::constants::BITS_IN_WORD;
use crate::util::ObjectReference;
use enum_map::Enum;
use strum_macros::{EnumIter, IntoStaticStr};

/// Every info table starts with this word. A header that leads anywhere else is corrupted.
pub const INFO_MAGIC: usize = 0x1f0_7ab1e;

/// The closed set of closure and stack-frame kinds the scavenger knows how to trace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureKind {
    /// Data constructor: pointer fields followed by non-pointer fields.
    Constr,
    /// Function closure; may carry an SRT and an argument layout.
    Fun,
    /// Unevaluated thunk; may carry an SRT.
    Thunk,
    /// Partial application of a function to too few arguments.
    Pap,
    /// Saturated application, a thunk in disguise.
    Ap,
    /// A chunk of stack captured by an exception or an asynchronous interrupt.
    ApStack,
    /// Indirection to another closure.
    Ind,
    MutVarClean,
    MutVarDirty,
    MutArrPtrsClean,
    MutArrPtrsDirty,
    /// Byte array without pointers.
    ArrWords,
    /// Thread control block.
    Tso,
    /// One chunk of a thread's execution stack.
    Stack,
    ConstrStatic,
    FunStatic,
    ThunkStatic,
    IndStatic,
    /// Return frame whose layout fits a single-word bitmap.
    RetSmall,
    /// Return frame with a multi-word bitmap.
    RetBig,
    UpdateFrame,
    /// Bottom frame of a stack chunk, linking to the next chunk.
    UnderflowFrame,
    StopFrame,
}

impl ClosureKind {
    /// The name used in diagnostics, e.g. `MUT_ARR_PTRS_DIRTY`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Is this a stack-frame kind (only valid on a stack, never as a heap object)?
    pub const fn is_frame(self) -> bool {
        matches!(
            self,
            ClosureKind::RetSmall
                | ClosureKind::RetBig
                | ClosureKind::UpdateFrame
                | ClosureKind::UnderflowFrame
                | ClosureKind::StopFrame
        )
    }

    /// Is this a statically allocated closure kind?
    pub const fn is_static(self) -> bool {
        matches!(
            self,
            ClosureKind::ConstrStatic
                | ClosureKind::FunStatic
                | ClosureKind::ThunkStatic
                | ClosureKind::IndStatic
        )
    }

    pub const fn is_fun(self) -> bool {
        matches!(self, ClosureKind::Fun | ClosureKind::FunStatic)
    }

    pub const fn is_thunk(self) -> bool {
        matches!(self, ClosureKind::Thunk | ClosureKind::ThunkStatic)
    }

    /// Kinds whose size and pointer fields come straight from [`Layout`].
    pub const fn has_plain_layout(self) -> bool {
        matches!(
            self,
            ClosureKind::Constr
                | ClosureKind::Fun
                | ClosureKind::Thunk
                | ClosureKind::ConstrStatic
                | ClosureKind::FunStatic
                | ClosureKind::ThunkStatic
                | ClosureKind::IndStatic
        )
    }
}

/// Payload shape for kinds with a fixed layout: `ptrs` pointer words, then `nptrs` plain words.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
    pub ptrs: u32,
    pub nptrs: u32,
}

impl Layout {
    pub const fn new(ptrs: u32, nptrs: u32) -> Self {
        Layout { ptrs, nptrs }
    }

    pub const fn payload_words(&self) -> usize {
        self.ptrs as usize + self.nptrs as usize
    }
}

/// A multi-word pointer bitmap.
#[derive(Debug)]
pub struct LargeBitmap {
    size: usize,
    bits: Box<[usize]>,
}

impl LargeBitmap {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn words(&self) -> &[usize] {
        &self.bits
    }
}

/// Which slots of a frame (or which arguments of a function) hold pointers. A set bit marks a
/// pointer slot.
#[derive(Copy, Clone, Debug)]
pub enum Bitmap {
    Small { size: u32, bits: usize },
    Large(&'static LargeBitmap),
}

impl Bitmap {
    /// Encode `slots` (true = pointer). Layouts of at most `max_small_bits` slots use the
    /// single-word encoding; longer ones are leaked into a [`LargeBitmap`].
    pub fn from_slots(slots: &[bool], max_small_bits: usize) -> Bitmap {
        let max_small_bits = max_small_bits.min(BITS_IN_WORD);
        let mut words = vec![0usize; slots.len().div_ceil(BITS_IN_WORD).max(1)];
        for (i, _) in slots.iter().enumerate().filter(|(_, p)| **p) {
            words[i / BITS_IN_WORD] |= 1 << (i % BITS_IN_WORD);
        }
        if slots.len() <= max_small_bits {
            Bitmap::Small {
                size: slots.len() as u32,
                bits: words[0],
            }
        } else {
            Bitmap::Large(Box::leak(Box::new(LargeBitmap {
                size: slots.len(),
                bits: words.into_boxed_slice(),
            })))
        }
    }

    /// A bitmap built from raw parts, unchecked. Used to describe tables produced elsewhere.
    pub const fn small(size: u32, bits: usize) -> Bitmap {
        Bitmap::Small { size, bits }
    }

    /// Number of slots described.
    pub fn size(&self) -> usize {
        match self {
            Bitmap::Small { size, .. } => *size as usize,
            Bitmap::Large(large) => large.size,
        }
    }

    pub fn is_small(&self) -> bool {
        matches!(self, Bitmap::Small { .. })
    }

    /// Does slot `i` hold a pointer?
    pub fn is_pointer(&self, i: usize) -> bool {
        match self {
            Bitmap::Small { bits, .. } => i < BITS_IN_WORD && (bits >> i) & 1 == 1,
            Bitmap::Large(large) => (large.bits[i / BITS_IN_WORD] >> (i % BITS_IN_WORD)) & 1 == 1,
        }
    }

    /// Is the encoding self-consistent? A small bitmap cannot describe more slots than a word
    /// has bits, and a large one needs enough words for its size.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Bitmap::Small { size, .. } => *size as usize <= BITS_IN_WORD,
            Bitmap::Large(large) => large.bits.len() * BITS_IN_WORD >= large.size,
        }
    }
}

/// Static reference table: the static closures a piece of code may refer to.
#[derive(Debug)]
pub struct Srt {
    entries: Box<[ObjectReference]>,
    bitmap: Box<[usize]>,
}

impl Srt {
    /// An SRT where every entry is live.
    pub fn new(entries: Vec<ObjectReference>) -> &'static Srt {
        let live = vec![true; entries.len()];
        Srt::with_live_entries(entries, &live)
    }

    /// An SRT where entry `i` is live iff `live[i]`.
    pub fn with_live_entries(entries: Vec<ObjectReference>, live: &[bool]) -> &'static Srt {
        assert_eq!(entries.len(), live.len());
        let mut bitmap = vec![0usize; entries.len().div_ceil(BITS_IN_WORD).max(1)];
        for (i, _) in live.iter().enumerate().filter(|(_, l)| **l) {
            bitmap[i / BITS_IN_WORD] |= 1 << (i % BITS_IN_WORD);
        }
        Srt::from_raw_parts(entries, bitmap)
    }

    /// An SRT from its entries and raw bitmap words, unchecked.
    pub fn from_raw_parts(entries: Vec<ObjectReference>, bitmap: Vec<usize>) -> &'static Srt {
        Box::leak(Box::new(Srt {
            entries: entries.into_boxed_slice(),
            bitmap: bitmap.into_boxed_slice(),
        }))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ObjectReference] {
        &self.entries
    }

    pub fn is_live(&self, i: usize) -> bool {
        (self.bitmap[i / BITS_IN_WORD] >> (i % BITS_IN_WORD)) & 1 == 1
    }

    /// The first bitmap bit set beyond the last entry, if any.
    pub fn first_stray_bit(&self) -> Option<usize> {
        if self.bitmap.len() * BITS_IN_WORD < self.entries.len() {
            return Some(self.bitmap.len() * BITS_IN_WORD);
        }
        (self.entries.len()..self.bitmap.len() * BITS_IN_WORD)
            .find(|&i| (self.bitmap[i / BITS_IN_WORD] >> (i % BITS_IN_WORD)) & 1 == 1)
    }

    /// Number of live entries.
    pub fn live_count(&self) -> usize {
        (0..self.entries.len()).filter(|&i| self.is_live(i)).count()
    }
}

/// The descriptor every closure header and every stack frame points to.
#[repr(C, align(8))]
#[derive(Debug)]
pub struct InfoTable {
    magic: usize,
    kind: ClosureKind,
    layout: Layout,
    bitmap: Option<Bitmap>,
    srt: Option<&'static Srt>,
    name: &'static str,
}

impl InfoTable {
    pub const fn new(kind: ClosureKind, name: &'static str) -> InfoTable {
        InfoTable {
            magic: INFO_MAGIC,
            kind,
            layout: Layout::new(0, 0),
            bitmap: None,
            srt: None,
            name,
        }
    }

    pub const fn constr(name: &'static str, ptrs: u32, nptrs: u32) -> InfoTable {
        InfoTable::new(ClosureKind::Constr, name).with_layout(ptrs, nptrs)
    }

    pub const fn fun(name: &'static str, ptrs: u32, nptrs: u32) -> InfoTable {
        InfoTable::new(ClosureKind::Fun, name).with_layout(ptrs, nptrs)
    }

    pub const fn thunk(name: &'static str, ptrs: u32, nptrs: u32) -> InfoTable {
        InfoTable::new(ClosureKind::Thunk, name).with_layout(ptrs, nptrs)
    }

    /// A static closure of the given kind. `IndStatic` always has exactly one pointer field.
    pub const fn static_closure(kind: ClosureKind, name: &'static str, ptrs: u32, nptrs: u32) -> InfoTable {
        InfoTable::new(kind, name).with_layout(ptrs, nptrs)
    }

    /// A return-frame table for a frame with the given slots (true = pointer). The frame is a
    /// `RetSmall` when the layout fits `max_small_bits`, a `RetBig` otherwise.
    pub fn ret(name: &'static str, slots: &[bool], max_small_bits: usize) -> InfoTable {
        let bitmap = Bitmap::from_slots(slots, max_small_bits);
        let kind = if bitmap.is_small() {
            ClosureKind::RetSmall
        } else {
            ClosureKind::RetBig
        };
        InfoTable::new(kind, name).with_bitmap(bitmap)
    }

    pub const fn with_layout(self, ptrs: u32, nptrs: u32) -> InfoTable {
        InfoTable {
            layout: Layout::new(ptrs, nptrs),
            ..self
        }
    }

    pub const fn with_bitmap(self, bitmap: Bitmap) -> InfoTable {
        InfoTable {
            bitmap: Some(bitmap),
            ..self
        }
    }

    pub const fn with_srt(self, srt: &'static Srt) -> InfoTable {
        InfoTable {
            srt: Some(srt),
            ..self
        }
    }

    /// Give the table program lifetime.
    pub fn leak(self) -> &'static InfoTable {
        Box::leak(Box::new(self))
    }

    pub fn kind(&self) -> ClosureKind {
        self.kind
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Frame slot layout for return frames, argument layout for functions.
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    pub fn srt(&self) -> Option<&'static Srt> {
        self.srt
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The header word of a closure described by this table.
    pub fn header_word(&'static self) -> usize {
        self as *const InfoTable as usize
    }

    /// Decode a header word that must hold an info pointer.
    pub fn from_header(word: usize) -> &'static InfoTable {
        if word == 0 || word % std::mem::align_of::<InfoTable>() != 0 {
            fatal!("Invalid info pointer {:#x} in closure header", word);
        }
        let info = unsafe { &*(word as *const InfoTable) };
        if info.magic != INFO_MAGIC {
            fatal!("Header word {:#x} does not point to an info table", word);
        }
        info
    }
}

static_assertions::const_assert!(std::mem::align_of::<InfoTable>() >= 4);

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn kind_partitions() {
        for kind in ClosureKind::iter() {
            assert!(!(kind.is_frame() && kind.is_static()), "{}", kind.name());
            if kind.is_fun() || kind.is_thunk() {
                assert!(kind.has_plain_layout());
            }
        }
        assert_eq!(ClosureKind::MutArrPtrsDirty.name(), "MUT_ARR_PTRS_DIRTY");
        assert_eq!(ClosureKind::iter().filter(|k| k.is_frame()).count(), 5);
    }

    #[test]
    fn bitmap_threshold_picks_encoding() {
        let slots = [true, false, true, true, false, false];
        let small = Bitmap::from_slots(&slots, 8);
        assert!(small.is_small());
        let large = Bitmap::from_slots(&slots, 4);
        assert!(!large.is_small());
        for (i, p) in slots.iter().enumerate() {
            assert_eq!(small.is_pointer(i), *p);
            assert_eq!(large.is_pointer(i), *p);
        }
        assert_eq!(small.size(), 6);
        assert_eq!(large.size(), 6);
        assert!(small.is_well_formed() && large.is_well_formed());
    }

    #[test]
    fn large_bitmap_spans_words() {
        let mut slots = vec![false; BITS_IN_WORD * 2 + 3];
        slots[BITS_IN_WORD + 1] = true;
        slots[BITS_IN_WORD * 2 + 2] = true;
        let bitmap = Bitmap::from_slots(&slots, BITS_IN_WORD);
        assert!(!bitmap.is_small());
        assert!(bitmap.is_pointer(BITS_IN_WORD + 1));
        assert!(bitmap.is_pointer(BITS_IN_WORD * 2 + 2));
        assert!(!bitmap.is_pointer(0));
    }

    #[test]
    fn ret_frame_kind_follows_threshold() {
        assert_eq!(InfoTable::ret("r", &[true; 3], 4).kind(), ClosureKind::RetSmall);
        assert_eq!(InfoTable::ret("r", &[true; 5], 4).kind(), ClosureKind::RetBig);
    }

    #[test]
    fn srt_bits() {
        let entries = vec![ObjectReference::NULL; 5];
        let srt = Srt::with_live_entries(entries.clone(), &[true, false, true, false, true]);
        assert_eq!(srt.live_count(), 3);
        assert!(srt.is_live(4) && !srt.is_live(3));
        assert_eq!(srt.first_stray_bit(), None);

        let corrupted = Srt::from_raw_parts(entries, vec![1 << 9]);
        assert_eq!(corrupted.first_stray_bit(), Some(9));
    }

    #[test]
    fn header_round_trip() {
        let info = InfoTable::constr("Pair", 2, 0).leak();
        let decoded = InfoTable::from_header(info.header_word());
        assert_eq!(decoded.kind(), ClosureKind::Constr);
        assert_eq!(decoded.layout().payload_words(), 2);
        assert_eq!(decoded.name(), "Pair");
    }

    #[test]
    #[should_panic(expected = "heap corruption")]
    fn misaligned_header_is_fatal() {
        InfoTable::from_header(0x1234_5677);
    }

    #[test]
    #[should_panic(expected = "heap corruption")]
    fn header_without_magic_is_fatal() {
        let garbage: &'static [usize; 8] = Box::leak(Box::new([0usize; 8]));
        InfoTable::from_header(garbage.as_ptr() as usize);
    }
}
