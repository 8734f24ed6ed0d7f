/// log2 of the word size, which is also the size of a closure field.
#[cfg(target_pointer_width = "64")]
pub const LOG_BYTES_IN_WORD: u8 = 3;
#[cfg(target_pointer_width = "32")]
pub const LOG_BYTES_IN_WORD: u8 = 2;
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;
/// Width of a bitmap word: SRT bitmaps and large stack layouts are arrays of these.
pub const BITS_IN_WORD: usize = BYTES_IN_WORD * 8;

pub const LOG_BYTES_IN_BLOCK: u8 = 15;
/// Blocks are aligned to their size, so the descriptor of any heap address is found by masking.
pub const BYTES_IN_BLOCK: usize = 1 << LOG_BYTES_IN_BLOCK;

/// Bytes reserved at the start of every block group for its descriptor.
pub const BLOCK_DESCRIPTOR_BYTES: usize = 64;
/// Words available for objects in a single block.
pub const BLOCK_PAYLOAD_WORDS: usize = (BYTES_IN_BLOCK - BLOCK_DESCRIPTOR_BYTES) / BYTES_IN_WORD;

/// Objects of more than this many words get a block group of their own.
pub const DEFAULT_LARGE_OBJECT_WORDS: usize = BLOCK_PAYLOAD_WORDS * 8 / 10;

/// 128 array elements per card.
pub const DEFAULT_LOG_CARD_ELEMENTS: usize = 7;

pub const MAX_GENERATIONS: usize = 8;

/// Remembered-set entries handed out per claim in a parallel collection.
pub const DEFAULT_MUT_LIST_CHUNK: usize = 128;
