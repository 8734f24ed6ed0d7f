//! Blocks and block groups.
//!
//! The heap is carved into blocks of `BYTES_IN_BLOCK` bytes, aligned to their size. A block
//! group is a run of contiguous blocks allocated together; its descriptor sits at the start of
//! the first block, so the descriptor of any heap address is found by masking the address.

use crate::util::constants::*;
use crate::util::{Address, ObjectReference};
use std::fmt;
use std::ops::BitOr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Block flags.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct BlockFlags(usize);

impl BlockFlags {
    pub const NONE: BlockFlags = BlockFlags(0);
    /// To-space block, or a large object already claimed in this cycle.
    pub const EVACUATED: BlockFlags = BlockFlags(1);
    /// The group holds a single large object that is never copied.
    pub const LARGE: BlockFlags = BlockFlags(1 << 1);
    /// Statically allocated closures.
    pub const STATIC: BlockFlags = BlockFlags(1 << 2);

    pub const fn contains(self, other: BlockFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: BlockFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn bits(self) -> usize {
        self.0
    }
}

impl BitOr for BlockFlags {
    type Output = BlockFlags;
    fn bitor(self, rhs: BlockFlags) -> BlockFlags {
        BlockFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names = vec![];
        if self.contains(Self::EVACUATED) {
            names.push("EVACUATED");
        }
        if self.contains(Self::LARGE) {
            names.push("LARGE");
        }
        if self.contains(Self::STATIC) {
            names.push("STATIC");
        }
        write!(f, "BlockFlags({})", names.join("|"))
    }
}

/// The descriptor at the start of every block group.
#[repr(C)]
struct BlockDescriptor {
    /// Bump pointer: the first unallocated address.
    free: AtomicUsize,
    /// Scan pointer: objects below it have been scavenged in this cycle.
    scan: AtomicUsize,
    gen_no: AtomicUsize,
    /// The generation survivors of this block are copied into.
    dest_no: AtomicUsize,
    flags: AtomicUsize,
    blocks: usize,
}

static_assertions::const_assert!(std::mem::size_of::<BlockDescriptor>() <= BLOCK_DESCRIPTOR_BYTES);
static_assertions::const_assert!(BLOCK_DESCRIPTOR_BYTES % BYTES_IN_WORD == 0);

/// A block group, identified by the address of its first block.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(Address);

impl Block {
    pub const LOG_BYTES: usize = LOG_BYTES_IN_BLOCK as usize;
    pub const BYTES: usize = BYTES_IN_BLOCK;

    /// The block a heap address lives in.
    pub fn of(addr: Address) -> Block {
        Block(addr.align_down(Self::BYTES))
    }

    /// The block group holding an object.
    pub fn containing(object: ObjectReference) -> Block {
        Self::of(object.to_raw_address())
    }

    pub fn from_aligned_address(addr: Address) -> Block {
        debug_assert!(addr.is_aligned_to(Self::BYTES));
        Block(addr)
    }

    /// Write a fresh descriptor at `start`.
    ///
    /// # Safety
    /// `start` must be the start of `blocks` writable, block-aligned blocks owned by the caller.
    pub(crate) unsafe fn init(start: Address, blocks: usize, gen_no: usize, dest_no: usize, flags: BlockFlags) -> Block {
        debug_assert!(start.is_aligned_to(Self::BYTES));
        let payload = start + BLOCK_DESCRIPTOR_BYTES;
        start.store(BlockDescriptor {
            free: AtomicUsize::new(payload.as_usize()),
            scan: AtomicUsize::new(payload.as_usize()),
            gen_no: AtomicUsize::new(gen_no),
            dest_no: AtomicUsize::new(dest_no),
            flags: AtomicUsize::new(flags.bits()),
            blocks,
        });
        Block(start)
    }

    fn descriptor(&self) -> &BlockDescriptor {
        unsafe { self.0.as_ref() }
    }

    pub fn start(&self) -> Address {
        self.0
    }

    /// First word available for objects.
    pub fn payload_start(&self) -> Address {
        self.0 + BLOCK_DESCRIPTOR_BYTES
    }

    pub fn end(&self) -> Address {
        self.0 + self.blocks() * Self::BYTES
    }

    /// Number of blocks in the group.
    pub fn blocks(&self) -> usize {
        self.descriptor().blocks
    }

    pub fn free(&self) -> Address {
        unsafe { Address::from_usize(self.descriptor().free.load(Ordering::Acquire)) }
    }

    pub fn set_free(&self, free: Address) {
        debug_assert!(free <= self.end());
        self.descriptor().free.store(free.as_usize(), Ordering::Release)
    }

    pub fn scan(&self) -> Address {
        unsafe { Address::from_usize(self.descriptor().scan.load(Ordering::Acquire)) }
    }

    pub fn set_scan(&self, scan: Address) {
        self.descriptor().scan.store(scan.as_usize(), Ordering::Release)
    }

    /// Words allocated in the group.
    pub fn used_words(&self) -> usize {
        self.free().words_from(self.payload_start())
    }

    pub fn gen_no(&self) -> usize {
        self.descriptor().gen_no.load(Ordering::Relaxed)
    }

    pub fn set_gen_no(&self, gen_no: usize) {
        self.descriptor().gen_no.store(gen_no, Ordering::Relaxed)
    }

    pub fn dest_no(&self) -> usize {
        self.descriptor().dest_no.load(Ordering::Relaxed)
    }

    pub fn set_dest_no(&self, dest_no: usize) {
        self.descriptor().dest_no.store(dest_no, Ordering::Relaxed)
    }

    pub fn flags(&self) -> BlockFlags {
        BlockFlags(self.descriptor().flags.load(Ordering::Acquire))
    }

    pub fn has_flag(&self, flag: BlockFlags) -> bool {
        self.flags().contains(flag)
    }

    /// Set a flag atomically. Returns true if it was already set, i.e. if another thread won.
    pub fn set_flag(&self, flag: BlockFlags) -> bool {
        let old = self.descriptor().flags.fetch_or(flag.bits(), Ordering::AcqRel);
        BlockFlags(old).contains(flag)
    }

    pub fn clear_flag(&self, flag: BlockFlags) {
        self.descriptor().flags.fetch_and(!flag.bits(), Ordering::AcqRel);
    }

    /// Bump-allocate `words` words. Only the owner of the block may allocate in it.
    pub fn alloc(&self, words: usize) -> Option<Address> {
        let result = self.free();
        let new_free = result.word(words);
        if new_free > self.end() {
            return None;
        }
        self.set_free(new_free);
        Some(result)
    }

    /// Is every allocated object scanned?
    pub fn is_scanned(&self) -> bool {
        self.scan() == self.free()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_allocator::BlockAllocator;

    #[test]
    fn descriptor_lookup_by_masking() {
        let allocator = BlockAllocator::new();
        let block = allocator.alloc_group(2, 1, 1, BlockFlags::LARGE);
        let inner = block.payload_start() + Block::BYTES + 24;
        assert_eq!(Block::of(block.payload_start()), block);
        assert_eq!(block.blocks(), 2);
        assert_eq!(block.end(), block.start() + 2 * Block::BYTES);
        // Addresses past the first block resolve to the second block, which has no descriptor.
        assert_ne!(Block::of(inner), block);
        allocator.free_group(block);
    }

    #[test]
    fn bump_allocation() {
        let allocator = BlockAllocator::new();
        let block = allocator.alloc_group(1, 0, 1, BlockFlags::NONE);
        let a = block.alloc(4).unwrap();
        let b = block.alloc(2).unwrap();
        assert_eq!(a, block.payload_start());
        assert_eq!(b, a.word(4));
        assert_eq!(block.used_words(), 6);
        assert!(block.alloc(BLOCK_PAYLOAD_WORDS).is_none());
        assert!(!block.is_scanned());
        allocator.free_group(block);
    }

    #[test]
    fn flag_claims() {
        let allocator = BlockAllocator::new();
        let block = allocator.alloc_group(1, 0, 1, BlockFlags::LARGE);
        assert!(!block.set_flag(BlockFlags::EVACUATED));
        assert!(block.set_flag(BlockFlags::EVACUATED));
        assert!(block.flags().contains(BlockFlags::LARGE | BlockFlags::EVACUATED));
        block.clear_flag(BlockFlags::EVACUATED);
        assert_eq!(block.flags(), BlockFlags::LARGE);
        allocator.free_group(block);
    }
}
