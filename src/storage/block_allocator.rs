use super::block::{Block, BlockFlags};
use crate::util::Address;
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Hands out block groups. Single blocks are recycled through a free pool; groups go back to
/// the system allocator when freed.
pub struct BlockAllocator {
    free_blocks: Mutex<Vec<Address>>,
    blocks_in_use: AtomicUsize,
}

impl BlockAllocator {
    pub fn new() -> Self {
        BlockAllocator {
            free_blocks: Mutex::new(vec![]),
            blocks_in_use: AtomicUsize::new(0),
        }
    }

    /// Allocate a group of `blocks` contiguous blocks and initialise its descriptor.
    pub fn alloc_group(&self, blocks: usize, gen_no: usize, dest_no: usize, flags: BlockFlags) -> Block {
        debug_assert!(blocks > 0);
        let recycled = if blocks == 1 {
            self.free_blocks.lock().unwrap().pop()
        } else {
            None
        };
        let start = recycled.unwrap_or_else(|| Self::map(blocks));
        self.blocks_in_use.fetch_add(blocks, Ordering::Relaxed);
        trace!("alloc_group({}) = {} gen {} flags {:?}", blocks, start, gen_no, flags);
        unsafe { Block::init(start, blocks, gen_no, dest_no, flags) }
    }

    pub fn free_group(&self, block: Block) {
        let blocks = block.blocks();
        self.blocks_in_use.fetch_sub(blocks, Ordering::Relaxed);
        if blocks == 1 {
            self.free_blocks.lock().unwrap().push(block.start());
        } else {
            Self::unmap(block.start(), blocks);
        }
    }

    pub fn blocks_in_use(&self) -> usize {
        self.blocks_in_use.load(Ordering::Relaxed)
    }

    fn layout(blocks: usize) -> Layout {
        match Layout::from_size_align(blocks * Block::BYTES, Block::BYTES) {
            Ok(layout) => layout,
            Err(e) => panic!("Cannot lay out a group of {} blocks: {}", blocks, e),
        }
    }

    fn map(blocks: usize) -> Address {
        let layout = Self::layout(blocks);
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            handle_alloc_error(layout);
        }
        Address::from_mut_ptr(ptr)
    }

    fn unmap(start: Address, blocks: usize) {
        unsafe { dealloc(start.to_mut_ptr::<u8>(), Self::layout(blocks)) }
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BlockAllocator {
    fn drop(&mut self) {
        let free_blocks = self.free_blocks.get_mut().unwrap_or_else(|e| e.into_inner());
        for start in free_blocks.drain(..) {
            Self::unmap(start, 1);
        }
    }
}
