use super::block::{Block, BlockFlags};
use super::block_allocator::BlockAllocator;
use crate::util::Address;
use spin::Mutex;

/// One generation of the heap.
///
/// Between collections a generation owns its block list and its large objects. While a
/// collection of this generation is in progress those are parked on the `old_*` lists (the
/// from-space) and the workers' to-space blocks are added back at the end.
pub struct Generation {
    no: usize,
    to: usize,
    blocks: Mutex<Vec<Block>>,
    large_objects: Mutex<Vec<Block>>,
    old_blocks: Mutex<Vec<Block>>,
    old_large_objects: Mutex<Vec<Block>>,
    /// Current allocation block of the mutator-side allocator.
    alloc_block: Mutex<Option<Block>>,
}

impl Generation {
    pub(crate) fn new(no: usize, to: usize) -> Self {
        Generation {
            no,
            to,
            blocks: Mutex::new(vec![]),
            large_objects: Mutex::new(vec![]),
            old_blocks: Mutex::new(vec![]),
            old_large_objects: Mutex::new(vec![]),
            alloc_block: Mutex::new(None),
        }
    }

    pub fn no(&self) -> usize {
        self.no
    }

    /// The generation survivors are copied into.
    pub fn to(&self) -> usize {
        self.to
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.lock().clone()
    }

    pub fn large_objects(&self) -> Vec<Block> {
        self.large_objects.lock().clone()
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn n_large_objects(&self) -> usize {
        self.large_objects.lock().len()
    }

    /// Words allocated in the generation, large objects included.
    pub fn live_words(&self) -> usize {
        let blocks: usize = self.blocks.lock().iter().map(Block::used_words).sum();
        let large: usize = self.large_objects.lock().iter().map(Block::used_words).sum();
        blocks + large
    }

    /// Bump-allocate `words` words for a new object.
    pub(crate) fn alloc(&self, words: usize, allocator: &BlockAllocator) -> Address {
        let mut alloc_block = self.alloc_block.lock();
        if let Some(addr) = alloc_block.and_then(|b| b.alloc(words)) {
            return addr;
        }
        let block = allocator.alloc_group(1, self.no, self.to, BlockFlags::NONE);
        self.blocks.lock().push(block);
        *alloc_block = Some(block);
        match block.alloc(words) {
            Some(addr) => addr,
            None => fatal!("Object of {} words does not fit a block", words),
        }
    }

    pub(crate) fn add_large_object(&self, block: Block) {
        self.large_objects.lock().push(block);
    }

    /// Move the current blocks to the from-space ahead of a collection.
    pub(crate) fn flip(&self) {
        let mut old_blocks = self.old_blocks.lock();
        let mut old_large = self.old_large_objects.lock();
        debug_assert!(old_blocks.is_empty() && old_large.is_empty());
        std::mem::swap(&mut *old_blocks, &mut *self.blocks.lock());
        std::mem::swap(&mut *old_large, &mut *self.large_objects.lock());
        *self.alloc_block.lock() = None;
    }

    pub(crate) fn take_from_space(&self) -> (Vec<Block>, Vec<Block>) {
        (
            std::mem::take(&mut *self.old_blocks.lock()),
            std::mem::take(&mut *self.old_large_objects.lock()),
        )
    }

    /// Add to-space blocks and promoted large objects filled during a collection.
    pub(crate) fn adopt(&self, blocks: Vec<Block>, large_objects: Vec<Block>) {
        self.blocks.lock().extend(blocks);
        self.large_objects.lock().extend(large_objects);
    }

    /// Drain every block the generation holds, for freeing.
    pub(crate) fn drain_all(&self) -> Vec<Block> {
        *self.alloc_block.lock() = None;
        let mut all = std::mem::take(&mut *self.blocks.lock());
        all.append(&mut self.large_objects.lock());
        all.append(&mut self.old_blocks.lock());
        all.append(&mut self.old_large_objects.lock());
        all
    }
}
