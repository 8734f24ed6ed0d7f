use super::block::{Block, BlockFlags};
use super::block_allocator::BlockAllocator;
use super::generation::Generation;
use super::linear_scan::ObjectIterator;
use crate::util::constants::BLOCK_PAYLOAD_WORDS;
use crate::util::conversions::blocks_for_words;
use crate::util::logger;
use crate::util::options::Options;
use crate::util::{Address, ObjectReference};
use spin::Mutex;

/// The generational heap: its generations, the static area, and the blocks behind them.
pub struct Heap {
    options: Options,
    allocator: BlockAllocator,
    generations: Box<[Generation]>,
    statics: Mutex<Vec<Block>>,
    static_alloc_block: Mutex<Option<Block>>,
}

impl Heap {
    pub fn new(options: Options) -> Heap {
        logger::init_once();
        let oldest = options.oldest_generation();
        let generations = (0..options.generations)
            .map(|g| Generation::new(g, (g + 1).min(oldest)))
            .collect();
        info!(
            "Heap created with {} generation(s), {} worker thread(s)",
            options.generations, options.threads
        );
        Heap {
            options,
            allocator: BlockAllocator::new(),
            generations,
            statics: Mutex::new(vec![]),
            static_alloc_block: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn generation(&self, no: usize) -> &Generation {
        &self.generations[no]
    }

    pub fn generations(&self) -> &[Generation] {
        &self.generations
    }

    pub fn n_generations(&self) -> usize {
        self.generations.len()
    }

    pub fn oldest_generation(&self) -> usize {
        self.generations.len() - 1
    }

    pub fn blocks_in_use(&self) -> usize {
        self.allocator.blocks_in_use()
    }

    pub(crate) fn allocator(&self) -> &BlockAllocator {
        &self.allocator
    }

    /// Allocate `words` words for a new object in generation `gen`. The caller initialises the
    /// object before the next collection.
    pub fn alloc(&self, gen: usize, words: usize) -> Address {
        let generation = &self.generations[gen];
        if words > self.options.large_object_words {
            let group = self.allocator.alloc_group(
                blocks_for_words(words),
                gen,
                generation.to(),
                BlockFlags::LARGE,
            );
            group.set_free(group.payload_start().word(words));
            generation.add_large_object(group);
            return group.payload_start();
        }
        generation.alloc(words, &self.allocator)
    }

    /// Allocate `words` words in the static area. Static closures are never moved or freed.
    ///
    /// A closure too big for one block gets a group of its own; small closures keep sharing
    /// single blocks, so every one of them starts within the first block of its group.
    pub fn alloc_static(&self, words: usize) -> Address {
        let oldest = self.oldest_generation();
        if words > BLOCK_PAYLOAD_WORDS {
            let group = self
                .allocator
                .alloc_group(blocks_for_words(words), oldest, oldest, BlockFlags::STATIC);
            self.statics.lock().push(group);
            return match group.alloc(words) {
                Some(addr) => addr,
                None => fatal!("Static closure of {} words does not fit its block group", words),
            };
        }
        let mut alloc_block = self.static_alloc_block.lock();
        if let Some(addr) = alloc_block.and_then(|b| b.alloc(words)) {
            return addr;
        }
        let block = self.allocator.alloc_group(1, oldest, oldest, BlockFlags::STATIC);
        self.statics.lock().push(block);
        *alloc_block = Some(block);
        match block.alloc(words) {
            Some(addr) => addr,
            None => fatal!("Static closure of {} words does not fit a block", words),
        }
    }

    /// Allocate an empty to-space block for generation `gen`.
    pub(crate) fn alloc_to_space_block(&self, gen: usize) -> Block {
        self.allocator
            .alloc_group(1, gen, self.generations[gen].to(), BlockFlags::EVACUATED)
    }

    pub(crate) fn free_group(&self, block: Block) {
        self.allocator.free_group(block)
    }

    /// The generation an object lives in. Static closures report the oldest generation.
    pub fn generation_of(&self, object: ObjectReference) -> usize {
        Block::containing(object).gen_no()
    }

    /// Is the object in the static area?
    pub fn is_static(&self, object: ObjectReference) -> bool {
        Block::containing(object).has_flag(BlockFlags::STATIC)
    }

    /// Every object in a generation, in address order within each block.
    pub fn objects_in(&self, gen: usize) -> Vec<ObjectReference> {
        let generation = &self.generations[gen];
        let mut objects: Vec<ObjectReference> = generation
            .blocks()
            .into_iter()
            .flat_map(ObjectIterator::new)
            .collect();
        objects.extend(
            generation
                .large_objects()
                .into_iter()
                .map(|b| ObjectReference::from_raw_address(b.payload_start())),
        );
        objects
    }

    pub fn static_blocks(&self) -> Vec<Block> {
        self.statics.lock().clone()
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        for generation in self.generations.iter() {
            for block in generation.drain_all() {
                self.allocator.free_group(block);
            }
        }
        for block in self.statics.lock().drain(..) {
            self.allocator.free_group(block);
        }
        // An unfinished collection still holds to-space blocks.
        if !std::thread::panicking() {
            debug_assert_eq!(self.allocator.blocks_in_use(), 0);
        }
    }
}
