//! Heap storage: blocks, generations and the per-capability remembered sets.

pub mod block;
pub mod block_allocator;
pub mod capability;
pub mod generation;
pub mod heap;
pub mod linear_scan;
pub mod sanity;

pub use block::{Block, BlockFlags};
pub use capability::{Capability, MutList};
pub use generation::Generation;
pub use heap::Heap;
