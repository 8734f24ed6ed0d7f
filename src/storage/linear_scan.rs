use super::block::Block;
use crate::object::closure::{closure_size, get_info};
use crate::util::{Address, ObjectReference};

/// Iterate over the objects of a block, from its first payload word up to its free pointer.
/// Every object in the range must carry an info pointer, i.e. none may be forwarded.
pub struct ObjectIterator {
    cursor: Address,
    end: Address,
}

impl ObjectIterator {
    pub fn new(block: Block) -> Self {
        ObjectIterator {
            cursor: block.payload_start(),
            end: block.free(),
        }
    }

    /// Iterate over `[start, end)`.
    pub fn over(start: Address, end: Address) -> Self {
        debug_assert!(start <= end);
        ObjectIterator { cursor: start, end }
    }
}

impl std::iter::Iterator for ObjectIterator {
    type Item = ObjectReference;

    fn next(&mut self) -> Option<ObjectReference> {
        if self.cursor >= self.end {
            return None;
        }
        let object = ObjectReference::from_raw_address(self.cursor);
        self.cursor = self.cursor.word(closure_size(object, get_info(object)));
        Some(object)
    }
}
