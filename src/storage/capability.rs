use super::block::Block;
use crate::util::ObjectReference;

/// A remembered set: objects of one generation that may point into younger generations.
#[derive(Clone, Debug, Default)]
pub struct MutList {
    entries: Vec<ObjectReference>,
}

impl MutList {
    pub fn new() -> Self {
        MutList { entries: vec![] }
    }

    pub fn push(&mut self, object: ObjectReference) {
        self.entries.push(object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, object: ObjectReference) -> bool {
        self.entries.contains(&object)
    }

    pub fn as_slice(&self) -> &[ObjectReference] {
        &self.entries
    }

    pub(crate) fn into_vec(self) -> Vec<ObjectReference> {
        self.entries
    }
}

impl Extend<ObjectReference> for MutList {
    fn extend<I: IntoIterator<Item = ObjectReference>>(&mut self, iter: I) {
        self.entries.extend(iter)
    }
}

/// Per-mutator state the scavenger touches: one remembered set per generation.
///
/// The mutator's write barrier records objects with [`Capability::record_mutable`]. A
/// collection of generations `0..=N` moves the lists of older generations aside as the saved
/// lists, traces them, and rebuilds the current lists with the entries that still point into
/// younger generations.
#[derive(Debug)]
pub struct Capability {
    no: usize,
    mut_lists: Vec<MutList>,
    saved_mut_lists: Vec<MutList>,
}

impl Capability {
    pub fn new(no: usize, generations: usize) -> Self {
        Capability {
            no,
            mut_lists: vec![MutList::new(); generations],
            saved_mut_lists: vec![MutList::new(); generations],
        }
    }

    pub fn no(&self) -> usize {
        self.no
    }

    /// Record an object that may now point into a younger generation. Objects of the nursery
    /// have no younger generation and are not recorded.
    pub fn record_mutable(&mut self, object: ObjectReference) {
        let gen = Block::containing(object).gen_no();
        self.record_mutable_in(object, gen)
    }

    pub fn record_mutable_in(&mut self, object: ObjectReference, gen: usize) {
        if gen > 0 {
            self.mut_lists[gen].push(object)
        }
    }

    pub fn mut_list(&self, gen: usize) -> &MutList {
        &self.mut_lists[gen]
    }

    /// Is the object on any current remembered set?
    pub fn is_remembered(&self, object: ObjectReference) -> bool {
        self.mut_lists.iter().any(|l| l.contains(object))
    }

    /// Ahead of a collection of `0..=collect_gen`: the lists of collected generations are
    /// dropped (their objects are all traced anyway), the others become the saved lists.
    pub(crate) fn save_mut_lists(&mut self, collect_gen: usize) {
        for (gen, list) in self.mut_lists.iter_mut().enumerate() {
            let list = std::mem::take(list);
            if gen > collect_gen {
                debug_assert!(self.saved_mut_lists[gen].is_empty());
                self.saved_mut_lists[gen] = list;
            }
        }
    }

    pub(crate) fn take_saved_mut_list(&mut self, gen: usize) -> MutList {
        std::mem::take(&mut self.saved_mut_lists[gen])
    }
}
