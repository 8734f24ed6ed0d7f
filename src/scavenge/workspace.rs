use crate::storage::Block;

/// A worker's view of one generation during a collection: where it copies survivors to, and the
/// blocks it still has to scan.
#[derive(Debug)]
pub(crate) struct GenWorkspace {
    pub gen_no: usize,
    /// The block survivors are currently copied into.
    pub todo_block: Option<Block>,
    /// Full blocks waiting to be scanned by this worker.
    pub todo_q: Vec<Block>,
    /// Large objects claimed by this worker and not scanned yet.
    pub todo_large: Vec<Block>,
    /// Blocks whose every object has been scanned.
    pub scavenged: Vec<Block>,
    pub scavenged_large: Vec<Block>,
}

impl GenWorkspace {
    pub fn new(gen_no: usize) -> Self {
        GenWorkspace {
            gen_no,
            todo_block: None,
            todo_q: vec![],
            todo_large: vec![],
            scavenged: vec![],
            scavenged_large: vec![],
        }
    }

    /// Is there anything left to scan?
    pub fn has_work(&self) -> bool {
        self.todo_block.is_some_and(|b| !b.is_scanned())
            || !self.todo_q.is_empty()
            || !self.todo_large.is_empty()
    }
}
