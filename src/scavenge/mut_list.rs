//! Remembered sets of the generations that are not being collected.

use super::{ScavengeContext, ScavengeMode};
use crate::storage::Capability;
use crate::util::ObjectReference;

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Trace the saved remembered sets of a capability and rebuild its current ones.
    ///
    /// Every entry is traced as if it lived in its own generation, so its referents are
    /// promoted at least that far. An entry stays remembered only if it still refers to a
    /// younger generation afterwards.
    pub fn scavenge_capability_mut_lists(&mut self, cap: &mut Capability) {
        for gen in (self.cycle.collect_gen() + 1)..self.heap.n_generations() {
            let saved = cap.take_saved_mut_list(gen);
            let retained = self.scavenge_mutable_list(saved.as_slice(), gen);
            for object in retained {
                cap.record_mutable_in(object, gen);
            }
        }
    }

    /// Trace the entries of one remembered set of generation `gen`. Returns the entries that
    /// must stay remembered.
    pub fn scavenge_mutable_list(&mut self, entries: &[ObjectReference], gen: usize) -> Vec<ObjectReference> {
        let saved_evac_gen = self.evac_gen;
        self.evac_gen = gen;
        let mut retained = vec![];
        for &object in entries {
            self.stats.mut_list_entries += 1;
            if self.scavenge_one(object) {
                retained.push(object);
            }
        }
        self.stats.mut_list_retained += retained.len();
        self.evac_gen = saved_evac_gen;
        retained
    }

    /// Claim and trace chunks of the shared remembered sets until none is left. Surviving
    /// entries are remembered by this worker.
    pub(crate) fn scavenge_claimed_mut_lists(&mut self) -> bool {
        let cycle = self.cycle;
        let mut claimed = false;
        while let Some((gen, entries)) = cycle.mut_list_claims.claim() {
            claimed = true;
            let retained = self.scavenge_mutable_list(entries, gen);
            self.remembered[gen].extend(retained);
        }
        claimed
    }
}
