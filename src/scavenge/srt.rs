//! Static reference tables.
//!
//! Static closures only die in a major collection, so SRTs are traced in major collections
//! only. Every live SRT entry is put on the static-object list the first time it is seen.

use super::{ScavengeContext, ScavengeMode};
use crate::object::{InfoTable, Srt};
use crate::storage::{Block, BlockFlags};

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Trace the SRT of a function's info table.
    pub fn scavenge_fun_srt(&mut self, info: &InfoTable) {
        debug_assert!(info.kind().is_fun());
        self.scavenge_info_srt(info)
    }

    /// Trace the SRT of a thunk's info table.
    pub fn scavenge_thunk_srt(&mut self, info: &InfoTable) {
        debug_assert!(info.kind().is_thunk());
        self.scavenge_info_srt(info)
    }

    pub(super) fn scavenge_info_srt(&mut self, info: &InfoTable) {
        if !self.cycle.is_major() {
            return;
        }
        if let Some(srt) = info.srt() {
            self.scavenge_srt(srt, info);
        }
    }

    fn scavenge_srt(&mut self, srt: &Srt, owner: &InfoTable) {
        if let Some(bit) = srt.first_stray_bit() {
            fatal!(
                "SRT of {} has bit {} set but only {} entries",
                owner.name(),
                bit,
                srt.len()
            );
        }
        for (i, &entry) in srt.entries().iter().enumerate() {
            if !srt.is_live(i) {
                continue;
            }
            self.stats.srt_entries_visited += 1;
            if entry.is_null() || !Block::containing(entry).has_flag(BlockFlags::STATIC) {
                fatal!(
                    "SRT entry {} of {} is {}, not a static closure",
                    i,
                    owner.name(),
                    entry
                );
            }
            self.keep_static_alive(entry);
        }
    }
}
