//! Per-worker counters gathered while scavenging, merged and logged when a collection finishes.

use crate::object::ClosureKind;
use enum_map::EnumMap;
use std::ops::AddAssign;
use std::time::Duration;
use strum::IntoEnumIterator;

#[derive(Clone, Debug, Default)]
pub struct ScavengeStats {
    /// Objects traced by the object tracer, by kind.
    pub objects_scavenged: EnumMap<ClosureKind, usize>,
    pub objects_copied: usize,
    pub words_copied: usize,
    /// Large objects claimed and relinked instead of copied.
    pub large_objects_promoted: usize,
    /// Static closures put on a static-object list this cycle.
    pub statics_kept_alive: usize,
    /// Live SRT entries visited, counting repeated visits.
    pub srt_entries_visited: usize,
    pub cards_scanned: usize,
    pub cards_skipped: usize,
    pub frames_scanned: usize,
    pub mut_list_entries: usize,
    pub mut_list_retained: usize,
    /// Objects newly recorded on a remembered set by the scan.
    pub objects_remembered: usize,
    pub blocks_scanned: usize,
    /// Blocks taken from the shared todo queues.
    pub blocks_claimed: usize,
    pub idle_rounds: usize,
    pub elapsed: Duration,
}

impl ScavengeStats {
    pub fn total_objects_scavenged(&self) -> usize {
        self.objects_scavenged.values().sum()
    }

    pub(crate) fn log_summary(&self, collect_gen: usize, workers: usize) {
        info!(
            "Scavenged generations 0..={} with {} worker(s) in {:?}: {} objects traced, {} copied ({} words), {} large promoted",
            collect_gen,
            workers,
            self.elapsed,
            self.total_objects_scavenged(),
            self.objects_copied,
            self.words_copied,
            self.large_objects_promoted
        );
        debug!(
            "statics kept alive: {}, SRT entries: {}, cards scanned/skipped: {}/{}, frames: {}",
            self.statics_kept_alive,
            self.srt_entries_visited,
            self.cards_scanned,
            self.cards_skipped,
            self.frames_scanned
        );
        debug!(
            "remembered set: {} scanned, {} retained, {} added; blocks scanned: {}, claimed: {}, idle rounds: {}",
            self.mut_list_entries,
            self.mut_list_retained,
            self.objects_remembered,
            self.blocks_scanned,
            self.blocks_claimed,
            self.idle_rounds
        );
        for kind in ClosureKind::iter().filter(|k| self.objects_scavenged[*k] != 0) {
            trace!("  {:>20}: {}", kind.name(), self.objects_scavenged[kind]);
        }
    }
}

impl AddAssign<&ScavengeStats> for ScavengeStats {
    fn add_assign(&mut self, other: &ScavengeStats) {
        for (kind, n) in other.objects_scavenged.iter() {
            self.objects_scavenged[kind] += n;
        }
        self.objects_copied += other.objects_copied;
        self.words_copied += other.words_copied;
        self.large_objects_promoted += other.large_objects_promoted;
        self.statics_kept_alive += other.statics_kept_alive;
        self.srt_entries_visited += other.srt_entries_visited;
        self.cards_scanned += other.cards_scanned;
        self.cards_skipped += other.cards_skipped;
        self.frames_scanned += other.frames_scanned;
        self.mut_list_entries += other.mut_list_entries;
        self.mut_list_retained += other.mut_list_retained;
        self.objects_remembered += other.objects_remembered;
        self.blocks_scanned += other.blocks_scanned;
        self.blocks_claimed += other.blocks_claimed;
        self.idle_rounds += other.idle_rounds;
        // Workers run concurrently; the slowest one bounds the phase.
        self.elapsed = self.elapsed.max(other.elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counters() {
        let mut a = ScavengeStats::default();
        a.objects_scavenged[ClosureKind::Constr] = 3;
        a.objects_copied = 3;
        a.elapsed = Duration::from_millis(5);
        let mut b = ScavengeStats::default();
        b.objects_scavenged[ClosureKind::Constr] = 1;
        b.objects_scavenged[ClosureKind::Tso] = 2;
        b.objects_copied = 1;
        b.elapsed = Duration::from_millis(2);

        a += &b;
        assert_eq!(a.objects_scavenged[ClosureKind::Constr], 4);
        assert_eq!(a.total_objects_scavenged(), 6);
        assert_eq!(a.objects_copied, 4);
        assert_eq!(a.elapsed, Duration::from_millis(5));
    }
}
