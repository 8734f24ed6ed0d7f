//! Stack frames.

use super::{ScavengeContext, ScavengeMode};
use crate::object::closure::{self, frame, StackChunk};
use crate::object::ClosureKind;
use crate::util::{Address, ObjectReference};

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Trace the frames in `[p, stack_end)`, most recent first.
    ///
    /// Each frame's layout comes from its info table. An underflow frame at the bottom of a
    /// chunk links to the next chunk, which is evacuated and traced like any other chunk. No
    /// word at or past `stack_end` is read.
    pub fn scavenge_stack(&mut self, mut p: Address, stack_end: Address) {
        while p < stack_end {
            let info = closure::get_frame_info(p);
            let kind = info.kind();
            let bitmap = info.bitmap();
            let size = match kind {
                ClosureKind::UpdateFrame => frame::UPDATE_WORDS,
                ClosureKind::UnderflowFrame => frame::UNDERFLOW_WORDS,
                ClosureKind::StopFrame => frame::STOP_WORDS,
                ClosureKind::RetSmall | ClosureKind::RetBig => {
                    let Some(bitmap) = bitmap else {
                        fatal!("Return frame {} at {} has no layout", info.name(), p);
                    };
                    if (kind == ClosureKind::RetSmall) != bitmap.is_small()
                        || (bitmap.is_small() && bitmap.size() > self.small_bitmap_max_bits)
                    {
                        fatal!(
                            "Frame {} at {} is a {} with a mismatched bitmap {:?}",
                            info.name(),
                            p,
                            kind.name(),
                            bitmap
                        );
                    }
                    frame::PAYLOAD + bitmap.size()
                }
                kind => fatal!(
                    "scavenge_stack: weird activation record {} found on stack at {}",
                    kind.name(),
                    p
                ),
            };
            if p.word(size) > stack_end {
                fatal!(
                    "Frame {} at {} ({} words) overruns the stack end {}",
                    info.name(),
                    p,
                    size,
                    stack_end
                );
            }
            self.stats.frames_scanned += 1;
            match kind {
                ClosureKind::UpdateFrame => self.evacuate(p.word(frame::UPDATEE)),
                ClosureKind::UnderflowFrame => {
                    let next_chunk = p.word(frame::NEXT_CHUNK);
                    self.evacuate(next_chunk);
                    self.scavenge_unscheduled_stack(closure::read_ref(next_chunk));
                }
                ClosureKind::RetSmall | ClosureKind::RetBig => {
                    if let Some(bitmap) = bitmap {
                        self.scavenge_bitmap(p.word(frame::PAYLOAD), bitmap, size - frame::PAYLOAD);
                    }
                    self.scavenge_info_srt(info);
                }
                _ => {}
            }
            p = p.word(size);
        }
    }

    /// A stack chunk: its live frames from `sp` down to the bottom. The dirty flag is left set
    /// only if a frame still refers to a younger generation.
    pub fn scavenge_stack_chunk(&mut self, stack: ObjectReference) -> usize {
        let chunk = StackChunk::new(stack);
        let saved_eager_promotion = self.eager_promotion;
        self.eager_promotion = false;
        let failed_before = std::mem::replace(&mut self.failed_to_evac, false);
        self.scavenge_stack(chunk.sp(), chunk.stack_end());
        chunk.set_dirty(self.failed_to_evac);
        self.failed_to_evac |= failed_before;
        self.eager_promotion = saved_eager_promotion;
        closure::STACK_PAYLOAD + chunk.stack_size()
    }
}
