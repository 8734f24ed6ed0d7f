//! Static closures reached in a major collection.
//!
//! A static closure is threaded through its static link word. The word is zero while the
//! closure is on no list; the first worker to swap in a non-zero link owns it for the rest of
//! the collection, which makes keeping a static closure alive idempotent. Lists end with
//! [`END_OF_STATIC_LIST`], which is odd and so never a closure address.

use super::{ScavengeContext, ScavengeMode};
use crate::object::closure;
use crate::object::{ClosureKind, InfoTable};
use crate::util::{Address, ObjectReference};

pub(crate) const END_OF_STATIC_LIST: usize = 0b11;

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Put a static closure on this worker's pending list unless some list already has it.
    pub(super) fn keep_static_alive(&mut self, object: ObjectReference) {
        let info = closure::get_info(object);
        if !info.kind().is_static() {
            fatal!(
                "Closure {} of kind {} in the static area",
                object,
                info.kind().name()
            );
        }
        let link = closure::static_link(object, info);
        if M::claim_word(link, 0, self.static_objects) {
            self.static_objects = object.value();
            self.stats.statics_kept_alive += 1;
        }
    }

    pub(crate) fn has_pending_statics(&self) -> bool {
        self.static_objects != END_OF_STATIC_LIST
    }

    /// Trace the pending static closures until none is left. Each moves to the scavenged list.
    pub(crate) fn scavenge_static(&mut self) {
        let oldest = self.heap.oldest_generation();
        let saved_evac_gen = self.evac_gen;
        self.evac_gen = oldest;
        while self.static_objects != END_OF_STATIC_LIST {
            let object = ObjectReference::from_raw_address(unsafe { Address::from_usize(self.static_objects) });
            let info = closure::get_info(object);
            let link = closure::static_link(object, info);
            self.static_objects = closure::read_word(link);
            closure::write_word(link, self.scavenged_static_objects);
            self.scavenged_static_objects = object.value();

            self.failed_to_evac = false;
            self.stats.objects_scavenged[info.kind()] += 1;
            self.scavenge_static_closure(object, info);
            if self.failed_to_evac {
                self.failed_to_evac = false;
                self.remember(object, oldest);
            }
        }
        self.evac_gen = saved_evac_gen;
    }

    /// Trace a static closure's pointer fields and SRT. Returns its size in words.
    pub(super) fn scavenge_static_closure(&mut self, object: ObjectReference, info: &InfoTable) -> usize {
        for i in 0..info.layout().ptrs as usize {
            self.evacuate(closure::field(object, closure::HEADER_WORDS + i));
        }
        match info.kind() {
            ClosureKind::FunStatic => self.scavenge_fun_srt(info),
            ClosureKind::ThunkStatic => self.scavenge_thunk_srt(info),
            _ => {}
        }
        closure::static_closure_words(info)
    }
}

/// Clear the static link of every closure on a list, so that the next major collection finds
/// them unvisited.
pub(crate) fn reset_static_links(mut list: usize) -> usize {
    let mut n = 0;
    while list != END_OF_STATIC_LIST {
        let object = ObjectReference::from_raw_address(unsafe { Address::from_usize(list) });
        let link = closure::static_link(object, closure::get_info(object));
        list = closure::read_word(link);
        closure::write_word(link, 0);
        n += 1;
    }
    n
}
