//! The object tracer: one case per closure kind.

use super::{ScavengeContext, ScavengeMode};
use crate::object::closure::{self, tso, StackChunk, Tso};
use crate::object::info::Bitmap;
use crate::object::{builtin, ClosureKind, InfoTable};
use crate::storage::{Block, BlockFlags};
use crate::util::{Address, ObjectReference};

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Evacuate everything `object` refers to and return its size in words.
    ///
    /// Mutable arrays have every card traced here; [`Self::scavenge_one`] traces only the
    /// marked cards of an array that is on a remembered set.
    pub fn scavenge_object(&mut self, object: ObjectReference) -> usize {
        let info = closure::get_info(object);
        let kind = info.kind();
        self.stats.objects_scavenged[kind] += 1;
        match kind {
            ClosureKind::Constr => self.scavenge_fields(object, info),
            ClosureKind::Fun => {
                self.scavenge_fun_srt(info);
                self.scavenge_fields(object, info)
            }
            ClosureKind::Thunk => {
                self.scavenge_thunk_srt(info);
                self.scavenge_fields(object, info)
            }
            ClosureKind::Pap | ClosureKind::Ap => self.scavenge_pap(object),
            ClosureKind::ApStack => self.scavenge_ap_stack(object),
            ClosureKind::Ind => {
                self.evacuate(closure::field(object, closure::IND_INDIRECTEE));
                2
            }
            ClosureKind::MutVarClean | ClosureKind::MutVarDirty => self.scavenge_mut_var(object),
            ClosureKind::MutArrPtrsClean | ClosureKind::MutArrPtrsDirty => {
                let end = self.scavenge_mut_arr_ptrs_all_cards(object);
                end.words_from(object.to_raw_address())
            }
            ClosureKind::ArrWords => closure::closure_size(object, info),
            ClosureKind::Tso => self.scavenge_tso(object),
            ClosureKind::Stack => self.scavenge_stack_chunk(object),
            ClosureKind::ConstrStatic
            | ClosureKind::FunStatic
            | ClosureKind::ThunkStatic
            | ClosureKind::IndStatic => self.scavenge_static_closure(object, info),
            ClosureKind::RetSmall
            | ClosureKind::RetBig
            | ClosureKind::UpdateFrame
            | ClosureKind::UnderflowFrame
            | ClosureKind::StopFrame => fatal!(
                "scavenge: unimplemented/strange closure type {} at {}",
                kind.name(),
                object
            ),
        }
    }

    /// Trace a single object that stays where it is, such as a remembered-set entry. Returns
    /// true if the object still refers to a younger generation, in which case it must stay
    /// remembered.
    pub fn scavenge_one(&mut self, object: ObjectReference) -> bool {
        self.failed_to_evac = false;
        match closure::get_info(object).kind() {
            kind @ (ClosureKind::MutArrPtrsClean | ClosureKind::MutArrPtrsDirty) => {
                self.stats.objects_scavenged[kind] += 1;
                self.scavenge_mut_arr_ptrs(object);
            }
            _ => {
                self.scavenge_object(object);
            }
        }
        std::mem::replace(&mut self.failed_to_evac, false)
    }

    /// Pointer fields first, then non-pointers.
    fn scavenge_fields(&mut self, object: ObjectReference, info: &InfoTable) -> usize {
        let layout = info.layout();
        for i in 0..layout.ptrs as usize {
            self.evacuate(closure::field(object, closure::HEADER_WORDS + i));
        }
        closure::HEADER_WORDS + layout.payload_words()
    }

    /// Evacuate the pointer slots among `n` words at `base`, as described by `bitmap`.
    pub(super) fn scavenge_bitmap(&mut self, base: Address, bitmap: &Bitmap, n: usize) {
        if !bitmap.is_well_formed() || n > bitmap.size() {
            fatal!(
                "Malformed layout bitmap {:?} describing {} words at {}",
                bitmap,
                n,
                base
            );
        }
        for i in 0..n {
            if bitmap.is_pointer(i) {
                self.evacuate(base.word(i));
            }
        }
    }

    /// Partial and saturated applications: the function, then the arguments as laid out by the
    /// function's argument bitmap.
    fn scavenge_pap(&mut self, object: ObjectReference) -> usize {
        let n_args = closure::read_word(closure::field(object, closure::PAP_N_ARGS));
        let fun_slot = closure::field(object, closure::PAP_FUN);
        self.evacuate(fun_slot);
        let fun = closure::read_ref(fun_slot);
        let fun_info = closure::get_info(fun);
        if !fun_info.kind().is_fun() {
            fatal!(
                "Application {} applies {} of kind {}",
                object,
                fun,
                fun_info.kind().name()
            );
        }
        let Some(bitmap) = fun_info.bitmap() else {
            fatal!("Function {} ({}) has no argument layout", fun, fun_info.name());
        };
        self.scavenge_bitmap(closure::field(object, closure::PAP_PAYLOAD), bitmap, n_args);
        closure::PAP_PAYLOAD + n_args
    }

    fn scavenge_ap_stack(&mut self, object: ObjectReference) -> usize {
        let size = closure::read_word(closure::field(object, closure::AP_STACK_SIZE));
        self.evacuate(closure::field(object, closure::AP_STACK_FUN));
        let payload = closure::field(object, closure::AP_STACK_PAYLOAD);
        self.scavenge_stack(payload, payload.word(size));
        closure::AP_STACK_PAYLOAD + size
    }

    /// Mutable objects are traced without eager promotion: the referent may be overwritten
    /// soon, so it is not worth promoting. The header records whether a young pointer remains.
    fn scavenge_mut_var(&mut self, object: ObjectReference) -> usize {
        let saved_eager_promotion = self.eager_promotion;
        self.eager_promotion = false;
        self.evacuate(closure::field(object, closure::MUT_VAR_VAR));
        self.eager_promotion = saved_eager_promotion;
        closure::set_info(object, builtin::mut_var(self.failed_to_evac));
        2
    }

    /// A thread: its link fields, then its stack.
    pub fn scavenge_tso(&mut self, object: ObjectReference) -> usize {
        let thread = Tso::new(object);
        let saved_eager_promotion = self.eager_promotion;
        self.eager_promotion = false;
        for offset in tso::LINK_FIELDS {
            self.evacuate(thread.slot(offset));
        }
        self.evacuate(thread.stack_slot());
        self.scavenge_unscheduled_stack(thread.stack());
        self.eager_promotion = saved_eager_promotion;
        thread.set_dirty(self.failed_to_evac);
        tso::WORDS
    }

    /// Will the scan loop get to `object` in this collection?
    pub(super) fn will_be_scanned(&self, object: ObjectReference) -> bool {
        Block::containing(object).has_flag(BlockFlags::EVACUATED)
    }

    /// A stack chunk that stays in an uncollected generation is not scanned by the loop.
    /// Trace it now if the mutator has written to it since the last collection.
    pub(super) fn scavenge_unscheduled_stack(&mut self, stack: ObjectReference) {
        if stack.is_null() || self.will_be_scanned(stack) {
            return;
        }
        if StackChunk::new(stack).is_dirty() {
            self.scavenge_stack_chunk(stack);
        }
    }

    /// A root thread. The thread is evacuated like any root; if it stays in an uncollected
    /// generation it is traced here, in that generation.
    pub fn scavenge_thread_root(&mut self, root: &mut ObjectReference) {
        self.evacuate_root(root);
        let thread = *root;
        if thread.is_null() || self.will_be_scanned(thread) {
            return;
        }
        let gen = Block::containing(thread).gen_no();
        let saved_evac_gen = self.evac_gen;
        self.evac_gen = gen;
        self.failed_to_evac = false;
        self.scavenge_tso(thread);
        if self.failed_to_evac {
            self.remember(thread, gen);
        }
        self.failed_to_evac = false;
        self.evac_gen = saved_evac_gen;
    }
}
