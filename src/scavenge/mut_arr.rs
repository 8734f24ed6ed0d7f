//! Mutable pointer arrays and their card tables.
//!
//! The mutator's write barrier marks the card covering each element it writes. An array on a
//! remembered set only needs its marked cards traced; an array that was just copied has every
//! card traced. Either way a card stays marked afterwards exactly when one of its elements
//! still refers to a younger generation.

use super::{ScavengeContext, ScavengeMode};
use crate::object::builtin;
use crate::object::closure::MutArrPtrs;
use crate::util::{Address, ObjectReference};

impl<'c, M: ScavengeMode> ScavengeContext<'c, M> {
    /// Trace the elements of the marked cards of an array. Returns the address just past the
    /// array.
    pub fn scavenge_mut_arr_ptrs(&mut self, object: ObjectReference) -> Address {
        self.scavenge_cards(object, true)
    }

    /// Trace every element of an array regardless of its card marks. Returns the address just
    /// past the array.
    pub fn scavenge_mut_arr_ptrs_all_cards(&mut self, object: ObjectReference) -> Address {
        self.scavenge_cards(object, false)
    }

    fn scavenge_cards(&mut self, object: ObjectReference, marked_only: bool) -> Address {
        let array = MutArrPtrs::new(object, self.card_bits);
        let saved_eager_promotion = self.eager_promotion;
        self.eager_promotion = false;
        let mut any_failed = false;
        for card in 0..array.cards() {
            if marked_only && !array.is_card_dirty(card) {
                self.stats.cards_skipped += 1;
                continue;
            }
            self.failed_to_evac = false;
            for i in array.card_elements(card) {
                self.evacuate(array.element(i));
            }
            array.set_card(card, self.failed_to_evac);
            any_failed |= self.failed_to_evac;
            self.stats.cards_scanned += 1;
        }
        self.eager_promotion = saved_eager_promotion;
        self.failed_to_evac = any_failed;
        crate::object::closure::set_info(object, builtin::mut_arr_ptrs(any_failed));
        array.end()
    }
}
