//! Forwarding state kept in a closure's header word.
//!
//! A header word holds one of:
//! * an info-table pointer (word aligned, so its two low bits are zero),
//! * `BEING_FORWARDED`, while a parallel worker owns the copy of the object,
//! * the address of the copy tagged with `FORWARDED_TAG`.

use crate::util::{Address, ObjectReference};
use std::sync::atomic::{AtomicUsize, Ordering};

const FORWARDED_TAG: usize = 0b01;
const BEING_FORWARDED: usize = 0b10;
const TAG_MASK: usize = 0b11;

/// Decoded header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// The header holds an info-table pointer.
    Info(usize),
    /// A worker is copying the object right now.
    BeingForwarded,
    /// The object has been copied to the given address.
    Forwarded(ObjectReference),
}

impl HeaderState {
    pub fn decode(word: usize) -> HeaderState {
        if word == BEING_FORWARDED {
            HeaderState::BeingForwarded
        } else if word & TAG_MASK == FORWARDED_TAG {
            HeaderState::Forwarded(ObjectReference::from_raw_address(unsafe {
                Address::from_usize(word & !TAG_MASK)
            }))
        } else {
            HeaderState::Info(word)
        }
    }
}

/// Load the header word of an object.
pub fn load_header(object: ObjectReference) -> usize {
    unsafe {
        object
            .to_raw_address()
            .atomic_load::<AtomicUsize>(Ordering::Acquire)
    }
}

/// Store an info pointer into the header word of an object.
pub fn store_header(object: ObjectReference, header: usize) {
    unsafe {
        object
            .to_raw_address()
            .atomic_store::<AtomicUsize>(header, Ordering::Release)
    }
}

/// Attempt to become the worker who will copy the object.
/// The successful worker swaps `header` for `BEING_FORWARDED`, preventing other workers from copying
/// the same object. On failure the header observed instead is returned.
pub fn attempt_to_forward(object: ObjectReference, header: usize) -> Result<(), usize> {
    debug_assert!(matches!(HeaderState::decode(header), HeaderState::Info(_)));
    unsafe {
        object
            .to_raw_address()
            .compare_exchange::<AtomicUsize>(
                header,
                BEING_FORWARDED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
    }
}

/// Spin-wait for the forwarding of an object to complete and then return the copy.
pub fn spin_and_get_forwarded_object(object: ObjectReference) -> ObjectReference {
    let backoff = crossbeam::utils::Backoff::new();
    loop {
        match HeaderState::decode(load_header(object)) {
            HeaderState::Forwarded(new_object) => return new_object,
            HeaderState::BeingForwarded => backoff.snooze(),
            HeaderState::Info(word) => fatal!(
                "Object {} lost its forwarding claim (header {:#x})",
                object,
                word
            ),
        }
    }
}

/// Publish the forwarding pointer of a copied object.
pub fn forward_object(object: ObjectReference, new_object: ObjectReference) {
    debug_assert!(new_object.value() & TAG_MASK == 0);
    trace!("forward_object({}, {})", object, new_object);
    store_header(object, new_object.value() | FORWARDED_TAG);
}

/// Is the object forwarded, or being forwarded by some worker?
pub fn is_forwarded_or_being_forwarded(object: ObjectReference) -> bool {
    !matches!(HeaderState::decode(load_header(object)), HeaderState::Info(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn object_at(words: &[AtomicUsize; 2]) -> ObjectReference {
        ObjectReference::from_raw_address(Address::from_ref(&words[0]))
    }

    #[test]
    fn decode_states() {
        assert_eq!(HeaderState::decode(0x1000), HeaderState::Info(0x1000));
        assert_eq!(HeaderState::decode(BEING_FORWARDED), HeaderState::BeingForwarded);
        match HeaderState::decode(0x2000 | FORWARDED_TAG) {
            HeaderState::Forwarded(o) => assert_eq!(o.value(), 0x2000),
            s => panic!("unexpected {:?}", s),
        }
    }

    #[test]
    fn claim_then_forward() {
        let old = [AtomicUsize::new(0x1000), AtomicUsize::new(0)];
        let new = [AtomicUsize::new(0x1000), AtomicUsize::new(0)];
        let old_obj = object_at(&old);
        let new_obj = object_at(&new);

        assert!(attempt_to_forward(old_obj, 0x1000).is_ok());
        assert!(is_forwarded_or_being_forwarded(old_obj));
        assert_eq!(HeaderState::decode(load_header(old_obj)), HeaderState::BeingForwarded);
        // A second claimant loses and observes the claim.
        assert_eq!(attempt_to_forward(old_obj, 0x1000), Err(BEING_FORWARDED));

        forward_object(old_obj, new_obj);
        assert_eq!(HeaderState::decode(load_header(old_obj)), HeaderState::Forwarded(new_obj));
        assert_eq!(spin_and_get_forwarded_object(old_obj), new_obj);
    }
}
