//! Sequential and parallel scavenging share one body of code, specialised at compile time by a
//! [`ScavengeMode`]. The modes differ only where workers could race: claiming an object for
//! copying, claiming a static closure, and where full to-space blocks are queued.

use crate::util::Address;
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait ScavengeMode: 'static {
    /// Several workers share the heap.
    const PARALLEL: bool;

    /// Replace the word at `addr` with `new` if it holds `expected`. Returns true if this call
    /// made the change.
    fn claim_word(addr: Address, expected: usize, new: usize) -> bool;
}

/// A single GC thread.
pub struct Sequential;

impl ScavengeMode for Sequential {
    const PARALLEL: bool = false;

    fn claim_word(addr: Address, expected: usize, new: usize) -> bool {
        unsafe {
            if addr.load::<usize>() != expected {
                return false;
            }
            addr.store::<usize>(new);
        }
        true
    }
}

/// One of several GC threads.
pub struct Parallel;

impl ScavengeMode for Parallel {
    const PARALLEL: bool = true;

    fn claim_word(addr: Address, expected: usize, new: usize) -> bool {
        unsafe {
            addr.compare_exchange::<AtomicUsize>(expected, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        }
    }
}
