//! The scavenging phase of a generational copying garbage collector for a lazy functional
//! runtime.
//!
//! Roots are evacuated into to-space blocks; the scan loop then walks the to-space, tracing
//! every closure it finds by kind (constructors, functions, thunks, partial applications,
//! mutable variables and card-marked arrays, threads and their stack chunks, static closures and
//! the static reference tables of code), until no worker can find anything left to scan.
//! Remembered sets of the generations not being collected are traced and rebuilt on the way.
//!
//! The scavenger runs either on one thread ([`scavenge::Sequential`]) or on several GC threads
//! that claim objects with atomic forwarding and share full to-space blocks
//! ([`scavenge::Parallel`]).
//!
//! Start with [`memory_manager`] for the runtime-facing API.

#[macro_use]
extern crate log;

#[macro_use]
pub mod util;

pub mod collection;
pub mod memory_manager;
pub mod object;
pub mod scavenge;
pub mod scheduler;
pub mod storage;

#[cfg(test)]
mod tests;

pub use crate::collection::{Collection, Roots};
pub use crate::storage::{Capability, Heap};
pub use crate::util::options::Options;
pub use crate::util::statistics::ScavengeStats;
pub use crate::util::{Address, ObjectReference};
