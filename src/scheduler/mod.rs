//! Parallel GC machinery: shared work queues, remembered-set claiming, termination detection,
//! and the worker body.

pub mod termination;
pub mod work_queues;
pub(crate) mod worker;
