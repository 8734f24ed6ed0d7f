#[macro_use]
mod macros;

/// Address and object reference types.
pub mod address;
/// Constants used across the crate.
pub mod constants;
/// Calculation, conversion and rounding for memory related numbers.
pub mod conversions;
/// The logger used by the scavenger.
pub mod logger;
/// Forwarding state in closure headers.
pub mod object_forwarding;
/// Runtime options.
pub mod options;
/// Counters for a collection.
pub mod statistics;
/// Helpers for tests and benchmarks.
#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ObjectReference;
