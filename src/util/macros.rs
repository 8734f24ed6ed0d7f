/// Report a violated heap invariant and stop the collection.
///
/// A half-scavenged heap has no consistent state to fall back to, so there is no error value to
/// return: the message is logged at `error` level and the current thread panics. Runtimes that
/// build with `panic = "abort"` get a process abort.
macro_rules! fatal {
    ($($arg:tt)*) => {{
        error!($($arg)*);
        panic!("scavenger: heap corruption: {}", format_args!($($arg)*))
    }};
}
