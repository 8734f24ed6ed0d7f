use log::SetLoggerError;

/// Install an `env_logger` that reports collection summaries by default (`scavenger=info`).
///
/// Without the `builtin_env_logger` feature this is a no-op and the embedding runtime is
/// expected to install its own `log` backend.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "scavenger=info");
            env_logger::try_init_from_env(env)
        } else {
            Ok(())
        }
    }
}

pub(crate) fn init_once() {
    if try_init().is_err() {
        debug!("A logger was already installed; scavenger keeps it.");
    }
}
