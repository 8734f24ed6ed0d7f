//! Runtime-tunable knobs of the scavenger.
//!
//! Every option has a type, a validator and a default. Defaults can be overridden through
//! environment variables named `SCAVENGER_<OPTION>` (e.g. `SCAVENGER_CARD_BITS=9`) or
//! programmatically through [`Options::set_from_str`].

use crate::util::constants::*;

fn always_valid<T>(_: &T) -> bool {
    true
}

/// Environment variables are matched against option names after stripping this prefix.
const ENV_PREFIX: &str = "SCAVENGER_";

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),* $(,)?) => [
        /// Scavenger options.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }

        impl Options {
            /// The built-in defaults, ignoring the environment.
            pub fn new() -> Self {
                Options {
                    $($name: $default),*
                }
            }

            /// Parse and validate `value` for the option called `name`. On failure the option
            /// keeps its current value and false is returned.
            pub fn set_from_str(&mut self, name: &str, value: &str) -> bool {
                match name {
                    $(stringify!($name) => match value.parse::<$type>() {
                        Ok(parsed) if ($validator)(&parsed) => {
                            self.$name = parsed;
                            true
                        }
                        Ok(parsed) => {
                            warn!("Ignoring {}={:?}: out of range.", name, parsed);
                            false
                        }
                        Err(_) => {
                            warn!("Ignoring {}={:?}: cannot parse.", name, value);
                            false
                        }
                    },)*
                    _ => {
                        warn!("Ignoring unknown option {}.", name);
                        false
                    }
                }
            }

            /// Apply every `SCAVENGER_<NAME>` variable in the environment that names an option.
            fn read_env(&mut self) {
                for (key, value) in std::env::vars() {
                    let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                        continue;
                    };
                    let name = name.to_lowercase();
                    if [$(stringify!($name)),*].contains(&name.as_str()) {
                        self.set_from_str(&name, &value);
                    }
                }
            }
        }

        impl Default for Options {
            fn default() -> Self {
                let mut options = Options::new();
                options.read_env();
                options
            }
        }
    ]
}

options! {
    /// Number of GC worker threads. One worker selects the sequential scavenger.
    threads:               usize  [|v: &usize| *v > 0] = num_cpus::get(),
    /// Number of generations in the heap, the nursery included.
    generations:           usize  [|v: &usize| *v > 0 && *v <= MAX_GENERATIONS] = 2,
    /// log2 of the number of array elements covered by one card of a mutable pointer array.
    card_bits:             usize  [|v: &usize| *v > 0 && *v <= 16] = DEFAULT_LOG_CARD_ELEMENTS,
    /// Frames and argument layouts with at most this many slots use the single-word bitmap encoding.
    small_bitmap_max_bits: usize  [|v: &usize| *v > 0 && *v <= BITS_IN_WORD] = BITS_IN_WORD,
    /// Objects of more than this many words are allocated as large objects and never copied.
    large_object_words:    usize  [|v: &usize| *v > 0 && *v <= BLOCK_PAYLOAD_WORDS] = DEFAULT_LARGE_OBJECT_WORDS,
    /// Promote objects referenced from an old generation straight into that generation.
    eager_promotion:       bool   [always_valid] = true,
    /// Let idle workers claim full to-space blocks queued by other workers.
    work_stealing:         bool   [always_valid] = true,
    /// Number of remembered-set entries handed out per claim in a parallel collection.
    mut_list_chunk:        usize  [|v: &usize| *v > 0] = DEFAULT_MUT_LIST_CHUNK,
}

impl Options {
    /// Number of elements covered by one card.
    pub fn card_elements(&self) -> usize {
        1 << self.card_bits
    }

    /// Index of the oldest generation.
    pub fn oldest_generation(&self) -> usize {
        self.generations - 1
    }
}
