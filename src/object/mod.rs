//! The object model: info tables, closure kinds and closure layouts.

pub mod builtin;
pub mod closure;
pub mod info;

pub use info::{Bitmap, ClosureKind, InfoTable, Layout, Srt};
