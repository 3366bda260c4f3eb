//! diff-metadata parsing and path interning.

mod diff;
mod interner;

pub use diff::DiffParser;
pub use interner::NameArena;
