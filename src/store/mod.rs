//! the revision store: central owner of all cached state.

mod cache;
mod error;

pub use cache::{BranchDistances, RevisionCache};
pub use error::{CacheError, CacheResult};
