//! error types for cache operations.
//!
//! Almost every failure in this crate is a non-error by design: not-ready
//! and not-found outcomes surface as `Option`/`bool`/empty collections. The
//! variants here cover the few operations with a contract worth failing.

use thiserror::Error;

/// the main error type for cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// a hash rewrite referenced an entry that was never cached
    #[error("commit not found: {0}")]
    CommitNotFound(String),
}

/// result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
