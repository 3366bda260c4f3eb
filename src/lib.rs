//! revcache - an in-memory revision cache for Git history browsers
//!
//! This crate holds the data backbone of a graph-log view: it ingests a
//! repository's commit log as it is streamed from an external VCS process,
//! keeps commits in traversal order, parses compact diff-metadata records
//! into structured file-change sets, computes the lane topology used to
//! draw branch/merge lines, and maintains a synthetic working-directory row
//! spliced on top of the history on every refresh.
//!
//! # Example
//!
//! ```
//! use revcache::model::{Commit, CommitId};
//! use revcache::store::RevisionCache;
//! use chrono::DateTime;
//!
//! let cache = RevisionCache::new();
//! cache.begin_bulk_load(1);
//! cache.insert_during_bulk_load(
//!     Commit::new(
//!         CommitId::parse("1b2e5a9f3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f"),
//!         vec![],
//!         "Alice <alice@example.com>",
//!         DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
//!         "initial commit",
//!         "",
//!     ),
//!     1,
//! );
//! cache.end_bulk_load();
//!
//! let head = cache.get_by_hash("1b2e5a9f").unwrap();
//! assert_eq!(head.summary(), "initial commit");
//! ```

pub mod lanes;
pub mod model;
pub mod parser;
pub mod store;
