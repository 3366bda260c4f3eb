//! commit identity and per-commit metadata.
//!
//! The working directory row is a first-class variant of [`CommitId`] rather
//! than a magic all-zero hash, so it can never collide with a real commit.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lanes::LaneType;
use crate::model::refs::{RefKind, ReferenceSet};

/// Hex rendering of the working-directory row, kept for the display layer
/// and for parsing identifiers produced by older tooling.
const WORKING_DIR_HEX: &str = "0000000000000000000000000000000000000000";

/// Identifies a row in the cache.
///
/// `WorkingDir` is the synthetic pseudo-commit rebuilt on every refresh;
/// `Sha` is a real commit identified by its hex hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitId {
    WorkingDir,
    Sha(String),
}

impl CommitId {
    /// Parse an identifier coming from the VCS collaborator. The all-zero
    /// hash maps to `WorkingDir`.
    pub fn parse(hex: &str) -> Self {
        if hex == WORKING_DIR_HEX {
            CommitId::WorkingDir
        } else {
            CommitId::Sha(hex.to_string())
        }
    }

    /// hex form, forty zeros for the working directory row
    pub fn as_str(&self) -> &str {
        match self {
            CommitId::WorkingDir => WORKING_DIR_HEX,
            CommitId::Sha(sha) => sha,
        }
    }

    /// abbreviated form used in log records
    pub fn short(&self) -> &str {
        let s = self.as_str();
        &s[..s.len().min(7)]
    }

    pub fn is_working_dir(&self) -> bool {
        matches!(self, CommitId::WorkingDir)
    }

    /// prefix match against the hex form (abbreviated-hash lookup)
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.as_str().starts_with(prefix)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// String field of a commit addressable by substring search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitField {
    Sha,
    Author,
    Summary,
    Body,
}

/// A cached commit: identity, topology inputs and the lane snapshot assigned
/// once its row has been consumed by the lane engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    id: CommitId,
    parents: Vec<CommitId>,
    author: String,
    author_date: DateTime<Utc>,
    summary: String,
    body: String,
    lanes: Vec<LaneType>,
    references: ReferenceSet,
}

impl Commit {
    pub fn new(
        id: CommitId,
        parents: Vec<CommitId>,
        author: impl Into<String>,
        author_date: DateTime<Utc>,
        summary: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parents,
            author: author.into(),
            author_date,
            summary: summary.into(),
            body: body.into(),
            lanes: Vec::new(),
            references: ReferenceSet::default(),
        }
    }

    pub fn id(&self) -> &CommitId {
        &self.id
    }

    pub fn is_working_dir(&self) -> bool {
        self.id.is_working_dir()
    }

    pub fn parents(&self) -> &[CommitId] {
        &self.parents
    }

    pub fn parent(&self, idx: usize) -> Option<&CommitId> {
        self.parents.get(idx)
    }

    /// first parent, the one lane continuation follows
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn author_date(&self) -> DateTime<Utc> {
        self.author_date
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn lanes(&self) -> &[LaneType] {
        &self.lanes
    }

    pub fn set_lanes(&mut self, lanes: Vec<LaneType>) {
        self.lanes = lanes;
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn add_reference(&mut self, kind: RefKind, name: impl Into<String>) {
        self.references.add(kind, name);
    }

    pub fn remove_reference(&mut self, kind: RefKind, name: &str) {
        self.references.remove(kind, name);
    }

    /// Append every list of `other` onto this commit's reference set. Used
    /// when a rewritten commit inherits the references of the entry it
    /// replaces.
    pub fn merge_references(&mut self, other: &ReferenceSet) {
        self.references.merge(other);
    }

    pub fn clear_references(&mut self) {
        self.references = ReferenceSet::default();
    }

    /// The string behind `field`, as seen by substring search.
    pub fn field(&self, field: CommitField) -> &str {
        match field {
            CommitField::Sha => self.id.as_str(),
            CommitField::Author => &self.author,
            CommitField::Summary => &self.summary,
            CommitField::Body => &self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: &str, parents: &[&str]) -> Commit {
        Commit::new(
            CommitId::parse(id),
            parents.iter().map(|p| CommitId::parse(p)).collect(),
            "Alice <alice@example.com>",
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            "add feature",
            "long description",
        )
    }

    #[test]
    fn test_zero_hash_parses_to_working_dir() {
        let id = CommitId::parse("0000000000000000000000000000000000000000");
        assert!(id.is_working_dir());
        assert_eq!(id.as_str(), "0000000000000000000000000000000000000000");
    }

    #[test]
    fn test_real_hash_roundtrip() {
        let id = CommitId::parse("abc123def456");
        assert!(!id.is_working_dir());
        assert_eq!(id.to_string(), "abc123def456");
        assert_eq!(id.short(), "abc123d");
    }

    #[test]
    fn test_prefix_match() {
        let id = CommitId::parse("abc123def456");
        assert!(id.matches_prefix("abc1"));
        assert!(!id.matches_prefix("abd"));
    }

    #[test]
    fn test_field_access() {
        let c = commit("abc123", &["def456"]);
        assert_eq!(c.field(CommitField::Sha), "abc123");
        assert_eq!(c.field(CommitField::Author), "Alice <alice@example.com>");
        assert_eq!(c.field(CommitField::Summary), "add feature");
        assert_eq!(c.field(CommitField::Body), "long description");
    }

    #[test]
    fn test_first_parent() {
        let c = commit("abc123", &["def456", "789abc"]);
        assert_eq!(c.first_parent(), Some(&CommitId::parse("def456")));
        assert_eq!(c.parent_count(), 2);

        let root = commit("abc123", &[]);
        assert_eq!(root.first_parent(), None);
    }
}
