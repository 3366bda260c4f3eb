//! per-commit reference bookkeeping.
//!
//! Each commit owns a small multimap from reference kind to the names that
//! point at it. Absence of a kind is a valid empty result, not an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The kind of a reference attached to a commit.
///
/// `Applied`/`Unapplied` cover stash entries; `Any` is the wildcard kind
/// used by reference queries that do not care about the concrete kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RefKind {
    Tag,
    LocalBranch,
    RemoteBranch,
    Applied,
    Unapplied,
    Any,
}

/// Ordered reference names grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSet {
    refs: BTreeMap<RefKind, Vec<String>>,
}

impl ReferenceSet {
    /// Append `name` under `kind`. Duplicates are kept (append semantics).
    pub fn add(&mut self, kind: RefKind, name: impl Into<String>) {
        self.refs.entry(kind).or_default().push(name.into());
    }

    /// The names recorded under `kind`, in insertion order.
    pub fn names(&self, kind: RefKind) -> &[String] {
        self.refs.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove every occurrence of `name` under `kind`. No-op if absent.
    pub fn remove(&mut self, kind: RefKind, name: &str) {
        if let Some(names) = self.refs.get_mut(&kind) {
            names.retain(|n| n != name);
            if names.is_empty() {
                self.refs.remove(&kind);
            }
        }
    }

    pub fn contains(&self, kind: RefKind, name: &str) -> bool {
        self.names(kind).iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Append every list of `other` onto this set.
    pub fn merge(&mut self, other: &ReferenceSet) {
        for (kind, names) in &other.refs {
            self.refs
                .entry(*kind)
                .or_default()
                .extend(names.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_kind_is_empty() {
        let set = ReferenceSet::default();
        assert!(set.names(RefKind::Tag).is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_add_keeps_duplicates_and_order() {
        let mut set = ReferenceSet::default();
        set.add(RefKind::LocalBranch, "main");
        set.add(RefKind::LocalBranch, "dev");
        set.add(RefKind::LocalBranch, "main");
        assert_eq!(set.names(RefKind::LocalBranch), ["main", "dev", "main"]);
    }

    #[test]
    fn test_remove_strips_all_occurrences() {
        let mut set = ReferenceSet::default();
        set.add(RefKind::Tag, "v1.0");
        set.add(RefKind::Tag, "v1.1");
        set.add(RefKind::Tag, "v1.0");
        set.remove(RefKind::Tag, "v1.0");
        assert_eq!(set.names(RefKind::Tag), ["v1.1"]);

        set.remove(RefKind::Tag, "v1.1");
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut set = ReferenceSet::default();
        set.add(RefKind::Tag, "v1.0");
        set.remove(RefKind::LocalBranch, "main");
        assert_eq!(set.names(RefKind::Tag), ["v1.0"]);
    }

    #[test]
    fn test_merge_appends() {
        let mut a = ReferenceSet::default();
        a.add(RefKind::LocalBranch, "main");
        let mut b = ReferenceSet::default();
        b.add(RefKind::LocalBranch, "dev");
        b.add(RefKind::Tag, "v2.0");

        a.merge(&b);
        assert_eq!(a.names(RefKind::LocalBranch), ["main", "dev"]);
        assert_eq!(a.names(RefKind::Tag), ["v2.0"]);
    }
}
