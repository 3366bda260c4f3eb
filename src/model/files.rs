//! file-change records attached to a pair of revisions.
//!
//! A [`RevisionFiles`] is the structured result of parsing one diff-metadata
//! block: an ordered, duplicate-free list of changed paths with composable
//! status flags. Entries for the same path accumulate status bits instead of
//! overwriting each other, so a path can be simultaneously in conflict and
//! staged in the index.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Per-file change status. Flags compose with bitwise OR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileStatus: u8 {
        const MODIFIED = 1 << 0;
        const NEW      = 1 << 1;
        const DELETED  = 1 << 2;
        const UNKNOWN  = 1 << 3;
        const CONFLICT = 1 << 4;
        const IN_INDEX = 1 << 5;
    }
}

impl FileStatus {
    /// Map a raw status letter to a flag. Unrecognized letters count as a
    /// plain modification.
    pub fn from_code(code: char) -> FileStatus {
        match code {
            'M' | 'T' => FileStatus::MODIFIED,
            'A' => FileStatus::NEW,
            'D' => FileStatus::DELETED,
            'U' => FileStatus::CONFLICT,
            '?' => FileStatus::UNKNOWN,
            _ => FileStatus::MODIFIED,
        }
    }

    /// True when this status leaves the record describing more than pure
    /// content modifications.
    fn breaks_only_modified(self) -> bool {
        self.intersects(
            FileStatus::NEW | FileStatus::DELETED | FileStatus::UNKNOWN | FileStatus::CONFLICT,
        )
    }
}

impl Serialize for FileStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for FileStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(FileStatus::from_bits_retain(u8::deserialize(deserializer)?))
    }
}

/// One changed path inside a [`RevisionFiles`] record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    path: String,
    status: FileStatus,
    /// Which merge parent this change belongs to (1-based); relevant for
    /// combined-merge diffs with multiple contributing parents.
    merge_parent: u32,
    /// `"<orig> --> <dest> (<NN>%)"` for renames and copies.
    ext_status: Option<String>,
}

impl FileEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn merge_parent(&self) -> u32 {
        self.merge_parent
    }

    pub fn ext_status(&self) -> Option<&str> {
        self.ext_status.as_deref()
    }
}

/// The ordered file-change set between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionFiles {
    entries: Vec<FileEntry>,
    only_modified: bool,
}

impl Default for RevisionFiles {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            only_modified: true,
        }
    }
}

impl RevisionFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn entry(&self, idx: usize) -> Option<&FileEntry> {
        self.entries.get(idx)
    }

    pub fn file(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(|e| e.path.as_str())
    }

    pub fn entry_for(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entry_for(path).is_some()
    }

    /// Whether the entry at `idx` carries `flag`.
    pub fn status_matches(&self, idx: usize, flag: FileStatus) -> bool {
        self.entries
            .get(idx)
            .map(|e| e.status.intersects(flag))
            .unwrap_or(false)
    }

    /// True while every entry is a pure content modification; display layers
    /// use this to skip rename/copy decoration entirely.
    pub fn only_modified(&self) -> bool {
        self.only_modified
    }

    pub fn set_only_modified(&mut self, only_modified: bool) {
        self.only_modified = only_modified;
    }

    /// OR `flag` into the entry at `idx`.
    pub fn append_status(&mut self, idx: usize, flag: FileStatus) {
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.status |= flag;
            if entry.status.breaks_only_modified() {
                self.only_modified = false;
            }
        }
    }

    /// Register a path. A duplicate path merges into the existing entry:
    /// status bits accumulate and the first extended-status string wins.
    pub fn merge_entry(
        &mut self,
        path: String,
        status: FileStatus,
        merge_parent: u32,
        ext_status: Option<String>,
    ) {
        if status.breaks_only_modified() || ext_status.is_some() {
            self.only_modified = false;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.path == path) {
            entry.status |= status;
            if entry.ext_status.is_none() {
                entry.ext_status = ext_status;
            }
            return;
        }
        self.entries.push(FileEntry {
            path,
            status,
            merge_parent,
            ext_status,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FileStatus::from_code('M'), FileStatus::MODIFIED);
        assert_eq!(FileStatus::from_code('T'), FileStatus::MODIFIED);
        assert_eq!(FileStatus::from_code('A'), FileStatus::NEW);
        assert_eq!(FileStatus::from_code('D'), FileStatus::DELETED);
        assert_eq!(FileStatus::from_code('U'), FileStatus::CONFLICT);
        assert_eq!(FileStatus::from_code('?'), FileStatus::UNKNOWN);
        assert_eq!(FileStatus::from_code('X'), FileStatus::MODIFIED);
    }

    #[test]
    fn test_duplicate_path_accumulates_status() {
        let mut rf = RevisionFiles::new();
        rf.merge_entry("src/a.rs".into(), FileStatus::MODIFIED, 1, None);
        rf.merge_entry("src/a.rs".into(), FileStatus::CONFLICT, 1, None);

        assert_eq!(rf.count(), 1);
        let entry = rf.entry_for("src/a.rs").unwrap();
        assert_eq!(entry.status(), FileStatus::MODIFIED | FileStatus::CONFLICT);
    }

    #[test]
    fn test_only_modified_tracking() {
        let mut rf = RevisionFiles::new();
        rf.merge_entry("a".into(), FileStatus::MODIFIED, 1, None);
        assert!(rf.only_modified());

        rf.merge_entry("b".into(), FileStatus::DELETED, 1, None);
        assert!(!rf.only_modified());
    }

    #[test]
    fn test_ext_status_first_wins() {
        let mut rf = RevisionFiles::new();
        rf.merge_entry("b".into(), FileStatus::NEW, 1, Some("a --> b (90%)".into()));
        rf.merge_entry("b".into(), FileStatus::MODIFIED, 1, Some("other".into()));

        assert_eq!(rf.entry_for("b").unwrap().ext_status(), Some("a --> b (90%)"));
        assert!(!rf.only_modified());
    }

    #[test]
    fn test_append_status_by_index() {
        let mut rf = RevisionFiles::new();
        rf.merge_entry("a".into(), FileStatus::MODIFIED, 1, None);
        rf.append_status(0, FileStatus::IN_INDEX);
        assert!(rf.status_matches(0, FileStatus::IN_INDEX));
        // IN_INDEX alone does not break the fast-display flag
        assert!(rf.only_modified());
    }
}
