//! incremental parser for compact per-file diff-metadata records.
//!
//! Input blocks are line-oriented ASCII. A line starting with ':' describes
//! one file change; a line starting with "::" describes a change inside a
//! combined merge; every other line advances the current merge-parent
//! counter. The format carries a fixed-offset fast path: with full index
//! lines (two 6-digit modes and two 40-hex hashes) the single-letter status
//! lands at byte 97, a literal tab at 98 and the path at 99. The fast path
//! is only an optimization; any line failing its length/content guard goes
//! through the tab-split slow path, which is correct for every record shape.
//!
//! Parsed paths are staged as interned (directory, file) handle pairs and
//! flushed into a target record in an explicit final step, merging duplicate
//! paths by ORing their status flags.

use crate::model::{FileStatus, RevisionFiles};
use crate::parser::interner::NameArena;

/// byte offsets of the fixed-layout fast path
const FAST_STATUS_OFFSET: usize = 97;
const FAST_TAB_OFFSET: usize = 98;
const FAST_PATH_OFFSET: usize = 99;

struct StagedEntry {
    dir: u32,
    file: u32,
    status: FileStatus,
    merge_parent: u32,
    ext_status: Option<String>,
}

/// Stateful diff-record parser borrowing the cache's interning arenas.
pub struct DiffParser<'a> {
    dirs: &'a mut NameArena,
    files: &'a mut NameArena,
    staged: Vec<StagedEntry>,
}

impl<'a> DiffParser<'a> {
    pub fn new(dirs: &'a mut NameArena, files: &'a mut NameArena) -> Self {
        Self {
            dirs,
            files,
            staged: Vec::new(),
        }
    }

    /// Consume one diff-metadata block, staging every file change it
    /// describes. The merge-parent counter restarts at 1 per block.
    pub fn parse(&mut self, text: &str) {
        let mut par_num = 1u32;
        for line in text.lines().filter(|l| !l.is_empty()) {
            if !line.starts_with(':') {
                par_num += 1;
                continue;
            }
            if line.starts_with("::") {
                // Combined merge: no status or similarity is given, only
                // that the path changed on some side. Treat as modified.
                let path = line.rsplit('\t').next().unwrap_or(line);
                self.stage_path(path, FileStatus::MODIFIED, par_num, None);
            } else if let Some((status, path)) = fast_path(line) {
                self.stage_path(path, status, par_num, None);
            } else {
                self.stage_slow(line, par_num);
            }
        }
    }

    /// Stage one path directly (used for the untracked-file list).
    pub fn stage_path(
        &mut self,
        path: &str,
        status: FileStatus,
        merge_parent: u32,
        ext_status: Option<String>,
    ) {
        let split = path.rfind('/').map(|i| i + 1).unwrap_or(0);
        self.staged.push(StagedEntry {
            dir: self.dirs.intern(&path[..split]),
            file: self.files.intern(&path[split..]),
            status,
            merge_parent,
            ext_status,
        });
    }

    /// Resolve and drain every staged entry into `rf`, merging duplicate
    /// paths. Every parse flow ends with a flush.
    pub fn flush_into(&mut self, rf: &mut RevisionFiles) {
        for entry in self.staged.drain(..) {
            let mut path =
                String::with_capacity(self.dirs.resolve(entry.dir).len() + self.files.resolve(entry.file).len());
            path.push_str(self.dirs.resolve(entry.dir));
            path.push_str(self.files.resolve(entry.file));
            rf.merge_entry(path, entry.status, entry.merge_parent, entry.ext_status);
        }
    }

    /// Tab-split fallback: three fields are a rename/copy record, two are a
    /// plain record whose offsets drifted from the fast-path layout. Other
    /// shapes are skipped.
    fn stage_slow(&mut self, line: &str, par_num: u32) {
        let fields: Vec<&str> = line.split('\t').filter(|f| !f.is_empty()).collect();
        match fields.len() {
            3 => self.stage_extended(&fields, par_num),
            2 => {
                let status = fields[0]
                    .chars()
                    .next_back()
                    .map(FileStatus::from_code)
                    .unwrap_or(FileStatus::MODIFIED);
                self.stage_path(fields[1], status, par_num, None);
            }
            _ => {}
        }
    }

    /// Rename/copy record: `<type><similarity>\t<orig>\t<dest>`. The
    /// destination registers as New; a rename additionally registers the
    /// origin as Deleted. Both carry the `"orig --> dest (NN%)"` display
    /// string.
    fn stage_extended(&mut self, fields: &[&str], par_num: u32) {
        let code = fields[0]
            .rsplit(' ')
            .next()
            .unwrap_or("")
            .trim_start_matches(':');
        let Some(kind) = code.chars().next() else {
            return;
        };
        let similarity: u32 = code
            .get(1..)
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0);
        let orig = fields[1];
        let dest = fields[2];
        let ext = format!("{} --> {} ({}%)", orig, dest, similarity);

        self.stage_path(dest, FileStatus::NEW, par_num, Some(ext.clone()));
        if kind == 'R' {
            self.stage_path(orig, FileStatus::DELETED, par_num, Some(ext));
        }
    }
}

/// `(status, path)` when the line matches the fixed-layout fast path.
fn fast_path(line: &str) -> Option<(FileStatus, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() > FAST_PATH_OFFSET
        && bytes[FAST_TAB_OFFSET] == b'\t'
        && bytes[FAST_STATUS_OFFSET].is_ascii_alphabetic()
    {
        let status = FileStatus::from_code(bytes[FAST_STATUS_OFFSET] as char);
        return Some((status, &line[FAST_PATH_OFFSET..]));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A full raw index line with the status letter at byte 97 and the tab
    /// at byte 98.
    fn raw_line(status: char, path: &str) -> String {
        format!(
            ":100644 100644 {} {} {}\t{}",
            "a".repeat(40),
            "b".repeat(40),
            status,
            path
        )
    }

    fn parse_one(text: &str) -> RevisionFiles {
        let mut dirs = NameArena::new();
        let mut files = NameArena::new();
        let mut parser = DiffParser::new(&mut dirs, &mut files);
        let mut rf = RevisionFiles::new();
        parser.parse(text);
        parser.flush_into(&mut rf);
        rf
    }

    #[test]
    fn test_fast_path_modify() {
        let rf = parse_one(&raw_line('M', "a/b/c.txt"));
        assert_eq!(rf.count(), 1);
        let entry = rf.entry_for("a/b/c.txt").unwrap();
        assert_eq!(entry.status(), FileStatus::MODIFIED);
        assert_eq!(entry.merge_parent(), 1);
        assert!(rf.only_modified());
    }

    #[test]
    fn test_fast_path_duplicate_path_registered_once() {
        let line = raw_line('M', "a/b/c.txt");
        let rf = parse_one(&format!("{}\n{}", line, line));
        assert_eq!(rf.count(), 1);
    }

    #[test]
    fn test_rename_registers_both_sides() {
        let rf = parse_one(":R90\told/name.txt\tnew/name.txt");
        assert_eq!(rf.count(), 2);

        let dest = rf.entry_for("new/name.txt").unwrap();
        assert_eq!(dest.status(), FileStatus::NEW);
        assert_eq!(
            dest.ext_status(),
            Some("old/name.txt --> new/name.txt (90%)")
        );

        let orig = rf.entry_for("old/name.txt").unwrap();
        assert_eq!(orig.status(), FileStatus::DELETED);
        assert_eq!(
            orig.ext_status(),
            Some("old/name.txt --> new/name.txt (90%)")
        );
        assert!(!rf.only_modified());
    }

    #[test]
    fn test_copy_registers_destination_only() {
        let rf = parse_one(":C85\tsrc/a.rs\tsrc/b.rs");
        assert_eq!(rf.count(), 1);
        let dest = rf.entry_for("src/b.rs").unwrap();
        assert_eq!(dest.status(), FileStatus::NEW);
        assert_eq!(dest.ext_status(), Some("src/a.rs --> src/b.rs (85%)"));
    }

    #[test]
    fn test_full_rename_line_parses_via_slow_path() {
        let line = format!(
            ":100644 100644 {} {} R090\told.txt\tnew.txt",
            "a".repeat(40),
            "b".repeat(40)
        );
        let rf = parse_one(&line);
        assert_eq!(rf.count(), 2);
        assert_eq!(
            rf.entry_for("new.txt").unwrap().ext_status(),
            Some("old.txt --> new.txt (90%)")
        );
    }

    #[test]
    fn test_combined_merge_line() {
        let rf = parse_one("::100644 100644 100644 x y z MM\tsrc/merged.rs");
        assert_eq!(rf.count(), 1);
        let entry = rf.entry_for("src/merged.rs").unwrap();
        assert_eq!(entry.status(), FileStatus::MODIFIED);
    }

    #[test]
    fn test_non_change_lines_advance_parent_counter() {
        let text = format!(
            "{}\nsome header line\n{}",
            raw_line('M', "first.txt"),
            raw_line('M', "second.txt")
        );
        let rf = parse_one(&text);
        assert_eq!(rf.entry_for("first.txt").unwrap().merge_parent(), 1);
        assert_eq!(rf.entry_for("second.txt").unwrap().merge_parent(), 2);
    }

    #[test]
    fn test_short_plain_line_falls_back_to_tab_split() {
        let rf = parse_one(":000000 100644 a b A\tadded.txt");
        assert_eq!(rf.count(), 1);
        let entry = rf.entry_for("added.txt").unwrap();
        assert_eq!(entry.status(), FileStatus::NEW);
        assert!(!rf.only_modified());
    }

    #[test]
    fn test_interned_names_shared_across_blocks() {
        let mut dirs = NameArena::new();
        let mut files = NameArena::new();
        {
            let mut parser = DiffParser::new(&mut dirs, &mut files);
            let mut rf = RevisionFiles::new();
            parser.parse(&raw_line('M', "src/lib.rs"));
            parser.flush_into(&mut rf);
        }
        {
            let mut parser = DiffParser::new(&mut dirs, &mut files);
            let mut rf = RevisionFiles::new();
            parser.parse(&raw_line('M', "src/main.rs"));
            parser.flush_into(&mut rf);
        }
        assert_eq!(dirs.len(), 1);
        assert_eq!(files.len(), 2);
    }
}
