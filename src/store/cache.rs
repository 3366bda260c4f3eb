//! the central revision cache.
//!
//! One mutex-guarded state struct owns everything: the order-indexed commit
//! sequence (row 0 reserved for the working-directory pseudo-commit), the
//! by-hash index, the per-revision-pair file-change records, reference
//! tracking, the lane engine and the path-interning arenas. Every public
//! operation locks for the duration of that single call.
//!
//! Population happens in a cooperative bulk-load window: while it is open,
//! streamed inserts are accepted and read queries answer empty; once it is
//! closed, reads become valid and structural bulk inserts are rejected
//! (logged, never fatal). The window is a state flag, not a second lock;
//! exclusion comes from the mutex alone.
//!
//! Bulk-load precondition: commits must be streamed in traversal order,
//! child before parent. `insert_during_bulk_load` relies on it to drop the
//! stale index entry of the inserted commit's first parent so the parent
//! can be re-indexed when its own row arrives on a re-stream.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use log::{debug, info, trace};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::lanes::{LaneEngine, LaneType};
use crate::model::{Commit, CommitField, CommitId, FileStatus, RefKind, RevisionFiles};
use crate::parser::{DiffParser, NameArena};
use crate::store::error::{CacheError, CacheResult};

/// Ahead/behind counts of a local branch against master and against its
/// remote counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDistances {
    pub ahead_master: u32,
    pub behind_master: u32,
    pub ahead_origin: u32,
    pub behind_origin: u32,
}

/// In-memory store of a repository's streamed commit log.
///
/// Queries hand out value snapshots; callers never hold live references
/// into the store.
pub struct RevisionCache {
    inner: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    configuring: bool,
    /// row-indexed sequence; row 0 belongs to the working-directory commit
    commits: Vec<Option<Commit>>,
    /// hash to row index into `commits`
    by_hash: HashMap<CommitId, usize>,
    diffs: HashMap<(CommitId, CommitId), RevisionFiles>,
    /// commits known to carry references, in attach order
    referenced: Vec<CommitId>,
    branch_distances: BTreeMap<String, BranchDistances>,
    lanes: LaneEngine,
    dir_names: NameArena,
    file_names: NameArena,
    untracked: Vec<String>,
}

impl Default for RevisionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheState::default()),
        }
    }

    // ==================== Bulk-load window ====================

    /// Open the bulk-load window, reserving room for `expected` commits
    /// plus the working-directory row. Reentrant open is a no-op.
    pub fn begin_bulk_load(&self, expected: usize) {
        let mut state = self.inner.lock();
        debug!("configuring the revision cache for {} elements", expected);
        if !state.configuring {
            if state.commits.is_empty() {
                // one extra slot, reserved for the working directory row
                state.commits.resize(expected + 1, None);
                state.by_hash.reserve(expected + 1);
            }
            state.configuring = true;
        }
    }

    /// Close the bulk-load window; read queries become valid again.
    pub fn end_bulk_load(&self) {
        let mut state = self.inner.lock();
        debug!("revision cache configured, {} rows", state.commits.len());
        state.configuring = false;
    }

    // ==================== Commit ingestion ====================

    /// Insert a streamed commit at `order_idx`. Only effective while the
    /// bulk-load window is open; a hash already indexed is skipped. Rows
    /// past the current length append, a differing occupant is replaced.
    pub fn insert_during_bulk_load(&self, mut commit: Commit, order_idx: usize) {
        let mut state = self.inner.lock();
        if !state.configuring {
            info!(
                "revision cache is not loading, dropping insert of {}",
                commit.id().short()
            );
            return;
        }
        if state.by_hash.contains_key(commit.id()) {
            info!("commit {} is already cached, skipping", commit.id().short());
            return;
        }

        let lanes = state.calculate_lanes(&commit);
        commit.set_lanes(lanes);
        let id = commit.id().clone();
        let first_parent = commit.first_parent().cloned();

        let row = if order_idx >= state.commits.len() {
            debug!("adding commit {}", id.short());
            state.commits.push(Some(commit));
            state.commits.len() - 1
        } else {
            if state.commits[order_idx].as_ref() != Some(&commit) {
                trace!("overwriting row {} with commit {}", order_idx, id.short());
                if let Some(old) = state.commits[order_idx].take() {
                    if state.by_hash.get(old.id()) == Some(&order_idx) {
                        state.by_hash.remove(old.id());
                    }
                }
                state.commits[order_idx] = Some(commit);
            }
            order_idx
        };
        state.by_hash.insert(id, row);

        // Child-before-parent streaming: the child linking here supersedes
        // any index entry the first parent still holds from a previous
        // stream; its own row re-indexes it.
        if let Some(parent) = first_parent {
            state.by_hash.remove(&parent);
        }
    }

    /// Insert a single interactively-created commit at the head of the
    /// history (row 1, below the working-directory row) and migrate the
    /// `local_branch` pointer from the previous head onto it.
    pub fn append_commit(&self, mut commit: Commit, local_branch: &str) {
        let mut state = self.inner.lock();
        debug!(
            "appending commit {} to branch {}",
            commit.id().short(),
            local_branch
        );

        let lanes = state.calculate_lanes(&commit);
        commit.set_lanes(lanes);

        if let Some(parent_row) = commit
            .first_parent()
            .and_then(|p| state.by_hash.get(p))
            .copied()
        {
            if let Some(parent) = state.commits.get_mut(parent_row).and_then(Option::as_mut) {
                if parent.references().contains(RefKind::LocalBranch, local_branch) {
                    parent.remove_reference(RefKind::LocalBranch, local_branch);
                }
            }
        }
        commit.add_reference(RefKind::LocalBranch, local_branch);

        let id = commit.id().clone();
        for row in state.by_hash.values_mut() {
            if *row >= 1 {
                *row += 1;
            }
        }
        if state.commits.is_empty() {
            state.commits.push(None);
        }
        state.commits.insert(1, Some(commit));
        state.by_hash.insert(id.clone(), 1);
        if !state.referenced.contains(&id) {
            state.referenced.push(id);
        }
    }

    /// Replace the entry indexed by `old_sha` after its identity changed
    /// (e.g. an amend). The replacement inherits the old entry's references
    /// and, when it carries none of its own, its lane snapshot.
    pub fn update_commit_hash(&self, old_sha: &str, mut commit: Commit) -> CacheResult<()> {
        let mut state = self.inner.lock();
        let old_id = CommitId::parse(old_sha);
        let Some(row) = state.by_hash.remove(&old_id) else {
            return Err(CacheError::CommitNotFound(old_sha.to_string()));
        };

        let new_id = commit.id().clone();
        if let Some(old) = state.commits.get_mut(row).and_then(Option::take) {
            commit.merge_references(old.references());
            if commit.lanes().is_empty() {
                commit.set_lanes(old.lanes().to_vec());
            }
        }
        if let Some(slot) = state.commits.get_mut(row) {
            *slot = Some(commit);
        }
        state.by_hash.insert(new_id.clone(), row);
        for tracked in state.referenced.iter_mut() {
            if *tracked == old_id {
                *tracked = new_id.clone();
            }
        }
        Ok(())
    }

    // ==================== Commit queries ====================

    /// The commit at `row`, or `None` mid-bulk-load, out of bounds, or for
    /// a slot the stream never filled.
    pub fn get_by_row(&self, row: usize) -> Option<Commit> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return None;
        }
        state.commits.get(row).and_then(Clone::clone)
    }

    /// Exact-hash lookup, falling back to unique-prefix matching for
    /// abbreviated hashes. When several cached hashes share the prefix the
    /// first match in index order wins, which is not deterministic.
    pub fn get_by_hash(&self, sha: &str) -> Option<Commit> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return None;
        }
        if sha.is_empty() {
            return None;
        }
        if let Some(&row) = state.by_hash.get(&CommitId::parse(sha)) {
            return state.commits.get(row).and_then(Clone::clone);
        }
        state
            .by_hash
            .iter()
            .find(|(id, _)| id.matches_prefix(sha))
            .and_then(|(_, &row)| state.commits.get(row).and_then(Clone::clone))
    }

    /// Row index of an exactly-matching hash.
    pub fn get_position(&self, sha: &str) -> Option<usize> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return None;
        }
        state.by_hash.get(&CommitId::parse(sha)).copied()
    }

    /// First commit whose `field` contains `text`, scanning from
    /// `start_row` to the end and wrapping once over `[0, start_row)`.
    pub fn find_by_field(&self, field: CommitField, text: &str, start_row: usize) -> Option<Commit> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return None;
        }
        let len = state.commits.len();
        let scan = |rows: std::ops::Range<usize>| {
            rows.filter_map(|row| state.commits.get(row).and_then(Option::as_ref))
                .find(|c| c.field(field).contains(text))
                .cloned()
        };
        scan(start_row.min(len)..len).or_else(|| {
            if start_row > 0 {
                scan(0..start_row.min(len))
            } else {
                None
            }
        })
    }

    /// Current sequence length, including reserved and unfilled rows.
    pub fn count(&self) -> usize {
        self.inner.lock().commits.len()
    }

    // ==================== File-change records ====================

    /// Store the file-change record between two revisions. Writes only when
    /// both hashes are non-empty and the value differs from what is cached;
    /// returns whether a write occurred.
    pub fn insert_diff(&self, sha1: &str, sha2: &str, files: RevisionFiles) -> bool {
        self.inner.lock().store_diff(sha1, sha2, files)
    }

    pub fn get_diff(&self, sha1: &str, sha2: &str) -> Option<RevisionFiles> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return None;
        }
        state
            .diffs
            .get(&(CommitId::parse(sha1), CommitId::parse(sha2)))
            .cloned()
    }

    pub fn has_diff(&self, sha1: &str, sha2: &str) -> bool {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return false;
        }
        state
            .diffs
            .contains_key(&(CommitId::parse(sha1), CommitId::parse(sha2)))
    }

    /// Run one diff-metadata block through the parser against this cache's
    /// interning arenas, without storing the result.
    pub fn parse_diff(&self, text: &str) -> RevisionFiles {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let mut parser = DiffParser::new(&mut state.dir_names, &mut state.file_names);
        let mut rf = RevisionFiles::new();
        parser.parse(text);
        parser.flush_into(&mut rf);
        rf
    }

    // ==================== References ====================

    /// Attach a reference to a cached commit. Only effective inside the
    /// bulk-load window; unknown hashes are ignored.
    pub fn attach_reference(&self, sha: &str, kind: RefKind, name: &str) {
        let mut state = self.inner.lock();
        if !state.configuring {
            info!("revision cache is not loading, dropping reference {}", name);
            return;
        }
        let id = CommitId::parse(sha);
        let Some(&row) = state.by_hash.get(&id) else {
            return;
        };
        debug!("attaching reference {} to {}", name, id.short());
        match state.commits.get_mut(row).and_then(Option::as_mut) {
            Some(commit) => commit.add_reference(kind, name),
            None => return,
        }
        if !state.referenced.contains(&id) {
            state.referenced.push(id);
        }
    }

    /// Replace the commit's reference set with an empty one and drop it
    /// from reference tracking.
    pub fn clear_references(&self, sha: &str) {
        let mut state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return;
        }
        let id = CommitId::parse(sha);
        let Some(&row) = state.by_hash.get(&id) else {
            return;
        };
        if let Some(commit) = state.commits.get_mut(row).and_then(Option::as_mut) {
            commit.clear_references();
        }
        state.referenced.retain(|tracked| *tracked != id);
    }

    /// `(hash, names)` for every reference-carrying commit, restricted to
    /// `kind`. Commits whose list for `kind` is empty still appear.
    pub fn list_references(&self, kind: RefKind) -> Vec<(CommitId, Vec<String>)> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return Vec::new();
        }
        state
            .referenced
            .iter()
            .filter_map(|id| {
                let commit = state.commit_for(id)?;
                Some((id.clone(), commit.references().names(kind).to_vec()))
            })
            .collect()
    }

    pub fn list_tags(&self) -> Vec<(CommitId, Vec<String>)> {
        self.list_references(RefKind::Tag)
    }

    /// The commit a branch points at, scanning reference-carrying commits.
    pub fn find_commit_for_branch(&self, branch: &str, local: bool) -> Option<CommitId> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return None;
        }
        let kind = if local {
            RefKind::LocalBranch
        } else {
            RefKind::RemoteBranch
        };
        state
            .referenced
            .iter()
            .find(|id| {
                state
                    .commit_for(id)
                    .map(|c| c.references().contains(kind, branch))
                    .unwrap_or(false)
            })
            .cloned()
    }

    // ==================== Branch distances ====================

    /// Record ahead/behind counts for a local branch. Accepted only inside
    /// the bulk-load window, like the rest of the streamed metadata.
    pub fn insert_branch_distances(&self, name: &str, distances: BranchDistances) {
        let mut state = self.inner.lock();
        if !state.configuring {
            info!("revision cache is not loading, dropping distances for {}", name);
            return;
        }
        state.branch_distances.insert(name.to_string(), distances);
    }

    pub fn branch_distances(&self, name: &str) -> Option<BranchDistances> {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return None;
        }
        state.branch_distances.get(name).copied()
    }

    // ==================== Working directory ====================

    /// Store the untracked-file list consumed by the next working-directory
    /// refresh.
    pub fn set_untracked_files(&self, files: Vec<String>) {
        self.inner.lock().untracked = files;
    }

    /// Rebuild the working-directory pseudo-commit against `parent_sha`
    /// (the current HEAD): parse the index and cached diffs, fold in the
    /// untracked-file list, store the synthetic record and splice the
    /// pseudo-commit into row 0.
    pub fn refresh_working_dir(&self, parent_sha: &str, index_diff: &str, cached_diff: &str) {
        let mut state = self.inner.lock();
        debug!(
            "refreshing the working directory row against {}",
            CommitId::parse(parent_sha).short()
        );

        let rf = state.working_dir_record(index_diff, cached_diff);
        let summary = if rf.count() == state.untracked.len() {
            "No local changes"
        } else {
            "Local changes"
        };
        state.store_diff(CommitId::WorkingDir.as_str(), parent_sha, rf);

        let parents = if parent_sha.is_empty() {
            Vec::new()
        } else {
            vec![CommitId::parse(parent_sha)]
        };
        let mut wip = Commit::new(CommitId::WorkingDir, parents, "-", Utc::now(), summary, "");
        state.lanes.init(&CommitId::WorkingDir);
        let lanes = state.calculate_lanes(&wip);
        wip.set_lanes(lanes);

        if state.commits.is_empty() {
            state.commits.push(None);
        }
        state.commits[0] = Some(wip);
        state.by_hash.insert(CommitId::WorkingDir, 0);
    }

    /// Whether the working-directory record consists of exactly the
    /// untracked files, i.e. carries no further tracked-file modifications.
    pub fn has_pending_local_changes(&self) -> bool {
        let state = self.inner.lock();
        if state.configuring {
            info!("revision cache is updating");
            return false;
        }
        let Some(wip) = state.commit_for(&CommitId::WorkingDir) else {
            return false;
        };
        let Some(parent) = wip.first_parent() else {
            return false;
        };
        state
            .diffs
            .get(&(CommitId::WorkingDir, parent.clone()))
            .map(|rf| rf.count() == state.untracked.len())
            .unwrap_or(false)
    }

    // ==================== Maintenance ====================

    /// Replay every historical commit through a freshly reset lane engine,
    /// in sequence order. The working-directory row is excluded; it is
    /// rebuilt by the next refresh anyway.
    pub fn recompute_all_lanes(&self) {
        let mut state = self.inner.lock();
        debug!("recomputing all lanes");
        state.lanes.clear();
        for row in 1..state.commits.len() {
            if let Some(mut commit) = state.commits[row].take() {
                let lanes = state.calculate_lanes(&commit);
                commit.set_lanes(lanes);
                state.commits[row] = Some(commit);
            }
        }
    }

    /// Drop the lookup indices, lane state and reference tracking. The row
    /// sequence keeps its layout for re-population, and the interning
    /// arenas keep their entries for the cache's lifetime.
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        debug!("resetting the revision cache");
        state.by_hash.clear();
        state.diffs.clear();
        state.lanes.clear();
        state.referenced.clear();
    }
}

impl CacheState {
    fn commit_for(&self, id: &CommitId) -> Option<&Commit> {
        let row = self.by_hash.get(id)?;
        self.commits.get(*row).and_then(Option::as_ref)
    }

    /// Run one commit through the lane engine and return its row snapshot,
    /// advancing the engine to the next row. Self-initializes on the first
    /// commit if no working-directory refresh seeded the engine.
    fn calculate_lanes(&mut self, commit: &Commit) -> Vec<LaneType> {
        trace!("computing lanes for {}", commit.id().short());
        if self.lanes.is_empty() {
            self.lanes.init(commit.id());
        }
        let (fork, discontinuity) = self.lanes.fork_state(commit.id());
        let merge = commit.parent_count() > 1;

        if discontinuity {
            self.lanes.change_active_lane(commit.id());
        }
        if fork {
            self.lanes.set_fork(commit.id());
        }
        if merge {
            self.lanes.set_merge(commit.parents());
        }
        if commit.parent_count() == 0 {
            self.lanes.set_initial();
        }

        let row = self.lanes.snapshot();

        self.lanes.next_parent(commit.first_parent());
        if merge {
            self.lanes.after_merge();
        }
        if fork {
            self.lanes.after_fork();
        }
        if self.lanes.is_branch() {
            self.lanes.after_branch();
        }
        row
    }

    fn store_diff(&mut self, sha1: &str, sha2: &str, files: RevisionFiles) -> bool {
        if self.configuring {
            info!("revision cache is updating, dropping diff insert");
            return false;
        }
        if sha1.is_empty() || sha2.is_empty() {
            return false;
        }
        let key = (CommitId::parse(sha1), CommitId::parse(sha2));
        if self.diffs.get(&key) == Some(&files) {
            return false;
        }
        debug!(
            "caching file changes between {} and {}",
            key.0.short(),
            key.1.short()
        );
        self.diffs.insert(key, files);
        true
    }

    /// Build the synthetic working-directory record: index diff plus the
    /// untracked files (status Unknown), then conflict/in-index flags
    /// folded in from the cached diff for paths present in both.
    fn working_dir_record(&mut self, index_diff: &str, cached_diff: &str) -> RevisionFiles {
        let mut parser = DiffParser::new(&mut self.dir_names, &mut self.file_names);

        let mut rf = RevisionFiles::new();
        parser.parse(index_diff);
        for path in &self.untracked {
            parser.stage_path(path, FileStatus::UNKNOWN, 1, None);
        }
        parser.flush_into(&mut rf);
        rf.set_only_modified(false);

        let mut cached = RevisionFiles::new();
        parser.parse(cached_diff);
        parser.flush_into(&mut cached);

        for idx in 0..rf.count() {
            let staged = rf.file(idx).and_then(|path| cached.entry_for(path)).map(|entry| {
                if entry.status().intersects(FileStatus::CONFLICT) {
                    FileStatus::IN_INDEX | FileStatus::CONFLICT
                } else {
                    FileStatus::IN_INDEX
                }
            });
            if let Some(flags) = staged {
                rf.append_status(idx, flags);
            }
        }
        rf
    }
}
