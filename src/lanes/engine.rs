//! stateful lane assignment across the commit sequence.
//!
//! The engine keeps one slot per open branch line: its current cell state
//! and the hash expected to continue it. Commits must be fed strictly in
//! traversal order (child before parent); the per-row protocol is
//!
//! 1. query [`LaneEngine::fork_state`]
//! 2. on discontinuity, [`LaneEngine::change_active_lane`]
//! 3. apply `set_fork` / `set_merge` / `set_initial` as the commit demands
//! 4. take [`LaneEngine::snapshot`], which is the row's lane assignment
//! 5. advance with `next_parent` and the `after_*` transitions
//!
//! Out-of-order recomputation is only valid by replaying every commit
//! through a cleared engine.

use crate::lanes::LaneType;
use crate::model::CommitId;

/// Tracks all currently-open branch lines and the cursor of the lane the
/// next commit is expected to land on.
#[derive(Debug, Default)]
pub struct LaneEngine {
    kinds: Vec<LaneType>,
    next: Vec<Option<CommitId>>,
    active: usize,
}

impl LaneEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to a single branch lane waiting for `expected`.
    pub fn init(&mut self, expected: &CommitId) {
        self.clear();
        self.add(LaneType::Branch, Some(expected.clone()), 0);
    }

    pub fn clear(&mut self) {
        self.kinds.clear();
        self.next.clear();
        self.active = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The lane assignment of the current row.
    pub fn snapshot(&self) -> Vec<LaneType> {
        self.kinds.clone()
    }

    fn find_next(&self, id: &CommitId, from: usize) -> Option<usize> {
        self.next[from..]
            .iter()
            .position(|n| n.as_ref() == Some(id))
            .map(|p| p + from)
    }

    fn find_kind(&self, kind: LaneType, from: usize) -> Option<usize> {
        self.kinds[from..]
            .iter()
            .position(|k| *k == kind)
            .map(|p| p + from)
    }

    /// Reuse the first empty slot at or after `from`, growing only when all
    /// lanes are occupied. Returns the slot index.
    fn add(&mut self, kind: LaneType, next: Option<CommitId>, from: usize) -> usize {
        if from < self.kinds.len() {
            if let Some(pos) = self.find_kind(LaneType::Empty, from) {
                self.kinds[pos] = kind;
                self.next[pos] = next;
                return pos;
            }
        }
        self.kinds.push(kind);
        self.next.push(next);
        self.kinds.len() - 1
    }

    /// `(fork, discontinuity)` for the commit about to be consumed: fork
    /// when more than one lane waits for it, discontinuity when the lane it
    /// continues is not the active one (including the new-branch case where
    /// no lane waits for it at all).
    pub fn fork_state(&self, id: &CommitId) -> (bool, bool) {
        let pos = self.find_next(id, 0);
        let discontinuity = pos != Some(self.active);
        let fork = match pos {
            None => false,
            Some(p) => self.find_next(id, p + 1).is_some(),
        };
        (fork, discontinuity)
    }

    /// Move the cursor to the lane continued by `id`, opening a fresh branch
    /// lane if none waits for it.
    pub fn change_active_lane(&mut self, id: &CommitId) {
        let Some(t) = self.kinds.get_mut(self.active) else {
            self.active = self.add(LaneType::Branch, Some(id.clone()), 0);
            return;
        };
        *t = if *t == LaneType::Initial {
            LaneType::Empty
        } else {
            LaneType::NotActive
        };

        self.active = match self.find_next(id, 0) {
            Some(idx) => {
                self.kinds[idx] = LaneType::Active;
                idx
            }
            None => self.add(LaneType::Branch, Some(id.clone()), self.active),
        };
    }

    /// Mark every lane waiting for `id` as a closing tail and place the node
    /// cell on the active lane.
    pub fn set_fork(&mut self, id: &CommitId) {
        let Some(first) = self.find_next(id, 0) else {
            return;
        };
        let range_start = first;
        let mut range_end = first;
        let mut idx = Some(first);
        while let Some(i) = idx {
            range_end = i;
            self.kinds[i] = LaneType::Tail;
            idx = self.find_next(id, i + 1);
        }
        self.kinds[self.active] = LaneType::MergeFork;

        if self.kinds[range_start] == LaneType::MergeFork {
            self.kinds[range_start] = LaneType::MergeForkL;
        }
        if self.kinds[range_end] == LaneType::MergeFork {
            self.kinds[range_end] = LaneType::MergeForkR;
        }
        if self.kinds[range_start] == LaneType::Tail {
            self.kinds[range_start] = LaneType::TailL;
        }
        if self.kinds[range_end] == LaneType::Tail {
            self.kinds[range_end] = LaneType::TailR;
        }

        for i in range_start + 1..range_end {
            let t = &mut self.kinds[i];
            if *t == LaneType::NotActive {
                *t = LaneType::Cross;
            } else if *t == LaneType::Empty {
                *t = LaneType::CrossEmpty;
            }
        }
    }

    /// Join the lanes of all non-first parents into the active node cell,
    /// opening head lanes for parents no lane waits for. `set_fork` must
    /// run first when the row is also a fork.
    pub fn set_merge(&mut self, parents: &[CommitId]) {
        if self.kinds.is_empty() {
            return;
        }
        let t = self.kinds[self.active];
        let was_fork = t == LaneType::MergeFork;
        let was_fork_l = t == LaneType::MergeForkL;
        let was_fork_r = t == LaneType::MergeForkR;
        let mut start_join_was_cross = false;
        let mut end_join_was_cross = false;

        self.kinds[self.active] = LaneType::MergeFork;

        let mut range_start = self.active;
        let mut range_end = self.active;
        for parent in parents.iter().skip(1) {
            match self.find_next(parent, 0) {
                Some(idx) => {
                    if idx > range_end {
                        range_end = idx;
                        end_join_was_cross = self.kinds[idx] == LaneType::Cross;
                    }
                    if idx < range_start {
                        range_start = idx;
                        start_join_was_cross = self.kinds[idx] == LaneType::Cross;
                    }
                    self.kinds[idx] = LaneType::Join;
                }
                None => {
                    range_end = self.add(LaneType::Head, Some(parent.clone()), range_end + 1);
                }
            }
        }

        if self.kinds[range_start] == LaneType::MergeFork && !was_fork && !was_fork_r {
            self.kinds[range_start] = LaneType::MergeForkL;
        }
        if self.kinds[range_end] == LaneType::MergeFork && !was_fork && !was_fork_l {
            self.kinds[range_end] = LaneType::MergeForkR;
        }
        if self.kinds[range_start] == LaneType::Join && !start_join_was_cross {
            self.kinds[range_start] = LaneType::JoinL;
        }
        if self.kinds[range_end] == LaneType::Join && !end_join_was_cross {
            self.kinds[range_end] = LaneType::JoinR;
        }
        if self.kinds[range_start] == LaneType::Head {
            self.kinds[range_start] = LaneType::HeadL;
        }
        if self.kinds[range_end] == LaneType::Head {
            self.kinds[range_end] = LaneType::HeadR;
        }

        for i in range_start + 1..range_end {
            let t = &mut self.kinds[i];
            if *t == LaneType::NotActive {
                *t = LaneType::Cross;
            } else if *t == LaneType::Empty {
                *t = LaneType::CrossEmpty;
            } else if *t == LaneType::TailR || *t == LaneType::TailL {
                *t = LaneType::Tail;
            }
        }
    }

    /// Terminal state for the lane of a parentless commit.
    pub fn set_initial(&mut self) {
        if let Some(t) = self.kinds.get_mut(self.active) {
            if !t.is_node() {
                *t = LaneType::Initial;
            }
        }
    }

    /// Set the hash expected to continue the active lane; `None` leaves the
    /// lane with no continuation.
    pub fn next_parent(&mut self, id: Option<&CommitId>) {
        if let Some(slot) = self.next.get_mut(self.active) {
            *slot = id.cloned();
        }
    }

    pub fn after_merge(&mut self) {
        for t in &mut self.kinds {
            if t.is_head() || t.is_join() || *t == LaneType::Cross {
                *t = LaneType::NotActive;
            } else if *t == LaneType::CrossEmpty {
                *t = LaneType::Empty;
            } else if t.is_node() {
                *t = LaneType::Active;
            }
        }
    }

    pub fn after_fork(&mut self) {
        for t in &mut self.kinds {
            if *t == LaneType::Cross {
                *t = LaneType::NotActive;
            } else if t.is_tail() || *t == LaneType::CrossEmpty {
                *t = LaneType::Empty;
            }
            if t.is_node() {
                *t = LaneType::Active;
            }
        }
        while self.kinds.last() == Some(&LaneType::Empty) {
            self.kinds.pop();
            self.next.pop();
        }
    }

    pub fn is_branch(&self) -> bool {
        self.kinds.get(self.active) == Some(&LaneType::Branch)
    }

    pub fn after_branch(&mut self) {
        if let Some(t) = self.kinds.get_mut(self.active) {
            *t = LaneType::Active;
        }
    }
}
