//! lane cell vocabulary for one row of the commit graph.

use serde::{Deserialize, Serialize};

/// The state of one lane cell in a commit row.
///
/// `Active`/`NotActive`/`Initial`/`Branch` are stable lane states. The
/// `MergeFork`, `Join`, `Head` and `Tail` families (with their left/right
/// endpoint variants) plus `Cross`/`CrossEmpty` are the transient crossing
/// markers produced while a fork or merge row is being computed; they appear
/// in that row's stored snapshot and are rewritten by the after-row
/// transitions before the next commit is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneType {
    Empty,
    Active,
    NotActive,
    MergeFork,
    MergeForkR,
    MergeForkL,
    Join,
    JoinR,
    JoinL,
    Head,
    HeadR,
    HeadL,
    Tail,
    TailR,
    TailL,
    Cross,
    CrossEmpty,
    Initial,
    Branch,
}

impl LaneType {
    pub fn is_head(self) -> bool {
        matches!(self, LaneType::Head | LaneType::HeadR | LaneType::HeadL)
    }

    pub fn is_tail(self) -> bool {
        matches!(self, LaneType::Tail | LaneType::TailR | LaneType::TailL)
    }

    pub fn is_join(self) -> bool {
        matches!(self, LaneType::Join | LaneType::JoinR | LaneType::JoinL)
    }

    /// the merge/fork node cell of a row
    pub fn is_node(self) -> bool {
        matches!(
            self,
            LaneType::MergeFork | LaneType::MergeForkR | LaneType::MergeForkL
        )
    }

    /// cells that carry the commit dot of their row
    pub fn is_active(self) -> bool {
        matches!(
            self,
            LaneType::Active | LaneType::Initial | LaneType::Branch
        ) || self.is_node()
    }
}
