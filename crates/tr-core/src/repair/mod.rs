//! Per-case repair: environment, agent, episode driver and pattern labels.
//!
//! An action edits the case around one anomalous transition. The action space
//! is fixed per run: two removals followed by one insert per clean activity.

pub mod agent;
pub mod env;
pub mod episode;
pub mod pattern;

pub use agent::QLearningAgent;
pub use env::{EnvLimits, EpisodePhase, RepairEnv, StepOutcome};
pub use episode::{select_best, CaseRepair, EpisodeDriver, EpisodeRecord, HistoryEntry};
pub use pattern::{classify, serialize_patterns, PatternKind, RepairPattern};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tr_common::{ActivityId, CaseId};

/// An edit applied around the anomalous transition `(i, i + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RepairAction {
    /// Remove the event at `i`.
    RemoveLeft,
    /// Remove the event at `i + 1`.
    RemoveRight,
    /// Insert the activity between `i` and `i + 1`.
    Insert(ActivityId),
}

/// Indexed action set: `[RemoveLeft, RemoveRight, Insert(a) for a in insertable]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpace {
    insertable: Vec<ActivityId>,
}

impl ActionSpace {
    /// Number of removal actions preceding the inserts.
    pub const REMOVALS: usize = 2;

    pub fn new(insertable: Vec<ActivityId>) -> Self {
        Self { insertable }
    }

    pub fn len(&self) -> usize {
        Self::REMOVALS + self.insertable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert_count(&self) -> usize {
        self.insertable.len()
    }

    pub fn action(&self, index: usize) -> Option<RepairAction> {
        match index {
            0 => Some(RepairAction::RemoveLeft),
            1 => Some(RepairAction::RemoveRight),
            i => self
                .insertable
                .get(i - Self::REMOVALS)
                .map(|&a| RepairAction::Insert(a)),
        }
    }

    pub fn index_of(&self, action: RepairAction) -> Option<usize> {
        match action {
            RepairAction::RemoveLeft => Some(0),
            RepairAction::RemoveRight => Some(1),
            RepairAction::Insert(a) => self
                .insertable
                .iter()
                .position(|&x| x == a)
                .map(|i| i + Self::REMOVALS),
        }
    }
}

/// Kind of a committed edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Remove,
    Inject,
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditKind::Remove => write!(f, "remove"),
            EditKind::Inject => write!(f, "inject"),
        }
    }
}

/// An edit committed by one environment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub kind: EditKind,
    /// Order value of the removed event, or the order assigned to the
    /// inserted one.
    pub loc: u32,
    pub activity: ActivityId,
    /// The removed activity equals its neighbour on the kept side.
    pub rework: bool,
}

/// Failures confined to the repair of one variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepairError {
    #[error("representative case {case_id} is missing from the anomalous log")]
    MissingRepresentative { case_id: CaseId },

    #[error("case {case_id} is malformed: {reason}")]
    MalformedCase { case_id: CaseId, reason: String },

    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl RepairError {
    pub fn into_worker_error(self, variant: usize) -> tr_common::Error {
        tr_common::Error::Worker {
            variant,
            reason: self.to_string(),
        }
    }
}
