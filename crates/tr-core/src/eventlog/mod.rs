//! Event-log ingestion: raw records, normalized cases and activity tables.
//!
//! Records are grouped by case, ordered, renumbered `1..=N` and wrapped in
//! synthetic `Start`/`End` events before any graph or repair code sees them.

pub mod activity;
pub mod case;

pub use activity::{ActivityFrequencies, ActivityFrequency, ActivityIndex, FrequencyError};
pub use case::{Case, CaseEvent, CaseLog, SequenceGroup};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One raw input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub case_id: String,
    pub activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl EventRecord {
    /// Event positioned by an explicit order value.
    pub fn ordered(case_id: impl Into<String>, activity: impl Into<String>, order: i64) -> Self {
        Self {
            case_id: case_id.into(),
            activity: activity.into(),
            timestamp: None,
            order: Some(order),
        }
    }

    /// Event positioned by its timestamp.
    pub fn timed(
        case_id: impl Into<String>,
        activity: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            activity: activity.into(),
            timestamp: Some(timestamp),
            order: None,
        }
    }
}

/// Which side of the repair a log belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Reference behaviour the graphs are learned from.
    Clean,
    /// Cases to be repaired.
    Anomalous,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::Clean => write!(f, "clean"),
            LogKind::Anomalous => write!(f, "anomalous"),
        }
    }
}

/// Input-shape errors raised while normalizing an event log.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogError {
    #[error("{kind} log has no events")]
    Empty { kind: LogKind },

    #[error("{kind} log row {row}: empty case identifier")]
    EmptyCaseId { kind: LogKind, row: usize },

    #[error("{kind} log row {row}: empty activity name")]
    EmptyActivity { kind: LogKind, row: usize },

    #[error("{kind} log row {row}: activity name '{name}' is reserved for boundary markers")]
    ReservedActivity {
        kind: LogKind,
        row: usize,
        name: String,
    },

    #[error("{kind} log row {row}: event has neither timestamp nor order")]
    MissingOrderKey { kind: LogKind, row: usize },

    #[error("{kind} log case {case_id}: events mix timestamp and order keys")]
    MixedOrderKeys { kind: LogKind, case_id: String },

    #[error("case {case_id}: activity '{activity}' never occurs in the clean log")]
    UnknownActivity { case_id: String, activity: String },
}

impl From<LogError> for tr_common::Error {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Empty { kind } => tr_common::Error::EmptyLog(format!("{kind} log")),
            LogError::UnknownActivity { activity, .. } => {
                tr_common::Error::UnknownActivity { activity }
            }
            other => tr_common::Error::InvalidInput(other.to_string()),
        }
    }
}
