//! Stage and event-name vocabulary for structured logging.
//!
//! Every stage-level event carries a `stage` field and uses one of the
//! dotted names in [`event_names`] as its tracing target.

use serde::{Deserialize, Serialize};

/// Processing stages in the repair pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Event-log ingestion and normalization.
    Load,
    /// Activity index, frequency table and graph construction.
    Learn,
    /// Grouping anomalous cases into variants.
    Partition,
    /// Per-variant Q-learning repair.
    Repair,
    /// Projection of variant results onto cases.
    Reduce,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Learn => "learn",
            Stage::Partition => "partition",
            Stage::Repair => "repair",
            Stage::Reduce => "reduce",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Load stage
    pub const LOG_LOADED: &str = "log.loaded";
    pub const LOG_UNKNOWN_ACTIVITY: &str = "log.unknown_activity";

    // Learn stage
    pub const LEARN_STARTED: &str = "learn.started";
    pub const NBG_BUILT: &str = "nbg.built";
    pub const LEARN_FINISHED: &str = "learn.finished";

    // Partition stage
    pub const PARTITION_FINISHED: &str = "partition.finished";

    // Repair stage
    pub const REPAIR_BATCH_STARTED: &str = "repair.batch_started";
    pub const REPAIR_VARIANT_STARTED: &str = "repair.variant_started";
    pub const REPAIR_STEP: &str = "repair.step";
    pub const REPAIR_VARIANT_REPAIRED: &str = "repair.variant_repaired";
    pub const REPAIR_NO_SOLUTION: &str = "repair.no_solution";
    pub const REPAIR_VARIANT_FAILED: &str = "repair.variant_failed";
    pub const REPAIR_BATCH_FINISHED: &str = "repair.batch_finished";

    // Config events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Learn).unwrap(), "\"learn\"");
        assert_eq!(
            serde_json::to_string(&Stage::Partition).unwrap(),
            "\"partition\""
        );
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Load,
            Stage::Learn,
            Stage::Partition,
            Stage::Repair,
            Stage::Reduce,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json.trim_matches('"'), stage.to_string());
        }
    }

    #[test]
    fn test_event_names_are_dotted() {
        for name in [
            event_names::NBG_BUILT,
            event_names::REPAIR_NO_SOLUTION,
            event_names::REPAIR_VARIANT_FAILED,
            event_names::REPAIR_BATCH_FINISHED,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }
}
