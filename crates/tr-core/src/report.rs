//! Repair batch results.

use serde::Serialize;
use tr_common::CaseId;

/// Outcome for one variant, shared by all of its cases.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepairStatus {
    /// A rollout cleared every anomaly.
    Repaired,
    /// No rollout qualified; the case is passed through unchanged.
    NoSolution,
    /// The worker failed; the case is passed through unchanged.
    Failed { reason: String },
}

impl RepairStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, RepairStatus::Failed { .. })
    }
}

/// One output event, boundary markers removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEvent {
    pub activity: String,
    /// Dense position `1..=N`.
    pub order: u32,
}

/// Repaired form of one input case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairedCase {
    pub case_id: CaseId,
    pub events: Vec<OutputEvent>,
    /// JSON list of anomaly patterns; `"[]"` when none apply.
    pub patterns: String,
    pub status: RepairStatus,
}

/// Per-variant diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantSummary {
    pub index: usize,
    pub representative: Option<CaseId>,
    pub case_count: usize,
    pub status: RepairStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual_density: Option<f64>,
    pub episodes_run: usize,
    pub successful_episodes: usize,
    pub duration_ms: u64,
}

/// Flat output row for tabular export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub case_id: CaseId,
    pub activity: String,
    pub order: u32,
    pub patterns: String,
}

/// Result of one repair batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairReport {
    pub run_id: String,
    /// One entry per input case, grouped by variant in key order.
    pub cases: Vec<RepairedCase>,
    pub variants: Vec<VariantSummary>,
    /// Variant counts by status.
    pub repaired: usize,
    pub no_solution: usize,
    pub failed: usize,
    pub learn_duration_ms: u64,
    pub repair_duration_ms: u64,
}

impl RepairReport {
    pub fn case(&self, id: &CaseId) -> Option<&RepairedCase> {
        self.cases.iter().find(|c| &c.case_id == id)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Flatten to one row per output event.
    pub fn rows(&self) -> Vec<OutputRow> {
        self.cases
            .iter()
            .flat_map(|case| {
                case.events.iter().map(move |event| OutputRow {
                    case_id: case.case_id.clone(),
                    activity: event.activity.clone(),
                    order: event.order,
                    patterns: case.patterns.clone(),
                })
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RepairReport {
        RepairReport {
            run_id: "run-000000000000".into(),
            cases: vec![
                RepairedCase {
                    case_id: "c1".into(),
                    events: vec![
                        OutputEvent {
                            activity: "A".into(),
                            order: 1,
                        },
                        OutputEvent {
                            activity: "B".into(),
                            order: 2,
                        },
                    ],
                    patterns: r#"[{"pattern":"skip","loc":2,"activity":"B"}]"#.into(),
                    status: RepairStatus::Repaired,
                },
                RepairedCase {
                    case_id: "c2".into(),
                    events: vec![OutputEvent {
                        activity: "C".into(),
                        order: 1,
                    }],
                    patterns: "[]".into(),
                    status: RepairStatus::Failed {
                        reason: "worker panicked".into(),
                    },
                },
            ],
            variants: Vec::new(),
            repaired: 1,
            no_solution: 0,
            failed: 1,
            learn_duration_ms: 3,
            repair_duration_ms: 10,
        }
    }

    #[test]
    fn test_rows_flatten_cases() {
        let rows = report().rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].activity, "B");
        assert_eq!(rows[1].order, 2);
        assert_eq!(rows[2].case_id, CaseId::from("c2"));
        assert_eq!(rows[2].patterns, "[]");
    }

    #[test]
    fn test_lookup_and_failures() {
        let report = report();
        assert!(report.has_failures());
        assert!(report.case(&"c2".into()).unwrap().status.is_failed());
        assert!(report.case(&"c9".into()).is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(RepairStatus::Failed {
            reason: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "boom");
        assert_eq!(
            serde_json::to_string(&RepairStatus::NoSolution).unwrap(),
            r#"{"status":"no_solution"}"#
        );
        assert!(report().to_json_pretty().unwrap().contains("\"run_id\""));
    }
}
