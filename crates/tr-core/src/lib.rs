//! Trace repair core library.
//!
//! Learns normal behavior graphs from a clean event log, scores anomalous
//! cases with an anomaly detection matrix, and repairs them with a tabular
//! Q-learning agent, one variant per worker.
//!
//! The usual entry point is [`Pipeline`]:
//!
//! ```ignore
//! use tr_core::{Pipeline, EventRecord};
//! use tr_config::RepairConfig;
//!
//! let mut pipeline = Pipeline::new(RepairConfig::default())?;
//! pipeline.learn(&clean)?;
//! let report = pipeline.repair(&anomalous)?;
//! for row in report.rows() {
//!     println!("{},{},{}", row.case_id, row.activity, row.order);
//! }
//! ```

pub mod adm;
pub mod eventlog;
pub mod logging;
pub mod nbg;
pub mod orchestrator;
pub mod partition;
pub mod pipeline;
pub mod repair;
pub mod report;

pub use adm::{AnomalyDetector, AnomalyMatrix};
pub use eventlog::{ActivityFrequencies, ActivityIndex, Case, CaseEvent, CaseLog, EventRecord, LogError, LogKind};
pub use nbg::{NbgSet, NodeKey, NormalBehaviorGraph};
pub use orchestrator::RepairOrchestrator;
pub use partition::{partition, Variant};
pub use pipeline::{LearnedModel, Pipeline};
pub use repair::{PatternKind, RepairAction, RepairError, RepairPattern};
pub use report::{OutputEvent, OutputRow, RepairReport, RepairStatus, RepairedCase, VariantSummary};

/// Library version, for embedding in reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
