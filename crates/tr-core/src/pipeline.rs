//! Learn-then-repair façade.
//!
//! ```ignore
//! let mut pipeline = Pipeline::new(RepairConfig::default().with_seed(7))?;
//! pipeline.learn(&clean_records)?;
//! let report = pipeline.repair(&anomalous_records)?;
//! ```

use std::path::Path;
use std::time::Instant;

use tr_common::{Error, Result};
use tr_config::{load_config, validate_repair_config, ConfigSource, RepairConfig};

use crate::eventlog::{ActivityFrequencies, ActivityIndex, CaseLog, EventRecord, LogKind};
use crate::logging::{event_names, Stage};
use crate::nbg::NbgSet;
use crate::orchestrator::RepairOrchestrator;
use crate::repair::ActionSpace;
use crate::report::RepairReport;

/// Everything learned from the clean log. Immutable once built.
#[derive(Debug, Clone)]
pub struct LearnedModel {
    pub index: ActivityIndex,
    pub graphs: NbgSet,
    pub frequencies: ActivityFrequencies,
    pub actions: ActionSpace,
    pub clean_cases: usize,
    pub clean_variants: usize,
    pub learn_duration_ms: u64,
}

impl LearnedModel {
    /// Normalize the clean log and build the activity tables and graphs.
    pub fn learn(clean: &[EventRecord]) -> Result<Self> {
        let started = Instant::now();
        tracing::info!(
            target: event_names::LEARN_STARTED,
            stage = %Stage::Learn,
            events = clean.len(),
            "learning normal behavior"
        );

        let mut index = ActivityIndex::new();
        let log = CaseLog::from_records(clean, LogKind::Clean, &mut index, false)?;
        let mut model = Self::from_log(&log, index);
        model.learn_duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            target: event_names::LEARN_FINISHED,
            stage = %Stage::Learn,
            cases = model.clean_cases,
            variants = model.clean_variants,
            activities = model.actions.insert_count(),
            duration_ms = model.learn_duration_ms,
            "normal behavior learned"
        );
        Ok(model)
    }

    /// Build from an already-normalized clean log and its index.
    pub fn from_log(log: &CaseLog, index: ActivityIndex) -> Self {
        let graphs = NbgSet::build(log, &index);
        tracing::debug!(
            target: event_names::NBG_BUILT,
            stage = %Stage::Learn,
            graphs = graphs.len(),
            edges = graphs.edge_count(),
            "normal behavior graphs built"
        );

        Self {
            frequencies: ActivityFrequencies::from_log(log, &index),
            actions: ActionSpace::new(index.insertable()),
            clean_cases: log.len(),
            clean_variants: log.variants().len(),
            learn_duration_ms: 0,
            graphs,
            index,
        }
    }
}

/// Owns a validated configuration and, after `learn`, the clean model.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: RepairConfig,
    model: Option<LearnedModel>,
}

impl Pipeline {
    pub fn new(config: RepairConfig) -> Result<Self> {
        validate_repair_config(&config).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            config,
            model: None,
        })
    }

    /// Resolve, load and validate the configuration, then build a pipeline.
    pub fn from_config_path(path: Option<&Path>) -> Result<Self> {
        let resolved = load_config(path).map_err(|e| Error::Config(e.to_string()))?;
        if resolved.source == ConfigSource::BuiltinDefault {
            tracing::info!(
                target: event_names::CONFIG_DEFAULT_USED,
                stage = %Stage::Init,
                "no configuration file found; using defaults"
            );
        } else {
            tracing::info!(
                target: event_names::CONFIG_LOADED,
                stage = %Stage::Init,
                source = %resolved.source,
                path = ?resolved.path,
                "configuration loaded"
            );
        }
        Self::new(resolved.config)
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    pub fn model(&self) -> Option<&LearnedModel> {
        self.model.as_ref()
    }

    /// Learn (or relearn) the clean model.
    pub fn learn(&mut self, clean: &[EventRecord]) -> Result<&LearnedModel> {
        let model = LearnedModel::learn(clean)?;
        Ok(self.model.insert(model))
    }

    /// Repair an anomalous log against the learned model.
    pub fn repair(&self, anomalous: &[EventRecord]) -> Result<RepairReport> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::Repair("no clean model learned; call learn first".into()))?;

        let mut index = model.index.clone();
        let log = CaseLog::from_records(
            anomalous,
            LogKind::Anomalous,
            &mut index,
            self.config.runtime.strict_activities,
        )?;

        RepairOrchestrator::new(model, &index, &self.config).run(&log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_common::ErrorCategory;

    fn clean() -> Vec<EventRecord> {
        vec![
            EventRecord::ordered("c1", "A", 1),
            EventRecord::ordered("c1", "B", 2),
            EventRecord::ordered("c2", "A", 1),
            EventRecord::ordered("c2", "C", 2),
            EventRecord::ordered("c3", "A", 1),
            EventRecord::ordered("c3", "B", 2),
        ]
    }

    #[test]
    fn test_learn_builds_model() {
        let model = LearnedModel::learn(&clean()).unwrap();
        assert_eq!(model.clean_cases, 3);
        assert_eq!(model.clean_variants, 2);
        assert_eq!(model.actions.len(), 5);
        // Start, End, A, B, C.
        assert_eq!(model.graphs.len(), 5);
        let b = model.index.get("B").unwrap();
        assert!((model.frequencies.probability(b) - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Pipeline::new(RepairConfig::default().with_alpha(2.0)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_from_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repair.json");
        std::fs::write(&path, r#"{"episodes": {"episodes": 42}, "runtime": {"seed": 9}}"#).unwrap();

        let pipeline = Pipeline::from_config_path(Some(&path)).unwrap();
        assert_eq!(pipeline.config().episodes.episodes, 42);
        assert_eq!(pipeline.config().runtime.seed, Some(9));

        let missing = dir.path().join("absent.json");
        let err = Pipeline::from_config_path(Some(&missing)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(err.to_string().contains("absent.json"));

        std::fs::write(&path, r#"{"detection": {"alpha": 3.0}}"#).unwrap();
        let err = Pipeline::from_config_path(Some(&path)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_repair_requires_model() {
        let pipeline = Pipeline::new(RepairConfig::default()).unwrap();
        let err = pipeline
            .repair(&[EventRecord::ordered("x", "A", 1)])
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Repair);
    }

    #[test]
    fn test_strict_mode_rejects_unknown_activity() {
        let mut config = RepairConfig::default().with_episodes(1);
        config.runtime.strict_activities = true;
        let mut pipeline = Pipeline::new(config).unwrap();
        pipeline.learn(&clean()).unwrap();

        let err = pipeline
            .repair(&[EventRecord::ordered("x", "Z", 1)])
            .unwrap_err();
        assert_eq!(err.code(), 12);
    }

    #[test]
    fn test_empty_clean_log_rejected() {
        let mut pipeline = Pipeline::new(RepairConfig::default()).unwrap();
        let err = pipeline.learn(&[]).unwrap_err();
        assert_eq!(err.code(), 11);
        assert!(pipeline.model().is_none());
    }

    #[test]
    fn test_repair_does_not_mutate_model() {
        let mut pipeline = Pipeline::new(RepairConfig::default().with_episodes(5).with_seed(1))
            .unwrap();
        pipeline.learn(&clean()).unwrap();
        let before = pipeline.model().unwrap().index.len();
        pipeline
            .repair(&[EventRecord::ordered("x", "A", 1), EventRecord::ordered("x", "Q", 2)])
            .unwrap();
        assert_eq!(pipeline.model().unwrap().index.len(), before);
    }
}
