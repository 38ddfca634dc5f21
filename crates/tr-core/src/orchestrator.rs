//! Parallel repair of variants and projection of results onto cases.
//!
//! Variants are independent: each worker owns its environment, agent and RNG
//! and only reads the shared model. A failing or panicking worker marks its
//! variant `Failed` and the batch continues.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::Span;
use tr_common::{Error, Result};
use tr_config::RepairConfig;

use crate::eventlog::{ActivityIndex, CaseEvent, CaseLog};
use crate::logging::{event_names, generate_run_id, Stage};
use crate::partition::{partition, Variant};
use crate::pipeline::LearnedModel;
use crate::repair::{serialize_patterns, CaseRepair, EpisodeDriver, RepairError};
use crate::report::{OutputEvent, RepairReport, RepairStatus, RepairedCase, VariantSummary};

/// Result of one worker.
#[derive(Debug)]
struct VariantOutcome {
    result: std::result::Result<CaseRepair, RepairError>,
    duration_ms: u64,
}

/// Runs one repair batch over a worker pool.
#[derive(Debug, Clone, Copy)]
pub struct RepairOrchestrator<'a> {
    model: &'a LearnedModel,
    index: &'a ActivityIndex,
    config: &'a RepairConfig,
}

impl<'a> RepairOrchestrator<'a> {
    /// `index` is the model's index extended with activities seen only in the
    /// anomalous log.
    pub fn new(model: &'a LearnedModel, index: &'a ActivityIndex, config: &'a RepairConfig) -> Self {
        Self {
            model,
            index,
            config,
        }
    }

    /// Worker count: configured value, else host parallelism.
    pub fn worker_count(&self) -> usize {
        self.config.runtime.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Partition `log` and repair every variant.
    pub fn run(&self, log: &CaseLog) -> Result<RepairReport> {
        let variants = partition(log, self.index);
        tracing::info!(
            target: event_names::PARTITION_FINISHED,
            stage = %Stage::Partition,
            cases = log.len(),
            variants = variants.len(),
            "anomalous log partitioned"
        );
        self.run_variants(&variants, log)
    }

    /// Repair pre-partitioned variants whose cases are looked up in `log`.
    pub fn run_variants(&self, variants: &[Variant], log: &CaseLog) -> Result<RepairReport> {
        let run_id = generate_run_id();
        let started = Instant::now();
        let workers = self.worker_count();

        let batch = tracing::info_span!("repair_batch", run_id = %run_id, workers);
        let _guard = batch.enter();
        tracing::info!(
            target: event_names::REPAIR_BATCH_STARTED,
            stage = %Stage::Repair,
            variants = variants.len(),
            workers,
            seeded = self.config.runtime.seed.is_some(),
            "repair batch started"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tr-worker-{i}"))
            .build()
            .map_err(|e| Error::Repair(format!("failed to start worker pool: {e}")))?;

        let parent = Span::current();
        let outcomes: Vec<VariantOutcome> = pool.install(|| {
            variants
                .par_iter()
                .map(|variant| self.repair_variant(variant, log, &parent))
                .collect()
        });

        let mut report = self.reduce(variants, outcomes, log);
        report.run_id = run_id;
        report.learn_duration_ms = self.model.learn_duration_ms;
        report.repair_duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            target: event_names::REPAIR_BATCH_FINISHED,
            stage = %Stage::Reduce,
            cases = report.cases.len(),
            repaired = report.repaired,
            no_solution = report.no_solution,
            failed = report.failed,
            duration_ms = report.repair_duration_ms,
            "repair batch finished"
        );
        Ok(report)
    }

    fn repair_variant(&self, variant: &Variant, log: &CaseLog, parent: &Span) -> VariantOutcome {
        let span = tracing::info_span!(
            parent: parent,
            "variant",
            index = variant.index,
            cases = variant.case_count()
        );
        let _guard = span.enter();
        tracing::debug!(
            target: event_names::REPAIR_VARIANT_STARTED,
            stage = %Stage::Repair,
            key = %variant.key,
            "repairing variant"
        );

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.repair_representative(variant, log)))
            .unwrap_or_else(|payload| Err(RepairError::Panicked(panic_message(payload.as_ref()))));

        VariantOutcome {
            result,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn repair_representative(
        &self,
        variant: &Variant,
        log: &CaseLog,
    ) -> std::result::Result<CaseRepair, RepairError> {
        let case_id = variant
            .representative()
            .ok_or_else(|| RepairError::MalformedCase {
                case_id: variant.key.as_str().into(),
                reason: "variant has no cases".into(),
            })?;
        let case = log
            .get(case_id)
            .ok_or_else(|| RepairError::MissingRepresentative {
                case_id: case_id.clone(),
            })?;

        let mut rng = match self.config.runtime.seed {
            Some(base) => StdRng::seed_from_u64(variant_seed(base, variant.index)),
            None => StdRng::from_os_rng(),
        };

        let driver = EpisodeDriver::new(
            &self.model.graphs,
            self.index,
            &self.model.actions,
            &self.model.frequencies,
            self.config,
        );
        driver.run(case, &mut rng)
    }

    fn reduce(&self, variants: &[Variant], outcomes: Vec<VariantOutcome>, log: &CaseLog) -> RepairReport {
        let mut report = RepairReport {
            run_id: String::new(),
            cases: Vec::with_capacity(log.len()),
            variants: Vec::with_capacity(variants.len()),
            repaired: 0,
            no_solution: 0,
            failed: 0,
            learn_duration_ms: 0,
            repair_duration_ms: 0,
        };

        for (variant, outcome) in variants.iter().zip(outcomes) {
            let summary = match outcome.result {
                Ok(repair) => {
                    let status = if repair.is_repaired() {
                        report.repaired += 1;
                        tracing::debug!(
                            target: event_names::REPAIR_VARIANT_REPAIRED,
                            stage = %Stage::Reduce,
                            variant = variant.index,
                            edits = repair.best.map(|(edits, _)| edits),
                            "variant repaired"
                        );
                        RepairStatus::Repaired
                    } else {
                        report.no_solution += 1;
                        tracing::info!(
                            target: event_names::REPAIR_NO_SOLUTION,
                            stage = %Stage::Reduce,
                            variant = variant.index,
                            key = %variant.key,
                            successful_episodes = repair.successful_episodes,
                            "no qualifying rollout; cases passed through unchanged"
                        );
                        RepairStatus::NoSolution
                    };

                    let events = output_events(&repair.events, self.index);
                    let patterns = serialize_patterns(&repair.patterns);
                    for case_id in &variant.case_ids {
                        report.cases.push(RepairedCase {
                            case_id: case_id.clone(),
                            events: events.clone(),
                            patterns: patterns.clone(),
                            status: status.clone(),
                        });
                    }

                    VariantSummary {
                        index: variant.index,
                        representative: variant.representative().cloned(),
                        case_count: variant.case_count(),
                        status,
                        edits: repair.best.map(|(edits, _)| edits),
                        residual_density: repair.best.map(|(_, density)| density),
                        episodes_run: repair.episodes_run,
                        successful_episodes: repair.successful_episodes,
                        duration_ms: outcome.duration_ms,
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    let worker_error = err.into_worker_error(variant.index);
                    tracing::warn!(
                        target: event_names::REPAIR_VARIANT_FAILED,
                        stage = %Stage::Reduce,
                        variant = variant.index,
                        code = worker_error.code(),
                        error = %worker_error,
                        "variant repair failed; cases passed through unchanged"
                    );
                    let status = RepairStatus::Failed {
                        reason: worker_error.to_string(),
                    };

                    for case_id in &variant.case_ids {
                        let events = log
                            .get(case_id)
                            .map(|case| output_events(&case.events, self.index))
                            .unwrap_or_default();
                        report.cases.push(RepairedCase {
                            case_id: case_id.clone(),
                            events,
                            patterns: serialize_patterns(&[]),
                            status: status.clone(),
                        });
                    }

                    VariantSummary {
                        index: variant.index,
                        representative: variant.representative().cloned(),
                        case_count: variant.case_count(),
                        status,
                        edits: None,
                        residual_density: None,
                        episodes_run: 0,
                        successful_episodes: 0,
                        duration_ms: outcome.duration_ms,
                    }
                }
            };
            report.variants.push(summary);
        }

        report
    }
}

/// Drop boundary markers and renumber positions `1..=N`.
fn output_events(events: &[CaseEvent], index: &ActivityIndex) -> Vec<OutputEvent> {
    events
        .iter()
        .filter(|e| !e.activity.is_boundary())
        .enumerate()
        .map(|(i, e)| OutputEvent {
            activity: index.name(e.activity).to_string(),
            order: i as u32 + 1,
        })
        .collect()
}

/// Per-variant seed; a splitmix64 finalizer over the base seed and index.
fn variant_seed(base: u64, index: usize) -> u64 {
    let mut z = base ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
