//! Repair environment: a case under edit and the rules for rewarding edits.

use rand::Rng;
use serde::Serialize;
use std::cmp::Ordering;
use tr_common::ActivityId;
use tr_config::RepairConfig;

use super::{Edit, EditKind, RepairAction};
use crate::adm::AnomalyDetector;
use crate::eventlog::CaseEvent;
use crate::logging::event_names;

/// Step reward before shaping.
const STEP_REWARD: f64 = -1.0;
/// Base of the improvement bonus; the current step count is subtracted.
const IMPROVEMENT_BONUS: f64 = 5.0;
const NO_CHANGE_PENALTY: f64 = 1.0;
const REGRESSION_PENALTY: f64 = 5.0;
const STEP_LIMIT_PENALTY: f64 = 10.0;

/// Detection threshold and abort limits for one environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvLimits {
    pub alpha: f64,
    pub max_step: u32,
    pub min_case_len: usize,
}

impl EnvLimits {
    pub fn from_config(config: &RepairConfig) -> Self {
        Self {
            alpha: config.detection.alpha,
            max_step: config.episodes.max_step,
            min_case_len: config.episodes.min_case_len,
        }
    }
}

impl Default for EnvLimits {
    fn default() -> Self {
        Self::from_config(&RepairConfig::default())
    }
}

/// Where a rollout stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodePhase {
    InProgress,
    /// The case was found free of anomalies.
    Done,
    /// The step limit or the length floor was crossed.
    GameOver,
}

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub reward: f64,
    pub phase: EpisodePhase,
    /// The committed edit, if the action changed the case.
    pub edit: Option<Edit>,
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        self.phase == EpisodePhase::Done
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == EpisodePhase::GameOver
    }
}

/// A case under repair.
///
/// Success is only observed by the anomaly check at the start of a step: the
/// step that removes the last anomaly still reports `InProgress`, and the
/// following step reports `Done` without editing.
#[derive(Debug, Clone)]
pub struct RepairEnv<'a> {
    detector: AnomalyDetector<'a>,
    limits: EnvLimits,
    initial: Vec<CaseEvent>,
    state: Vec<CaseEvent>,
    current_step: u32,
    phase: EpisodePhase,
}

impl<'a> RepairEnv<'a> {
    pub fn new(detector: AnomalyDetector<'a>, events: Vec<CaseEvent>, limits: EnvLimits) -> Self {
        Self {
            detector,
            limits,
            state: events.clone(),
            initial: events,
            current_step: 0,
            phase: EpisodePhase::InProgress,
        }
    }

    /// Restore the original case and clear the step counter.
    pub fn reset(&mut self) -> &[CaseEvent] {
        self.state.clone_from(&self.initial);
        self.current_step = 0;
        self.phase = EpisodePhase::InProgress;
        &self.state
    }

    pub fn state(&self) -> &[CaseEvent] {
        &self.state
    }

    /// Activity sequence of the current state.
    pub fn activities(&self) -> Vec<ActivityId> {
        self.state.iter().map(|e| e.activity).collect()
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn limits(&self) -> EnvLimits {
        self.limits
    }

    /// Anomalous transitions of the current state at the configured threshold.
    pub fn loc_anomalies(&self) -> Vec<usize> {
        self.detector
            .loc_anomalies(&self.activities(), self.limits.alpha)
    }

    /// Vote density of the current state at threshold 0.
    pub fn residual_density(&self) -> f64 {
        self.detector.matrix(&self.activities(), 0.0).density()
    }

    /// Apply `action` around a randomly chosen anomalous transition.
    pub fn step<R: Rng + ?Sized>(&mut self, action: RepairAction, rng: &mut R) -> StepOutcome {
        self.current_step += 1;
        let mut reward = STEP_REWARD;

        let before = self.loc_anomalies();
        if before.is_empty() {
            self.phase = EpisodePhase::Done;
            return StepOutcome {
                reward,
                phase: self.phase,
                edit: None,
            };
        }

        let target = before[rng.random_range(0..before.len())];
        let edit = self.apply(action, target);

        let after = self.loc_anomalies();
        match after.len().cmp(&before.len()) {
            Ordering::Less => reward += IMPROVEMENT_BONUS - f64::from(self.current_step),
            Ordering::Equal => reward -= NO_CHANGE_PENALTY,
            Ordering::Greater => reward -= REGRESSION_PENALTY,
        }

        let mut game_over = false;
        if self.current_step > self.limits.max_step {
            game_over = true;
            reward -= STEP_LIMIT_PENALTY;
        }
        if self.state.len() < self.limits.min_case_len {
            game_over = true;
        }
        self.phase = if game_over {
            EpisodePhase::GameOver
        } else {
            EpisodePhase::InProgress
        };

        tracing::trace!(
            target: event_names::REPAIR_STEP,
            step = self.current_step,
            ?action,
            transition = target,
            anomalies_before = before.len(),
            anomalies_after = after.len(),
            reward,
            phase = ?self.phase,
            "environment step"
        );

        StepOutcome {
            reward,
            phase: self.phase,
            edit,
        }
    }

    /// Edit the state around transition `(i, i + 1)`. Edits that would touch
    /// a boundary marker leave the state unchanged.
    fn apply(&mut self, action: RepairAction, i: usize) -> Option<Edit> {
        let n = self.state.len();
        match action {
            RepairAction::RemoveLeft => {
                if i == 0 || i >= n {
                    return None;
                }
                let removed = self.state.remove(i);
                let rework = self
                    .state
                    .get(i)
                    .is_some_and(|next| next.activity == removed.activity);
                Some(Edit {
                    kind: EditKind::Remove,
                    loc: removed.order,
                    activity: removed.activity,
                    rework,
                })
            }
            RepairAction::RemoveRight => {
                let j = i + 1;
                if j + 1 >= n {
                    return None;
                }
                let removed = self.state.remove(j);
                let rework = self.state[j - 1].activity == removed.activity;
                Some(Edit {
                    kind: EditKind::Remove,
                    loc: removed.order,
                    activity: removed.activity,
                    rework,
                })
            }
            RepairAction::Insert(activity) => {
                let anchor = *self.state.get(i)?;
                let order = anchor.order + 1;
                self.state.insert(
                    i + 1,
                    CaseEvent {
                        activity,
                        order,
                        inserted: true,
                    },
                );
                Some(Edit {
                    kind: EditKind::Inject,
                    loc: order,
                    activity,
                    rework: false,
                })
            }
        }
    }
}
