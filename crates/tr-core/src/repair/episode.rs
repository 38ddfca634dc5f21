//! Episode driver: repeated rollouts for one case and selection of the best.

use rand::Rng;
use tr_common::ActivityId;
use tr_config::RepairConfig;

use super::agent::QLearningAgent;
use super::env::{EnvLimits, RepairEnv};
use super::pattern::{classify, RepairPattern};
use super::{ActionSpace, Edit, RepairError};
use crate::adm::AnomalyDetector;
use crate::eventlog::{ActivityFrequencies, ActivityIndex, Case, CaseEvent};
use crate::nbg::NbgSet;

/// One committed edit of a rollout.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub before: Vec<CaseEvent>,
    pub edit: Edit,
    pub reward: f64,
    pub after: Vec<CaseEvent>,
}

/// A rollout that ended with a clean case.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    /// Steps taken minus the final detection step.
    pub edits: usize,
    /// Vote density of the final state at threshold 0.
    pub residual_density: f64,
    pub history: Vec<HistoryEntry>,
    pub final_state: Vec<CaseEvent>,
}

/// Outcome of repairing one case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRepair {
    /// Winning final state, or the original case when nothing qualified.
    pub events: Vec<CaseEvent>,
    pub patterns: Vec<RepairPattern>,
    /// The winning record's metrics, `None` for a no-solution outcome.
    pub best: Option<(usize, f64)>,
    pub episodes_run: usize,
    pub successful_episodes: usize,
}

impl CaseRepair {
    pub fn is_repaired(&self) -> bool {
        self.best.is_some()
    }
}

/// Pick the winner among successful rollouts.
///
/// Rollouts with zero edits are ignored. Among the rest the fewest edits win,
/// then the lowest residual density, then the earliest rollout.
pub fn select_best(records: &[EpisodeRecord]) -> Option<&EpisodeRecord> {
    let fewest = records.iter().filter(|r| r.edits > 0).map(|r| r.edits).min()?;
    records
        .iter()
        .filter(|r| r.edits == fewest)
        .fold(None, |best: Option<&EpisodeRecord>, r| match best {
            Some(b) if b.residual_density <= r.residual_density => Some(b),
            _ => Some(r),
        })
}

/// Runs the configured number of rollouts for a case with a fresh agent.
#[derive(Debug, Clone)]
pub struct EpisodeDriver<'a> {
    graphs: &'a NbgSet,
    index: &'a ActivityIndex,
    actions: &'a ActionSpace,
    frequencies: &'a ActivityFrequencies,
    config: &'a RepairConfig,
}

impl<'a> EpisodeDriver<'a> {
    pub fn new(
        graphs: &'a NbgSet,
        index: &'a ActivityIndex,
        actions: &'a ActionSpace,
        frequencies: &'a ActivityFrequencies,
        config: &'a RepairConfig,
    ) -> Self {
        Self {
            graphs,
            index,
            actions,
            frequencies,
            config,
        }
    }

    /// Repair `case`, returning the best rollout or the case unchanged.
    pub fn run<R: Rng + ?Sized>(&self, case: &Case, rng: &mut R) -> Result<CaseRepair, RepairError> {
        check_shape(case)?;

        let detector = AnomalyDetector::new(self.graphs);
        let mut env = RepairEnv::new(
            detector,
            case.events.clone(),
            EnvLimits::from_config(self.config),
        );
        let mut agent = QLearningAgent::new(self.actions, self.frequencies, &self.config.agent);

        let episodes = self.config.episodes.episodes;
        let mut records = Vec::new();
        for _ in 0..episodes {
            if let Some(record) = self.rollout(&mut env, &mut agent, rng) {
                records.push(record);
            }
        }

        let successful_episodes = records.len();
        let Some(best) = select_best(&records) else {
            return Ok(CaseRepair {
                events: case.events.clone(),
                patterns: Vec::new(),
                best: None,
                episodes_run: episodes,
                successful_episodes,
            });
        };

        let edits: Vec<Edit> = best.history.iter().map(|h| h.edit).collect();
        Ok(CaseRepair {
            events: best.final_state.clone(),
            patterns: classify(&edits, self.index),
            best: Some((best.edits, best.residual_density)),
            episodes_run: episodes,
            successful_episodes,
        })
    }

    fn rollout<R: Rng + ?Sized>(
        &self,
        env: &mut RepairEnv<'_>,
        agent: &mut QLearningAgent,
        rng: &mut R,
    ) -> Option<EpisodeRecord> {
        env.reset();
        let mut state: Vec<ActivityId> = env.activities();
        let mut steps = 0usize;
        let mut history = Vec::new();

        loop {
            let action_index = agent.select_action(&state, rng);
            let action = self.actions.action(action_index)?;
            let before = env.state().to_vec();
            let outcome = env.step(action, rng);
            let next = env.activities();

            agent.update(&state, action_index, outcome.reward, &next);
            agent.decay_exploration();
            steps += 1;

            if !outcome.is_done() {
                if let Some(edit) = outcome.edit {
                    history.push(HistoryEntry {
                        before,
                        edit,
                        reward: outcome.reward,
                        after: env.state().to_vec(),
                    });
                }
            }
            state = next;

            if outcome.is_game_over() {
                return None;
            }
            if outcome.is_done() {
                return Some(EpisodeRecord {
                    edits: steps - 1,
                    residual_density: env.residual_density(),
                    history,
                    final_state: env.state().to_vec(),
                });
            }
        }
    }
}

fn check_shape(case: &Case) -> Result<(), RepairError> {
    let malformed = |reason: &str| RepairError::MalformedCase {
        case_id: case.id.clone(),
        reason: reason.to_string(),
    };
    match (case.events.first(), case.events.last()) {
        (Some(first), Some(last)) if case.events.len() >= 2 => {
            if first.activity != ActivityId::START {
                return Err(malformed("first event is not Start"));
            }
            if last.activity != ActivityId::END {
                return Err(malformed("last event is not End"));
            }
            Ok(())
        }
        _ => Err(malformed("fewer than two events")),
    }
}
