//! Tabular Q-learning agent.
//!
//! States are keyed by their activity sequence. Exploration splits evenly
//! between the two removals and an insert drawn by clean-log frequency.

use std::collections::HashMap;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use tr_common::ActivityId;
use tr_config::AgentConfig;

use super::ActionSpace;
use crate::eventlog::ActivityFrequencies;

/// Q-table learner for one variant.
#[derive(Debug, Clone)]
pub struct QLearningAgent {
    action_count: usize,
    insert_count: usize,
    learning_rate: f64,
    discount_factor: f64,
    exploration_rate: f64,
    exploration_decay_rate: f64,
    exploration_floor: f64,
    insert_weights: Option<WeightedIndex<f64>>,
    q_table: HashMap<Vec<ActivityId>, Vec<f64>>,
}

impl QLearningAgent {
    pub fn new(actions: &ActionSpace, frequencies: &ActivityFrequencies, params: &AgentConfig) -> Self {
        // All-zero or malformed weights fall back to uniform insert sampling.
        let insert_weights = WeightedIndex::new(frequencies.weights()).ok();
        Self {
            action_count: actions.len(),
            insert_count: actions.insert_count(),
            learning_rate: params.learning_rate,
            discount_factor: params.discount_factor,
            exploration_rate: params.exploration_rate,
            exploration_decay_rate: params.exploration_decay_rate,
            exploration_floor: params.exploration_floor,
            insert_weights,
            q_table: HashMap::new(),
        }
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Learned value, 0 for unseen pairs.
    pub fn q_value(&self, state: &[ActivityId], action: usize) -> f64 {
        self.q_table
            .get(state)
            .and_then(|values| values.get(action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of states with at least one update.
    pub fn states_seen(&self) -> usize {
        self.q_table.len()
    }

    /// Pick an action index for `state`.
    pub fn select_action<R: Rng + ?Sized>(&self, state: &[ActivityId], rng: &mut R) -> usize {
        if rng.random::<f64>() < self.exploration_rate {
            return self.explore(rng);
        }
        self.greedy(state)
    }

    fn explore<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        if self.insert_count == 0 || rng.random_bool(0.5) {
            return rng.random_range(0..ActionSpace::REMOVALS);
        }
        let offset = match &self.insert_weights {
            Some(weights) => weights.sample(rng),
            None => rng.random_range(0..self.insert_count),
        };
        ActionSpace::REMOVALS + offset
    }

    /// Highest-valued action; ties go to the lowest index.
    pub fn greedy(&self, state: &[ActivityId]) -> usize {
        let Some(values) = self.q_table.get(state) else {
            return 0;
        };
        let mut best = 0;
        for (i, &value) in values.iter().enumerate() {
            if value > values[best] {
                best = i;
            }
        }
        best
    }

    /// Standard one-step update bootstrapping from the best value of `next`.
    pub fn update(&mut self, state: &[ActivityId], action: usize, reward: f64, next: &[ActivityId]) {
        if action >= self.action_count {
            return;
        }
        let best_next = self
            .q_table
            .get(next)
            .map(|values| values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .unwrap_or(0.0);

        let action_count = self.action_count;
        let values = self
            .q_table
            .entry(state.to_vec())
            .or_insert_with(|| vec![0.0; action_count]);
        let old = values[action];
        values[action] = old + self.learning_rate * (reward + self.discount_factor * best_next - old);
    }

    /// Multiplicative decay, clamped at the floor.
    pub fn decay_exploration(&mut self) {
        self.exploration_rate = (self.exploration_rate * (1.0 - self.exploration_decay_rate))
            .max(self.exploration_floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap as Map;

    use crate::eventlog::ActivityIndex;

    fn setup(counts: &[(&str, u64)]) -> (ActionSpace, ActivityFrequencies) {
        let mut index = ActivityIndex::new();
        for (name, _) in counts {
            index.intern_clean(name);
        }
        let counts: Map<String, u64> = counts.iter().map(|&(n, c)| (n.to_string(), c)).collect();
        let freq = ActivityFrequencies::from_counts(&index, &counts).unwrap();
        (ActionSpace::new(index.insertable()), freq)
    }

    fn state() -> Vec<ActivityId> {
        vec![ActivityId::START, ActivityId(2), ActivityId::END]
    }

    #[test]
    fn test_greedy_on_unseen_state_is_first_action() {
        let (actions, freq) = setup(&[("A", 1)]);
        let agent = QLearningAgent::new(&actions, &freq, &AgentConfig::default());
        assert_eq!(agent.greedy(&state()), 0);
        assert_eq!(agent.q_value(&state(), 2), 0.0);
    }

    #[test]
    fn test_update_from_unseen_successor() {
        let (actions, freq) = setup(&[("A", 1)]);
        let mut agent = QLearningAgent::new(&actions, &freq, &AgentConfig::default());
        let next = vec![ActivityId::START, ActivityId::END];

        agent.update(&state(), 1, 2.0, &next);
        assert!((agent.q_value(&state(), 1) - 0.2).abs() < 1e-12);
        assert_eq!(agent.greedy(&state()), 1);
        assert_eq!(agent.states_seen(), 1);
    }

    #[test]
    fn test_update_bootstraps_from_successor() {
        let (actions, freq) = setup(&[("A", 1)]);
        let mut agent = QLearningAgent::new(&actions, &freq, &AgentConfig::default());
        let next = vec![ActivityId::START, ActivityId::END];

        agent.update(&next, 2, 10.0, &state());
        // best(next) = 1.0 after the first update.
        agent.update(&state(), 0, 0.0, &next);
        assert!((agent.q_value(&state(), 0) - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_greedy_picks_highest_value() {
        let (actions, freq) = setup(&[("A", 1), ("B", 1)]);
        let mut agent = QLearningAgent::new(&actions, &freq, &AgentConfig::default());
        let next = state();
        agent.update(&state(), 3, 1.0, &next);
        let value = agent.q_value(&state(), 3);
        agent.update(&state(), 2, 1.0, &next);
        // Both inserts hold a positive value; the bootstrapped one is larger.
        assert!(agent.q_value(&state(), 2) > value);
        assert_eq!(agent.greedy(&state()), 2);
    }

    #[test]
    fn test_exploration_respects_weights() {
        let (actions, freq) = setup(&[("A", 1), ("B", 0)]);
        let params = AgentConfig {
            exploration_rate: 1.0,
            ..AgentConfig::default()
        };
        let agent = QLearningAgent::new(&actions, &freq, &params);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let action = agent.select_action(&state(), &mut rng);
            // B has zero weight, so index 3 is never drawn.
            assert!(action < 3, "drew {action}");
        }
    }

    #[test]
    fn test_exploration_without_inserts() {
        let (actions, freq) = setup(&[]);
        let params = AgentConfig {
            exploration_rate: 1.0,
            ..AgentConfig::default()
        };
        let agent = QLearningAgent::new(&actions, &freq, &params);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert!(agent.select_action(&state(), &mut rng) < ActionSpace::REMOVALS);
        }
    }

    #[test]
    fn test_decay_clamps_at_floor() {
        let (actions, freq) = setup(&[("A", 1)]);
        let params = AgentConfig {
            exploration_rate: 0.02,
            exploration_decay_rate: 0.5,
            exploration_floor: 0.01,
            ..AgentConfig::default()
        };
        let mut agent = QLearningAgent::new(&actions, &freq, &params);
        agent.decay_exploration();
        assert!((agent.exploration_rate() - 0.01).abs() < 1e-12);
        agent.decay_exploration();
        assert_eq!(agent.exploration_rate(), 0.01);
    }
}
