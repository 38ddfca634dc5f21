//! Repair configuration types.
//!
//! Every section defaults independently, so a file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Complete repair configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub schema_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub detection: DetectionConfig,
    pub episodes: EpisodeConfig,
    pub agent: AgentConfig,
    pub runtime: RuntimeConfig,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            detection: DetectionConfig::default(),
            episodes: EpisodeConfig::default(),
            agent: AgentConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Anomaly detection matrix settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// An in-trace transition is expected only if its learned likelihood is
    /// strictly greater than this threshold.
    pub alpha: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { alpha: 0.0 }
    }
}

/// Episode budget and environment limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Rollouts attempted per variant representative.
    pub episodes: usize,
    /// A rollout aborts once its step counter exceeds this value.
    pub max_step: u32,
    /// A rollout aborts once the case holds fewer events than this,
    /// boundary markers included.
    pub min_case_len: usize,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            episodes: 500,
            max_step: 8,
            min_case_len: 4,
        }
    }
}

/// Tabular Q-learning hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub exploration_decay_rate: f64,
    pub exploration_floor: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 0.5,
            exploration_decay_rate: 0.0001,
            exploration_floor: 0.01,
        }
    }
}

/// Worker pool and reproducibility settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker count; `None` means host available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Base seed for per-variant RNG streams; `None` draws from OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Reject anomalous events whose activity never occurs in the clean log.
    pub strict_activities: bool,
}

impl RepairConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Set the ADM threshold.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.detection.alpha = alpha;
        self
    }

    /// Set the episode budget.
    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.episodes.episodes = episodes;
        self
    }

    /// Set the per-episode step limit.
    pub fn with_max_step(mut self, max_step: u32) -> Self {
        self.episodes.max_step = max_step;
        self
    }

    /// Fix the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.runtime.seed = Some(seed);
        self
    }

    /// Fix the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.runtime.workers = Some(workers);
        self
    }
}
