//! Trace repair configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for repair.json
//! - Config resolution (CLI → env → XDG → system → defaults)
//! - Semantic validation of every tunable

pub mod repair;
pub mod resolve;
pub mod validate;

pub use repair::{
    AgentConfig, DetectionConfig, EpisodeConfig, RepairConfig, RuntimeConfig,
};
pub use resolve::{load_config, resolve_config, ConfigSource, ResolvedConfig};
pub use validate::{validate_repair_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
