//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::repair::RepairConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a repair configuration semantically.
pub fn validate_repair_config(config: &RepairConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    // A threshold of 1.0 or above rejects every edge, so every case is anomalous.
    check_range("detection.alpha", config.detection.alpha, 0.0, 1.0, true, false)?;

    if config.episodes.min_case_len < 2 {
        return Err(ValidationError::InvalidValue {
            field: "episodes.min_case_len".to_string(),
            message: format!(
                "Must be at least 2 (Start and End), got {}",
                config.episodes.min_case_len
            ),
        });
    }

    let agent = &config.agent;
    check_range("agent.learning_rate", agent.learning_rate, 0.0, 1.0, false, true)?;
    check_range("agent.discount_factor", agent.discount_factor, 0.0, 1.0, true, true)?;
    check_range("agent.exploration_rate", agent.exploration_rate, 0.0, 1.0, false, true)?;
    check_range(
        "agent.exploration_decay_rate",
        agent.exploration_decay_rate,
        0.0,
        1.0,
        true,
        false,
    )?;
    check_range("agent.exploration_floor", agent.exploration_floor, 0.0, 1.0, false, true)?;

    if agent.exploration_floor > agent.exploration_rate {
        return Err(ValidationError::SemanticError(format!(
            "agent.exploration_floor ({}) exceeds agent.exploration_rate ({})",
            agent.exploration_floor, agent.exploration_rate
        )));
    }

    if config.runtime.workers == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: "runtime.workers".to_string(),
            message: "Must be positive when set".to_string(),
        });
    }

    Ok(())
}

/// Check that `value` lies in the interval between `lo` and `hi`.
fn check_range(
    field: &str,
    value: f64,
    lo: f64,
    hi: f64,
    lo_inclusive: bool,
    hi_inclusive: bool,
) -> ValidationResult<()> {
    let above = if lo_inclusive { value >= lo } else { value > lo };
    let below = if hi_inclusive { value <= hi } else { value < hi };
    if value.is_finite() && above && below {
        return Ok(());
    }

    Err(ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!(
            "Must be in {}{}, {}{}, got {}",
            if lo_inclusive { "[" } else { "(" },
            lo,
            hi,
            if hi_inclusive { "]" } else { ")" },
            value
        ),
    })
}
