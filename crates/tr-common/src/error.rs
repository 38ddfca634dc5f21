//! Error types for trace repair.
//!
//! Errors carry a stable numeric code and a category so callers can tell an
//! input that must be fixed apart from a single variant that failed to repair.
//!
//! Code ranges:
//! - 10-19: input-shape errors (rejected before graph construction)
//! - 20-29: configuration errors
//! - 30-39: repair errors
//! - 40-49: worker errors
//! - 50-59: I/O and serialization errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for trace repair operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or incomplete event-log input.
    Input,
    /// Invalid or unreadable configuration.
    Config,
    /// Failures inside the repair engine.
    Repair,
    /// A worker failed while repairing one variant.
    Worker,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Repair => write!(f, "repair"),
            ErrorCategory::Worker => write!(f, "worker"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for trace repair.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid event log: {0}")]
    InvalidInput(String),

    #[error("event log is empty: {0}")]
    EmptyLog(String),

    #[error("activity '{activity}' is not part of the clean activity set")]
    UnknownActivity { activity: String },

    // Configuration errors (20-29)
    #[error("configuration error: {0}")]
    Config(String),

    // Repair errors (30-39)
    #[error("repair failed: {0}")]
    Repair(String),

    // Worker errors (40-49)
    #[error("worker failed on variant {variant}: {reason}")]
    Worker { variant: usize, reason: String },

    // I/O errors (50-59)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable numeric code for machine consumption.
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidInput(_) => 10,
            Error::EmptyLog(_) => 11,
            Error::UnknownActivity { .. } => 12,
            Error::Config(_) => 20,
            Error::Repair(_) => 30,
            Error::Worker { .. } => 40,
            Error::Io(_) => 50,
            Error::Json(_) => 51,
        }
    }

    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidInput(_) | Error::EmptyLog(_) | Error::UnknownActivity { .. } => {
                ErrorCategory::Input
            }
            Error::Config(_) => ErrorCategory::Config,
            Error::Repair(_) => ErrorCategory::Repair,
            Error::Worker { .. } => ErrorCategory::Worker,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether the batch can continue after this error.
    ///
    /// Input and configuration errors abort before any repair starts; a worker
    /// error only affects the variant it was raised for.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Worker { .. })
    }
}
