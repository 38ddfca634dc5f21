//! Trace repair common types and errors.
//!
//! This crate provides foundational types shared across the repair engine:
//! - Case and activity identity types
//! - Synthetic boundary-marker names
//! - The unified error type with stable codes

pub mod error;
pub mod id;

pub use error::{Error, ErrorCategory, Result};
pub use id::{ActivityId, CaseId, END_ACTIVITY, START_ACTIVITY};
