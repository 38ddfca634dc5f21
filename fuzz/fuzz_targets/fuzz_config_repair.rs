//! Fuzz target for repair configuration parsing.
//!
//! Arbitrary JSON must either fail to parse, fail validation, or produce a
//! config the pipeline accepts.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tr_config::{validate_repair_config, RepairConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<RepairConfig>(data) {
        if validate_repair_config(&config).is_ok() {
            assert!(tr_core::Pipeline::new(config).is_ok());
        }
    }
});
