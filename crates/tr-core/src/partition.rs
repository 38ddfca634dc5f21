//! Variant partitioning of the anomalous log.
//!
//! Cases with identical activity sequences are repaired once, through their
//! first case in id order. Variants are ordered by their `>>`-joined key.

use serde::Serialize;
use tr_common::{ActivityId, CaseId};

use crate::eventlog::{ActivityIndex, CaseLog};

/// Cases sharing one activity sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    /// Position in key order.
    pub index: usize,
    /// Activity names joined with `>>`, boundary markers included.
    pub key: String,
    pub activities: Vec<ActivityId>,
    /// Member cases in ascending id order.
    pub case_ids: Vec<CaseId>,
}

impl Variant {
    /// The case the variant is repaired through.
    pub fn representative(&self) -> Option<&CaseId> {
        self.case_ids.first()
    }

    pub fn case_count(&self) -> usize {
        self.case_ids.len()
    }
}

/// Split a log into variants. Every case lands in exactly one variant.
pub fn partition(log: &CaseLog, index: &ActivityIndex) -> Vec<Variant> {
    let mut variants: Vec<Variant> = log
        .variants()
        .into_iter()
        .map(|group| Variant {
            index: 0,
            key: index.join(&group.activities),
            activities: group.activities,
            case_ids: group.case_ids,
        })
        .collect();

    variants.sort_by(|a, b| a.key.cmp(&b.key));
    for (i, variant) in variants.iter_mut().enumerate() {
        variant.index = i;
    }
    variants
}
