//! Activity interning and the clean-log frequency table.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tr_common::{ActivityId, END_ACTIVITY, START_ACTIVITY};

use super::case::CaseLog;

/// Dense interning of activity names.
///
/// `Start` and `End` always hold ids 0 and 1. Activities observed in the clean
/// log are flagged clean; names first seen in an anomalous log are appended
/// unclean and never become insertion candidates.
#[derive(Debug, Clone)]
pub struct ActivityIndex {
    names: Vec<String>,
    clean: Vec<bool>,
    lookup: HashMap<String, ActivityId>,
}

impl Default for ActivityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityIndex {
    pub fn new() -> Self {
        let mut index = Self {
            names: Vec::new(),
            clean: Vec::new(),
            lookup: HashMap::new(),
        };
        index.push(START_ACTIVITY, true);
        index.push(END_ACTIVITY, true);
        index
    }

    fn push(&mut self, name: &str, clean: bool) -> ActivityId {
        let id = ActivityId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.clean.push(clean);
        self.lookup.insert(name.to_string(), id);
        id
    }

    /// Intern a name observed in the clean log.
    pub fn intern_clean(&mut self, name: &str) -> ActivityId {
        match self.lookup.get(name) {
            Some(&id) => {
                self.clean[id.index()] = true;
                id
            }
            None => self.push(name, true),
        }
    }

    /// Intern a name observed only in an anomalous log.
    pub fn intern_unclean(&mut self, name: &str) -> ActivityId {
        match self.lookup.get(name) {
            Some(&id) => id,
            None => self.push(name, false),
        }
    }

    pub fn get(&self, name: &str) -> Option<ActivityId> {
        self.lookup.get(name).copied()
    }

    /// Name for an interned id. Unknown ids render as `"?"`.
    pub fn name(&self, id: ActivityId) -> &str {
        self.names.get(id.index()).map(String::as_str).unwrap_or("?")
    }

    pub fn is_clean(&self, id: ActivityId) -> bool {
        self.clean.get(id.index()).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Clean activities, boundary markers included, in id order.
    pub fn clean_ids(&self) -> impl Iterator<Item = ActivityId> + '_ {
        self.clean
            .iter()
            .enumerate()
            .filter(|(_, &clean)| clean)
            .map(|(i, _)| ActivityId(i as u32))
    }

    /// Activities an insert action may place: clean and not a boundary marker.
    pub fn insertable(&self) -> Vec<ActivityId> {
        self.clean_ids().filter(|id| !id.is_boundary()).collect()
    }

    /// Join the names of a sequence with `>>`, the variant key format.
    pub fn join(&self, activities: &[ActivityId]) -> String {
        activities
            .iter()
            .map(|&id| self.name(id))
            .collect::<Vec<_>>()
            .join(">>")
    }
}

/// Frequency table errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrequencyError {
    #[error("activity '{activity}' is not part of the clean activity set")]
    UnknownActivity { activity: String },
}

impl From<FrequencyError> for tr_common::Error {
    fn from(err: FrequencyError) -> Self {
        match err {
            FrequencyError::UnknownActivity { activity } => {
                tr_common::Error::UnknownActivity { activity }
            }
        }
    }
}

/// Count and sampling probability of one insertable activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityFrequency {
    pub activity: ActivityId,
    pub count: u64,
    pub probability: f64,
}

/// Relative frequencies of clean non-boundary activities.
///
/// Entries follow [`ActivityIndex::insertable`] order, which is also the order
/// of insert actions in the action space.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityFrequencies {
    entries: Vec<ActivityFrequency>,
}

impl ActivityFrequencies {
    /// Count occurrences over every case of the clean log.
    pub fn from_log(log: &CaseLog, index: &ActivityIndex) -> Self {
        Self::from_id_counts(index, &log.activity_counts())
    }

    /// Build from externally supplied counts keyed by activity name.
    ///
    /// Insertable activities missing from `counts` get zero weight.
    pub fn from_counts(
        index: &ActivityIndex,
        counts: &HashMap<String, u64>,
    ) -> Result<Self, FrequencyError> {
        let mut by_id = HashMap::with_capacity(counts.len());
        for (name, &count) in counts {
            match index.get(name) {
                Some(id) if index.is_clean(id) && !id.is_boundary() => {
                    by_id.insert(id, count);
                }
                _ => {
                    return Err(FrequencyError::UnknownActivity {
                        activity: name.clone(),
                    })
                }
            }
        }
        Ok(Self::from_id_counts(index, &by_id))
    }

    fn from_id_counts(index: &ActivityIndex, counts: &HashMap<ActivityId, u64>) -> Self {
        let insertable = index.insertable();
        let total: u64 = insertable
            .iter()
            .map(|id| counts.get(id).copied().unwrap_or(0))
            .sum();

        let entries = insertable
            .into_iter()
            .map(|activity| {
                let count = counts.get(&activity).copied().unwrap_or(0);
                let probability = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                };
                ActivityFrequency {
                    activity,
                    count,
                    probability,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[ActivityFrequency] {
        &self.entries
    }

    pub fn probability(&self, activity: ActivityId) -> f64 {
        self.entries
            .iter()
            .find(|e| e.activity == activity)
            .map(|e| e.probability)
            .unwrap_or(0.0)
    }

    /// Sampling weights in insert-action order.
    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.probability).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
