//! Normalized cases and the case store.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tr_common::{ActivityId, CaseId, END_ACTIVITY, START_ACTIVITY};

use super::activity::ActivityIndex;
use super::{EventRecord, LogError, LogKind};
use crate::logging::{event_names, Stage};

/// One event of a normalized case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaseEvent {
    pub activity: ActivityId,
    /// Position within the case. `Start` is 0 and `End` is `N + 1`.
    pub order: u32,
    /// Set on events placed by a repair insert.
    pub inserted: bool,
}

impl CaseEvent {
    pub fn new(activity: ActivityId, order: u32) -> Self {
        Self {
            activity,
            order,
            inserted: false,
        }
    }
}

/// A case wrapped in its boundary markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Case {
    pub id: CaseId,
    pub events: Vec<CaseEvent>,
}

impl Case {
    /// Build a case from its inner activities, adding `Start` and `End`.
    pub fn from_activities(id: CaseId, activities: &[ActivityId]) -> Self {
        let mut events = Vec::with_capacity(activities.len() + 2);
        events.push(CaseEvent::new(ActivityId::START, 0));
        events.extend(
            activities
                .iter()
                .enumerate()
                .map(|(i, &a)| CaseEvent::new(a, i as u32 + 1)),
        );
        events.push(CaseEvent::new(ActivityId::END, activities.len() as u32 + 1));
        Self { id, events }
    }

    /// Activity sequence, boundary markers included.
    pub fn activities(&self) -> Vec<ActivityId> {
        self.events.iter().map(|e| e.activity).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Cases sharing one activity sequence, in case-id order.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceGroup {
    pub activities: Vec<ActivityId>,
    pub case_ids: Vec<CaseId>,
}

/// Normalized event log, cases in ascending case-id order.
#[derive(Debug, Clone)]
pub struct CaseLog {
    kind: LogKind,
    cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum OrderKey {
    Time(DateTime<Utc>),
    Seq(i64),
}

impl CaseLog {
    /// Normalize raw records into cases.
    ///
    /// Clean logs intern every activity as clean. Anomalous logs look names
    /// up in `index`; unseen names are rejected when `strict` is set and
    /// appended as unclean otherwise.
    pub fn from_records(
        records: &[EventRecord],
        kind: LogKind,
        index: &mut ActivityIndex,
        strict: bool,
    ) -> Result<Self, LogError> {
        if records.is_empty() {
            return Err(LogError::Empty { kind });
        }

        let mut grouped: BTreeMap<&str, Vec<(usize, &EventRecord)>> = BTreeMap::new();
        for (row, record) in records.iter().enumerate() {
            validate_record(kind, row, record)?;
            grouped
                .entry(record.case_id.as_str())
                .or_default()
                .push((row, record));
        }

        let mut unknown: HashSet<&str> = HashSet::new();
        let mut cases = Vec::with_capacity(grouped.len());
        for (case_id, rows) in grouped {
            let mut keyed = order_keys(kind, case_id, rows)?;
            keyed.sort_by(|(ka, ra), (kb, rb)| match ka.cmp(kb) {
                Ordering::Equal => ra.activity.cmp(&rb.activity),
                other => other,
            });

            let mut activities = Vec::with_capacity(keyed.len());
            for (_, record) in keyed {
                let name = record.activity.as_str();
                let id = match kind {
                    LogKind::Clean => index.intern_clean(name),
                    LogKind::Anomalous => match index.get(name) {
                        Some(id) => id,
                        None if strict => {
                            return Err(LogError::UnknownActivity {
                                case_id: case_id.to_string(),
                                activity: name.to_string(),
                            })
                        }
                        None => {
                            if unknown.insert(name) {
                                tracing::warn!(
                                    target: event_names::LOG_UNKNOWN_ACTIVITY,
                                    stage = %Stage::Load,
                                    activity = name,
                                    case_id,
                                    "activity never occurs in the clean log; its positions cast no votes"
                                );
                            }
                            index.intern_unclean(name)
                        }
                    },
                };
                activities.push(id);
            }
            cases.push(Case::from_activities(CaseId::from(case_id), &activities));
        }

        tracing::debug!(
            target: event_names::LOG_LOADED,
            stage = %Stage::Load,
            %kind,
            cases = cases.len(),
            events = records.len(),
            "event log normalized"
        );

        Ok(Self { kind, cases })
    }

    /// Wrap already-normalized cases. Cases are re-sorted by id.
    pub fn from_cases(kind: LogKind, mut cases: Vec<Case>) -> Self {
        cases.sort_by(|a, b| a.id.cmp(&b.id));
        Self { kind, cases }
    }

    pub fn kind(&self) -> LogKind {
        self.kind
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn get(&self, id: &CaseId) -> Option<&Case> {
        self.cases
            .binary_search_by(|c| c.id.cmp(id))
            .ok()
            .map(|i| &self.cases[i])
    }

    /// Group cases by activity sequence, in order of first appearance.
    pub fn variants(&self) -> Vec<SequenceGroup> {
        let mut slots: HashMap<Vec<ActivityId>, usize> = HashMap::new();
        let mut groups: Vec<SequenceGroup> = Vec::new();
        for case in &self.cases {
            let activities = case.activities();
            match slots.get(&activities) {
                Some(&slot) => groups[slot].case_ids.push(case.id.clone()),
                None => {
                    slots.insert(activities.clone(), groups.len());
                    groups.push(SequenceGroup {
                        activities,
                        case_ids: vec![case.id.clone()],
                    });
                }
            }
        }
        groups
    }

    /// Occurrences of each non-boundary activity.
    pub fn activity_counts(&self) -> HashMap<ActivityId, u64> {
        let mut counts = HashMap::new();
        for event in self.cases.iter().flat_map(|c| &c.events) {
            if !event.activity.is_boundary() {
                *counts.entry(event.activity).or_insert(0) += 1;
            }
        }
        counts
    }
}

fn validate_record(kind: LogKind, row: usize, record: &EventRecord) -> Result<(), LogError> {
    if record.case_id.trim().is_empty() {
        return Err(LogError::EmptyCaseId { kind, row });
    }
    if record.activity.trim().is_empty() {
        return Err(LogError::EmptyActivity { kind, row });
    }
    if record.activity == START_ACTIVITY || record.activity == END_ACTIVITY {
        return Err(LogError::ReservedActivity {
            kind,
            row,
            name: record.activity.clone(),
        });
    }
    if record.timestamp.is_none() && record.order.is_none() {
        return Err(LogError::MissingOrderKey { kind, row });
    }
    Ok(())
}

/// Pick one ordering key for the whole case: timestamps when every event has
/// one, otherwise order values when every event has one.
fn order_keys<'a>(
    kind: LogKind,
    case_id: &str,
    rows: Vec<(usize, &'a EventRecord)>,
) -> Result<Vec<(OrderKey, &'a EventRecord)>, LogError> {
    if rows.iter().all(|(_, r)| r.timestamp.is_some()) {
        return Ok(rows
            .into_iter()
            .filter_map(|(_, r)| r.timestamp.map(|ts| (OrderKey::Time(ts), r)))
            .collect());
    }
    if rows.iter().all(|(_, r)| r.order.is_some()) {
        return Ok(rows
            .into_iter()
            .filter_map(|(_, r)| r.order.map(|o| (OrderKey::Seq(o), r)))
            .collect());
    }
    Err(LogError::MixedOrderKeys {
        kind,
        case_id: case_id.to_string(),
    })
}
