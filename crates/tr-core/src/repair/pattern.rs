//! Anomaly pattern labels derived from a winning edit history.
//!
//! Edits describe the repair; patterns describe the anomaly it undid. A
//! removed event was an insertion anomaly and an injected event fills a skip.
//! Later rules override earlier ones for the same edit:
//!
//! 1. `remove` edits are `insert`, `inject` edits are `skip`
//! 2. edits flagged as rework are `rework`
//! 3. non-rework edits whose activity occurs more than once in the history,
//!    while their `(kind, activity)` pair occurs exactly once, are `move`
//! 4. non-rework edits sharing a location where a later edit differs from the
//!    first in both kind and activity are `replace`

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{Edit, EditKind};
use crate::eventlog::ActivityIndex;

/// Anomaly pattern vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Insert,
    Skip,
    Rework,
    Move,
    Replace,
}

/// One labelled edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairPattern {
    pub pattern: PatternKind,
    /// Edit kind, carried by `move` and `replace` labels only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<EditKind>,
    pub loc: u32,
    pub activity: String,
}

/// Label every edit of a history, in history order.
pub fn classify(edits: &[Edit], index: &ActivityIndex) -> Vec<RepairPattern> {
    let mut activity_counts: HashMap<_, usize> = HashMap::new();
    let mut pair_counts: HashMap<_, usize> = HashMap::new();
    let mut by_loc: BTreeMap<u32, Vec<&Edit>> = BTreeMap::new();
    for edit in edits {
        *activity_counts.entry(edit.activity).or_insert(0) += 1;
        *pair_counts.entry((edit.kind, edit.activity)).or_insert(0) += 1;
        by_loc.entry(edit.loc).or_default().push(edit);
    }

    let replaced_locs: Vec<u32> = by_loc
        .iter()
        .filter(|(_, group)| {
            let first = group[0];
            group
                .iter()
                .skip(1)
                .any(|e| e.kind != first.kind && e.activity != first.activity)
        })
        .map(|(&loc, _)| loc)
        .collect();

    edits
        .iter()
        .map(|edit| {
            let mut pattern = match edit.kind {
                EditKind::Remove => PatternKind::Insert,
                EditKind::Inject => PatternKind::Skip,
            };
            if edit.rework {
                pattern = PatternKind::Rework;
            } else if replaced_locs.contains(&edit.loc) {
                pattern = PatternKind::Replace;
            } else if activity_counts[&edit.activity] > 1
                && pair_counts[&(edit.kind, edit.activity)] == 1
            {
                pattern = PatternKind::Move;
            }

            let action = matches!(pattern, PatternKind::Move | PatternKind::Replace)
                .then_some(edit.kind);
            RepairPattern {
                pattern,
                action,
                loc: edit.loc,
                activity: index.name(edit.activity).to_string(),
            }
        })
        .collect()
}

/// JSON array rendering; an empty list is `"[]"`.
pub fn serialize_patterns(patterns: &[RepairPattern]) -> String {
    serde_json::to_string(patterns).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_common::ActivityId;

    fn index() -> ActivityIndex {
        let mut index = ActivityIndex::new();
        for name in ["A", "B", "C", "D"] {
            index.intern_clean(name);
        }
        index
    }

    fn edit(kind: EditKind, loc: u32, activity: u32, rework: bool) -> Edit {
        Edit {
            kind,
            loc,
            activity: ActivityId(activity),
            rework,
        }
    }

    fn kinds(patterns: &[RepairPattern]) -> Vec<PatternKind> {
        patterns.iter().map(|p| p.pattern).collect()
    }

    #[test]
    fn test_single_remove_is_insert() {
        let patterns = classify(&[edit(EditKind::Remove, 3, 5, false)], &index());
        assert_eq!(
            patterns,
            vec![RepairPattern {
                pattern: PatternKind::Insert,
                action: None,
                loc: 3,
                activity: "D".to_string(),
            }]
        );
    }

    #[test]
    fn test_single_inject_is_skip() {
        let patterns = classify(&[edit(EditKind::Inject, 2, 3, false)], &index());
        assert_eq!(kinds(&patterns), vec![PatternKind::Skip]);
        assert_eq!(patterns[0].activity, "B");
    }

    #[test]
    fn test_rework_overrides_insert() {
        let patterns = classify(&[edit(EditKind::Remove, 2, 2, true)], &index());
        assert_eq!(kinds(&patterns), vec![PatternKind::Rework]);
    }

    #[test]
    fn test_move() {
        // B removed at 2 and injected at 4.
        let edits = [
            edit(EditKind::Remove, 2, 3, false),
            edit(EditKind::Inject, 4, 3, false),
        ];
        let patterns = classify(&edits, &index());
        assert_eq!(kinds(&patterns), vec![PatternKind::Move, PatternKind::Move]);
        assert_eq!(patterns[0].action, Some(EditKind::Remove));
        assert_eq!(patterns[1].action, Some(EditKind::Inject));
    }

    #[test]
    fn test_replace_at_shared_location() {
        // B injected at 2, then D removed at 2.
        let edits = [
            edit(EditKind::Inject, 2, 3, false),
            edit(EditKind::Remove, 2, 5, false),
        ];
        let patterns = classify(&edits, &index());
        assert_eq!(
            kinds(&patterns),
            vec![PatternKind::Replace, PatternKind::Replace]
        );
        assert_eq!(patterns[1].action, Some(EditKind::Remove));
        assert_eq!(patterns[1].activity, "D");
    }

    #[test]
    fn test_replace_does_not_override_rework() {
        let edits = [
            edit(EditKind::Inject, 2, 3, false),
            edit(EditKind::Remove, 2, 5, true),
        ];
        let patterns = classify(&edits, &index());
        assert_eq!(
            kinds(&patterns),
            vec![PatternKind::Replace, PatternKind::Rework]
        );
    }

    #[test]
    fn test_repeated_pair_is_not_move() {
        let edits = [
            edit(EditKind::Remove, 2, 3, false),
            edit(EditKind::Remove, 5, 3, false),
        ];
        let patterns = classify(&edits, &index());
        assert_eq!(kinds(&patterns), vec![PatternKind::Insert, PatternKind::Insert]);
    }

    #[test]
    fn test_serialization() {
        assert_eq!(serialize_patterns(&[]), "[]");
        let patterns = classify(&[edit(EditKind::Inject, 2, 3, false)], &index());
        assert_eq!(
            serialize_patterns(&patterns),
            r#"[{"pattern":"skip","loc":2,"activity":"B"}]"#
        );
    }
}
