//! Anomaly detection matrix.
//!
//! Rows are positions of the case whose activity has a graph; columns are the
//! `n - 1` transitions of the case. A row for position `p` votes 1 on a
//! transition when the graph of `activity(p)` lacks the corresponding edge at
//! the levels implied by `p`, or holds it with likelihood at or below the
//! threshold.
//!
//! Each row then keeps only its nearest disagreement on either side of `p`:
//! the last 1 among transitions before `p` and the first 1 among transitions
//! from `p` onwards. A column scoring more than 1 is anomalous.

use serde::Serialize;
use tr_common::ActivityId;

use crate::eventlog::ActivityIndex;
use crate::nbg::{NbgSet, NodeKey};

/// Votes cast by one position of the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRow {
    pub position: usize,
    pub activity: ActivityId,
    pub votes: Vec<u8>,
}

/// Voting matrix for one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyMatrix {
    rows: Vec<VoteRow>,
    columns: usize,
}

impl AnomalyMatrix {
    pub fn rows(&self) -> &[VoteRow] {
        &self.rows
    }

    /// Number of transitions in the case.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn column_scores(&self) -> Vec<u32> {
        let mut scores = vec![0u32; self.columns];
        for row in &self.rows {
            for (score, &vote) in scores.iter_mut().zip(&row.votes) {
                *score += u32::from(vote);
            }
        }
        scores
    }

    /// Transition indices whose score exceeds 1, ascending.
    pub fn anomalous_columns(&self) -> Vec<usize> {
        self.column_scores()
            .into_iter()
            .enumerate()
            .filter(|&(_, score)| score > 1)
            .map(|(i, _)| i)
            .collect()
    }

    /// Total of all votes.
    pub fn vote_mass(&self) -> u64 {
        self.rows
            .iter()
            .flat_map(|r| &r.votes)
            .map(|&v| u64::from(v))
            .sum()
    }

    /// Vote mass over matrix size; 0 for an empty matrix.
    pub fn density(&self) -> f64 {
        let size = self.rows.len() * self.columns;
        if size == 0 {
            0.0
        } else {
            self.vote_mass() as f64 / size as f64
        }
    }

    /// Plain-text rendering: one line per voting position, `x` for a vote,
    /// `.` otherwise, followed by a score line.
    pub fn render(&self, index: &ActivityIndex) -> String {
        let width = self
            .rows
            .iter()
            .map(|r| index.name(r.activity).len())
            .max()
            .unwrap_or(0)
            .max("score".len());

        let mut out = String::new();
        for row in &self.rows {
            let cells: String = row
                .votes
                .iter()
                .map(|&v| if v == 1 { 'x' } else { '.' })
                .collect();
            out.push_str(&format!(
                "{:>3} {:<width$} {}\n",
                row.position,
                index.name(row.activity),
                cells
            ));
        }
        let scores: String = self
            .column_scores()
            .iter()
            .map(|&s| if s > 9 { '+' } else { char::from(b'0' + s as u8) })
            .collect();
        out.push_str(&format!("    {:<width$} {}\n", "score", scores));
        out
    }
}

/// Scores cases against a set of normal behavior graphs.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector<'a> {
    graphs: &'a NbgSet,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(graphs: &'a NbgSet) -> Self {
        Self { graphs }
    }

    pub fn graphs(&self) -> &'a NbgSet {
        self.graphs
    }

    /// Build the collapsed voting matrix for an activity sequence.
    ///
    /// Positions whose activity has no graph cast no row.
    pub fn matrix(&self, activities: &[ActivityId], alpha: f64) -> AnomalyMatrix {
        let columns = activities.len().saturating_sub(1);
        let mut rows = Vec::new();

        for (p, &activity) in activities.iter().enumerate() {
            let Some(graph) = self.graphs.get(activity) else {
                continue;
            };
            let centre = p as i32;
            let mut votes: Vec<u8> = activities
                .windows(2)
                .enumerate()
                .map(|(t, pair)| {
                    let from = NodeKey::new(pair[0], t as i32 - centre);
                    let to = NodeKey::new(pair[1], t as i32 + 1 - centre);
                    u8::from(!graph.is_expected(from, to, alpha))
                })
                .collect();
            keep_nearest_votes(&mut votes, p);
            rows.push(VoteRow {
                position: p,
                activity,
                votes,
            });
        }

        AnomalyMatrix { rows, columns }
    }

    /// Anomalous transition indices of a sequence.
    pub fn loc_anomalies(&self, activities: &[ActivityId], alpha: f64) -> Vec<usize> {
        self.matrix(activities, alpha).anomalous_columns()
    }
}

/// Clear every vote except the last 1 before `split` and the first 1 at or
/// after `split`.
fn keep_nearest_votes(votes: &mut [u8], split: usize) {
    let split = split.min(votes.len());
    let (past, post) = votes.split_at_mut(split);

    let last_past = past.iter().rposition(|&v| v == 1);
    past.iter_mut().for_each(|v| *v = 0);
    if let Some(i) = last_past {
        past[i] = 1;
    }

    let first_post = post.iter().position(|&v| v == 1);
    post.iter_mut().for_each(|v| *v = 0);
    if let Some(i) = first_post {
        post[i] = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::{CaseLog, EventRecord, LogKind};

    fn learn(rows: &[(&str, &str, i64)]) -> (NbgSet, ActivityIndex) {
        let records: Vec<EventRecord> = rows
            .iter()
            .map(|&(c, a, o)| EventRecord::ordered(c, a, o))
            .collect();
        let mut index = ActivityIndex::new();
        let log = CaseLog::from_records(&records, LogKind::Clean, &mut index, false).unwrap();
        (NbgSet::build(&log, &index), index)
    }

    fn seq(index: &mut ActivityIndex, names: &[&str]) -> Vec<ActivityId> {
        names
            .iter()
            .map(|n| index.get(n).unwrap_or_else(|| index.intern_unclean(n)))
            .collect()
    }

    #[test]
    fn test_keep_nearest_votes() {
        let mut votes = vec![1, 1, 0, 1, 1, 0, 1];
        keep_nearest_votes(&mut votes, 3);
        assert_eq!(votes, vec![0, 1, 0, 1, 0, 0, 0]);

        let mut votes = vec![1, 0, 1];
        keep_nearest_votes(&mut votes, 3);
        assert_eq!(votes, vec![0, 0, 1]);

        let mut votes = vec![0, 1, 1];
        keep_nearest_votes(&mut votes, 0);
        assert_eq!(votes, vec![0, 1, 0]);
    }

    #[test]
    fn test_clean_case_has_no_anomalies() {
        let (graphs, mut index) = learn(&[("c1", "A", 1), ("c1", "B", 2)]);
        let detector = AnomalyDetector::new(&graphs);
        let case = seq(&mut index, &["Start", "A", "B", "End"]);
        let matrix = detector.matrix(&case, 0.0);
        assert_eq!(matrix.rows().len(), 4);
        assert_eq!(matrix.vote_mass(), 0);
        assert!(matrix.anomalous_columns().is_empty());
        assert_eq!(matrix.density(), 0.0);
    }

    #[test]
    fn test_foreign_activity_flags_its_transition() {
        let (graphs, mut index) = learn(&[
            ("c1", "A", 1),
            ("c1", "B", 2),
            ("c2", "A", 1),
            ("c2", "C", 2),
        ]);
        let detector = AnomalyDetector::new(&graphs);
        let case = seq(&mut index, &["Start", "A", "D", "End"]);

        let matrix = detector.matrix(&case, 0.0);
        // D has no graph, so only Start, A and End vote.
        assert_eq!(matrix.rows().len(), 3);
        assert_eq!(matrix.column_scores(), vec![0, 2, 1]);
        assert_eq!(detector.loc_anomalies(&case, 0.0), vec![1]);
    }

    #[test]
    fn test_density_counts_collapsed_votes() {
        let (graphs, mut index) = learn(&[
            ("c1", "A", 1),
            ("c1", "B", 2),
            ("c2", "A", 1),
            ("c2", "C", 2),
        ]);
        let detector = AnomalyDetector::new(&graphs);
        let case = seq(&mut index, &["Start", "A", "B", "C", "End"]);

        let matrix = detector.matrix(&case, 0.0);
        // Every position votes once, on B -> C.
        assert_eq!(matrix.rows().len(), 5);
        assert_eq!(matrix.columns(), 4);
        assert_eq!(matrix.column_scores(), vec![0, 0, 5, 0]);
        assert_eq!(matrix.vote_mass(), 5);
        assert_eq!(matrix.density(), 0.25);
    }

    #[test]
    fn test_missing_activity_is_detected() {
        let (graphs, mut index) = learn(&[("c1", "A", 1), ("c1", "B", 2), ("c1", "C", 3)]);
        let detector = AnomalyDetector::new(&graphs);
        let case = seq(&mut index, &["Start", "A", "C", "End"]);
        assert_eq!(detector.loc_anomalies(&case, 0.0), vec![1]);
    }

    #[test]
    fn test_threshold_rejects_rare_edges() {
        let (graphs, mut index) = learn(&[
            ("c1", "A", 1),
            ("c1", "B", 2),
            ("c2", "A", 1),
            ("c2", "B", 2),
            ("c3", "A", 1),
            ("c3", "B", 2),
            ("c4", "A", 1),
            ("c4", "C", 2),
        ]);
        let detector = AnomalyDetector::new(&graphs);
        let rare = seq(&mut index, &["Start", "A", "C", "End"]);
        assert!(detector.loc_anomalies(&rare, 0.0).is_empty());
        assert!(!detector.loc_anomalies(&rare, 0.5).is_empty());
    }

    #[test]
    fn test_empty_matrix_density() {
        let graphs = NbgSet::default();
        let detector = AnomalyDetector::new(&graphs);
        let matrix = detector.matrix(&[ActivityId::START, ActivityId::END], 0.0);
        assert!(matrix.rows().is_empty());
        assert_eq!(matrix.density(), 0.0);
    }

    #[test]
    fn test_render() {
        let (graphs, mut index) = learn(&[("c1", "A", 1), ("c1", "B", 2)]);
        let detector = AnomalyDetector::new(&graphs);
        let case = seq(&mut index, &["Start", "B", "A", "End"]);
        let text = detector.matrix(&case, 0.0).render(&index);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Start"));
        assert!(lines[4].contains("score"));
        assert!(text.contains('x'));
    }
}
