//! Normal behavior graphs.
//!
//! One graph per clean activity `a`. Every clean variant containing `a` is
//! re-indexed so that an occurrence of `a` sits at level 0; each consecutive
//! pair of events becomes an edge between `(activity, level)` nodes, weighted
//! by the number of clean cases following that variant.
//!
//! The first occurrence centres the variant itself. Every later occurrence
//! centres one extra copy of the variant with the same case count, so a
//! repeated activity contributes one sub-variant per repetition.
//!
//! Likelihoods are normalized against the side of the edge nearer to level 0:
//! for a source at level >= 0 the edge count is divided by the total count
//! leaving the source; for a source at a negative level it is divided by the
//! total count entering the target.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tr_common::ActivityId;

use crate::eventlog::{ActivityIndex, CaseLog};

/// A graph node: an activity at a level relative to the centre activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeKey {
    pub activity: ActivityId,
    pub level: i32,
}

impl NodeKey {
    pub fn new(activity: ActivityId, level: i32) -> Self {
        Self { activity, level }
    }
}

/// Directed weighted edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub to: NodeKey,
    /// Clean cases supporting this transition at these levels.
    pub count: u64,
    pub likelihood: f64,
}

/// Normal behavior graph centred on one activity.
#[derive(Debug, Clone)]
pub struct NormalBehaviorGraph {
    activity: ActivityId,
    nodes: BTreeSet<NodeKey>,
    adjacency: BTreeMap<NodeKey, Vec<Edge>>,
}

impl NormalBehaviorGraph {
    /// The centre activity.
    pub fn activity(&self) -> ActivityId {
        self.activity
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, node: &NodeKey) -> bool {
        self.nodes.contains(node)
    }

    pub fn edge(&self, from: NodeKey, to: NodeKey) -> Option<&Edge> {
        self.adjacency.get(&from)?.iter().find(|e| e.to == to)
    }

    pub fn likelihood(&self, from: NodeKey, to: NodeKey) -> Option<f64> {
        self.edge(from, to).map(|e| e.likelihood)
    }

    /// Whether `from -> to` exists with likelihood strictly above `alpha`.
    pub fn is_expected(&self, from: NodeKey, to: NodeKey, alpha: f64) -> bool {
        self.likelihood(from, to).is_some_and(|l| l > alpha)
    }

    pub fn outgoing(&self, from: NodeKey) -> &[Edge] {
        self.adjacency.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, to: NodeKey) -> impl Iterator<Item = (NodeKey, &Edge)> + '_ {
        self.edges().filter(move |(_, e)| e.to == to)
    }

    /// Every edge with its source node.
    pub fn edges(&self) -> impl Iterator<Item = (NodeKey, &Edge)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(&from, edges)| edges.iter().map(move |e| (from, e)))
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Render edges as `from@level -> to@level  likelihood (count)` lines.
    pub fn describe(&self, index: &ActivityIndex) -> String {
        let mut out = format!("NBG[{}]\n", index.name(self.activity));
        for (from, edge) in self.edges() {
            out.push_str(&format!(
                "  {}@{} -> {}@{}  {:.3} ({})\n",
                index.name(from.activity),
                from.level,
                index.name(edge.to.activity),
                edge.to.level,
                edge.likelihood,
                edge.count
            ));
        }
        out
    }
}

/// The graphs for every clean activity, boundary markers included.
#[derive(Debug, Clone, Default)]
pub struct NbgSet {
    graphs: HashMap<ActivityId, NormalBehaviorGraph>,
}

impl NbgSet {
    /// Build one graph per clean activity of `index` from the clean log.
    pub fn build(log: &CaseLog, index: &ActivityIndex) -> Self {
        let variants: Vec<(Vec<ActivityId>, u64)> = log
            .variants()
            .into_iter()
            .map(|g| (g.activities, g.case_ids.len() as u64))
            .collect();

        let graphs = index
            .clean_ids()
            .map(|activity| (activity, build_graph(activity, &variants)))
            .collect();

        Self { graphs }
    }

    pub fn get(&self, activity: ActivityId) -> Option<&NormalBehaviorGraph> {
        self.graphs.get(&activity)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalBehaviorGraph> {
        self.graphs.values()
    }

    pub fn edge_count(&self) -> usize {
        self.graphs.values().map(NormalBehaviorGraph::edge_count).sum()
    }
}

/// Build the graph centred on `activity` from `(sequence, case count)` pairs.
pub fn build_graph(activity: ActivityId, variants: &[(Vec<ActivityId>, u64)]) -> NormalBehaviorGraph {
    let mut counts: BTreeMap<(NodeKey, NodeKey), u64> = BTreeMap::new();
    let mut nodes = BTreeSet::new();

    for (sequence, count) in variants {
        let centres = sequence
            .iter()
            .enumerate()
            .filter(|(_, &a)| a == activity)
            .map(|(i, _)| i as i32);

        for centre in centres {
            for (t, &a) in sequence.iter().enumerate() {
                nodes.insert(NodeKey::new(a, t as i32 - centre));
            }
            for (t, pair) in sequence.windows(2).enumerate() {
                // End never leads anywhere.
                if pair[0] == ActivityId::END {
                    continue;
                }
                let from = NodeKey::new(pair[0], t as i32 - centre);
                let to = NodeKey::new(pair[1], t as i32 + 1 - centre);
                *counts.entry((from, to)).or_insert(0) += count;
            }
        }
    }

    let mut out_totals: HashMap<NodeKey, u64> = HashMap::new();
    let mut in_totals: HashMap<NodeKey, u64> = HashMap::new();
    for (&(from, to), &count) in &counts {
        *out_totals.entry(from).or_insert(0) += count;
        *in_totals.entry(to).or_insert(0) += count;
    }

    let mut adjacency: BTreeMap<NodeKey, Vec<Edge>> = BTreeMap::new();
    for ((from, to), count) in counts {
        let total = if from.level >= 0 {
            out_totals.get(&from)
        } else {
            in_totals.get(&to)
        };
        let likelihood = match total {
            Some(&t) if t > 0 => count as f64 / t as f64,
            _ => 0.0,
        };
        adjacency.entry(from).or_default().push(Edge {
            to,
            count,
            likelihood,
        });
    }

    NormalBehaviorGraph {
        activity,
        nodes,
        adjacency,
    }
}
