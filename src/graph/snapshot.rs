//! Immutable point-in-time copies of the crawl graph

use crate::graph::types::{Directedness, Node};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A frozen copy of the accumulator's node and edge sets
///
/// Snapshots own their data, so they can be handed to a sink on another
/// thread while the live graph keeps growing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    directedness: Directedness,
    nodes: BTreeMap<String, Node>,
    edges: BTreeSet<(String, String)>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub(crate) fn new(
        directedness: Directedness,
        nodes: BTreeMap<String, Node>,
        edges: BTreeSet<(String, String)>,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            directedness,
            nodes,
            edges,
            taken_at,
        }
    }

    /// Rebuilds a snapshot from persisted parts
    ///
    /// Edge endpoints missing from `nodes` are added as dangling nodes so the
    /// closure invariant holds for data loaded from storage too.
    pub fn from_parts(
        directedness: Directedness,
        mut nodes: BTreeMap<String, Node>,
        edges: BTreeSet<(String, String)>,
        taken_at: DateTime<Utc>,
    ) -> Self {
        for (from, to) in &edges {
            for key in [from, to] {
                if !nodes.contains_key(key) {
                    nodes.insert(key.clone(), Node::referenced());
                }
            }
        }
        Self::new(directedness, nodes, edges, taken_at)
    }

    pub fn directedness(&self) -> Directedness {
        self.directedness
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&String, &String)> {
        self.edges.iter().map(|(a, b)| (a, b))
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn contains_node(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn contains_edge(&self, a: &str, b: &str) -> bool {
        let pair = if self.directedness == Directedness::Undirected && b < a {
            (b.to_string(), a.to_string())
        } else {
            (a.to_string(), b.to_string())
        };
        self.edges.contains(&pair)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Degree of every node; a self-loop counts twice
    pub fn degrees(&self) -> HashMap<&str, usize> {
        let mut degrees: HashMap<&str, usize> =
            self.nodes.keys().map(|k| (k.as_str(), 0)).collect();
        for (a, b) in &self.edges {
            *degrees.entry(a.as_str()).or_insert(0) += 1;
            *degrees.entry(b.as_str()).or_insert(0) += 1;
        }
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphAccumulator;

    #[test]
    fn test_from_parts_fills_missing_endpoints() {
        let mut edges = BTreeSet::new();
        edges.insert(("a".to_string(), "b".to_string()));

        let snapshot =
            Snapshot::from_parts(Directedness::Directed, BTreeMap::new(), edges, Utc::now());

        assert_eq!(snapshot.node_count(), 2);
        assert!(snapshot.node("a").unwrap().is_dangling());
    }

    #[test]
    fn test_degrees_count_both_endpoints() {
        let mut graph = GraphAccumulator::directed();
        graph.upsert_edge("c", "a");
        graph.upsert_edge("d", "a");
        graph.upsert_edge("a", "a");

        let snapshot = graph.snapshot();
        let degrees = snapshot.degrees();
        assert_eq!(degrees["a"], 4);
        assert_eq!(degrees["c"], 1);
        assert_eq!(degrees["d"], 1);
    }

    #[test]
    fn test_undirected_contains_edge_either_order() {
        let mut graph = GraphAccumulator::undirected();
        graph.upsert_edge("Ueno", "Akihabara");
        let snapshot = graph.snapshot();
        assert!(snapshot.contains_edge("Ueno", "Akihabara"));
        assert!(snapshot.contains_edge("Akihabara", "Ueno"));
    }
}
