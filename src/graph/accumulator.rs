//! The live, mutable crawl graph
//!
//! `GraphAccumulator` is the only type that mutates graph state. Upserts are
//! idempotent and every edge endpoint is tracked as a node, so the structure
//! never holds an edge that points outside its node set.

use crate::graph::snapshot::Snapshot;
use crate::graph::types::{Directedness, Node, NodeMetadata, NodeOrigin};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Accumulates nodes and edges discovered during a crawl
#[derive(Debug, Clone)]
pub struct GraphAccumulator {
    directedness: Directedness,
    nodes: BTreeMap<String, Node>,
    edges: BTreeSet<(String, String)>,
}

impl GraphAccumulator {
    /// Creates an empty accumulator
    pub fn new(directedness: Directedness) -> Self {
        Self {
            directedness,
            nodes: BTreeMap::new(),
            edges: BTreeSet::new(),
        }
    }

    /// Creates an empty directed accumulator (citer → cited)
    pub fn directed() -> Self {
        Self::new(Directedness::Directed)
    }

    /// Creates an empty undirected accumulator (adjacency)
    pub fn undirected() -> Self {
        Self::new(Directedness::Undirected)
    }

    pub fn directedness(&self) -> Directedness {
        self.directedness
    }

    /// Inserts a node if absent
    ///
    /// Metadata is first-write-wins: a node that was already inserted keeps
    /// its original metadata. A dangling node, created implicitly by an edge,
    /// carries no metadata of its own, so the first explicit upsert fills it
    /// in and the node becomes discovered.
    ///
    /// # Returns
    ///
    /// `true` if the node was created or promoted from dangling
    pub fn upsert_node(&mut self, key: &str, metadata: NodeMetadata) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) if node.origin == NodeOrigin::Referenced => {
                *node = Node::discovered(metadata);
                true
            }
            Some(_) => false,
            None => {
                self.nodes.insert(key.to_string(), Node::discovered(metadata));
                true
            }
        }
    }

    /// Inserts an edge if absent, creating missing endpoints as dangling nodes
    ///
    /// For an undirected graph `(a, b)` and `(b, a)` are the same edge.
    ///
    /// # Returns
    ///
    /// `true` if the edge was not present before
    pub fn upsert_edge(&mut self, a: &str, b: &str) -> bool {
        self.ensure_node(a);
        self.ensure_node(b);
        self.edges.insert(self.edge_key(a, b))
    }

    /// Returns an immutable copy of the current graph stamped with `Utc::now()`
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_at(Utc::now())
    }

    /// Returns an immutable copy of the current graph stamped with `taken_at`
    pub fn snapshot_at(&self, taken_at: DateTime<Utc>) -> Snapshot {
        Snapshot::new(
            self.directedness,
            self.nodes.clone(),
            self.edges.clone(),
            taken_at,
        )
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn contains_node(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn contains_edge(&self, a: &str, b: &str) -> bool {
        self.edges.contains(&self.edge_key(a, b))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of nodes known only through edges
    pub fn dangling_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_dangling()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn ensure_node(&mut self, key: &str) {
        if !self.nodes.contains_key(key) {
            self.nodes.insert(key.to_string(), Node::referenced());
        }
    }

    fn edge_key(&self, a: &str, b: &str) -> (String, String) {
        if self.directedness == Directedness::Undirected && b < a {
            (b.to_string(), a.to_string())
        } else {
            (a.to_string(), b.to_string())
        }
    }
}

impl Default for GraphAccumulator {
    fn default() -> Self {
        Self::directed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: &str) -> NodeMetadata {
        NodeMetadata {
            title: Some(title.to_string()),
            contributors: vec![],
        }
    }

    #[test]
    fn test_upsert_node_first_write_wins() {
        let mut graph = GraphAccumulator::directed();
        assert!(graph.upsert_node("10.1/a", meta("first")));
        assert!(!graph.upsert_node("10.1/a", meta("second")));

        assert_eq!(graph.node_count(), 1);
        assert_eq!(
            graph.node("10.1/a").unwrap().metadata.title.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_upsert_edge_idempotent() {
        let mut graph = GraphAccumulator::directed();
        assert!(graph.upsert_edge("10.1/c", "10.1/a"));
        assert!(!graph.upsert_edge("10.1/c", "10.1/a"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_directed_edges_are_ordered() {
        let mut graph = GraphAccumulator::directed();
        graph.upsert_edge("a", "b");
        graph.upsert_edge("b", "a");
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_edge("a", "b"));
        assert!(graph.contains_edge("b", "a"));
    }

    #[test]
    fn test_undirected_edges_are_unordered() {
        let mut graph = GraphAccumulator::undirected();
        assert!(graph.upsert_edge("Tokyo", "Kanda"));
        assert!(!graph.upsert_edge("Kanda", "Tokyo"));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains_edge("Tokyo", "Kanda"));
        assert!(graph.contains_edge("Kanda", "Tokyo"));
    }

    #[test]
    fn test_edge_creates_dangling_endpoints() {
        let mut graph = GraphAccumulator::directed();
        graph.upsert_node("10.1/a", meta("A"));
        graph.upsert_edge("10.1/c", "10.1/a");

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.dangling_count(), 1);
        let dangling = graph.node("10.1/c").unwrap();
        assert!(dangling.is_dangling());
        assert!(dangling.metadata.is_empty());
    }

    #[test]
    fn test_dangling_node_is_filled_by_first_explicit_upsert() {
        let mut graph = GraphAccumulator::directed();
        graph.upsert_edge("10.1/c", "10.1/a");

        assert!(graph.upsert_node("10.1/c", meta("C")));
        assert!(!graph.upsert_node("10.1/c", meta("C again")));

        let node = graph.node("10.1/c").unwrap();
        assert_eq!(node.origin, NodeOrigin::Discovered);
        assert_eq!(node.metadata.title.as_deref(), Some("C"));
        assert_eq!(graph.dangling_count(), 1);
    }

    #[test]
    fn test_every_edge_endpoint_is_a_node() {
        let mut graph = GraphAccumulator::directed();
        let ops = [("a", "b"), ("b", "c"), ("d", "a"), ("a", "b"), ("e", "e")];
        for (i, (from, to)) in ops.iter().enumerate() {
            if i % 2 == 0 {
                graph.upsert_node(from, meta(from));
            }
            graph.upsert_edge(from, to);
        }

        let snapshot = graph.snapshot();
        for (from, to) in snapshot.edges() {
            assert!(snapshot.contains_node(from), "missing endpoint {}", from);
            assert!(snapshot.contains_node(to), "missing endpoint {}", to);
        }
    }

    #[test]
    fn test_snapshot_unaffected_by_later_upserts() {
        let mut graph = GraphAccumulator::directed();
        graph.upsert_node("a", meta("A"));
        graph.upsert_edge("b", "a");

        let snapshot = graph.snapshot();
        graph.upsert_node("x", meta("X"));
        graph.upsert_edge("y", "x");

        assert_eq!(snapshot.node_count(), 2);
        assert_eq!(snapshot.edge_count(), 1);
        assert!(!snapshot.contains_node("x"));
        assert_eq!(graph.node_count(), 4);
    }
}
