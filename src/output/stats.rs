//! Degree statistics of a stored graph
//!
//! This module computes the degree distribution of a snapshot and prints it.
//! It only reads snapshots; nothing here touches a live crawl.

use crate::graph::{Directedness, Snapshot};
use std::collections::BTreeMap;

/// Degree statistics of one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeStatistics {
    pub directedness: Directedness,

    /// Total number of nodes
    pub nodes: usize,

    /// Total number of edges
    pub edges: usize,

    /// Nodes known only as edge endpoints
    pub dangling: usize,

    /// Degree to number of nodes with that degree
    pub distribution: BTreeMap<usize, usize>,

    /// The statistics below are `None` for an empty graph
    pub average: Option<f64>,
    pub max: Option<usize>,
    pub min: Option<usize>,

    /// Population variance of the degrees
    pub variance: Option<f64>,
}

/// Computes degree statistics
///
/// For a directed graph a node's degree is in-degree plus out-degree. A
/// self-loop adds two.
pub fn degree_statistics(snapshot: &Snapshot) -> DegreeStatistics {
    let degrees: Vec<usize> = snapshot.degrees().into_values().collect();

    let mut distribution = BTreeMap::new();
    for degree in &degrees {
        *distribution.entry(*degree).or_insert(0) += 1;
    }

    let (average, variance) = if degrees.is_empty() {
        (None, None)
    } else {
        let n = degrees.len() as f64;
        let mean = degrees.iter().sum::<usize>() as f64 / n;
        let variance = degrees
            .iter()
            .map(|d| {
                let diff = *d as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        (Some(mean), Some(variance))
    };

    DegreeStatistics {
        directedness: snapshot.directedness(),
        nodes: snapshot.node_count(),
        edges: snapshot.edge_count(),
        dangling: snapshot.nodes().filter(|(_, n)| n.is_dangling()).count(),
        distribution,
        average,
        max: degrees.iter().copied().max(),
        min: degrees.iter().copied().min(),
        variance,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `name` - Name of the snapshot the statistics came from
/// * `stats` - The statistics to display
pub fn print_statistics(name: &str, stats: &DegreeStatistics) {
    println!("=== Degree Statistics: {} ===\n", name);

    println!("Overview:");
    println!("  Graph: {}", stats.directedness);
    println!("  Nodes: {}", stats.nodes);
    println!("  Edges: {}", stats.edges);
    println!("  Dangling nodes: {}", stats.dangling);
    println!();

    if stats.distribution.is_empty() {
        println!("The graph is empty.");
        return;
    }

    println!("Degree Distribution:");
    for (degree, count) in &stats.distribution {
        let percentage = (*count as f64 / stats.nodes.max(1) as f64) * 100.0;
        println!("  {:>5}: {} ({:.1}%)", degree, count, percentage);
    }
    println!();

    if let (Some(average), Some(max), Some(min), Some(variance)) =
        (stats.average, stats.max, stats.min, stats.variance)
    {
        println!("Summary:");
        println!("  Average degree: {:.4}", average);
        println!("  Maximum degree: {}", max);
        println!("  Minimum degree: {}", min);
        println!("  Degree variance: {:.4}", variance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphAccumulator;

    #[test]
    fn test_star_graph_statistics() {
        let mut graph = GraphAccumulator::directed();
        graph.upsert_edge("b", "a");
        graph.upsert_edge("c", "a");
        graph.upsert_edge("d", "a");

        let stats = degree_statistics(&graph.snapshot());

        assert_eq!(stats.nodes, 4);
        assert_eq!(stats.edges, 3);
        assert_eq!(stats.dangling, 4);
        assert_eq!(stats.distribution.get(&1), Some(&3));
        assert_eq!(stats.distribution.get(&3), Some(&1));
        assert_eq!(stats.max, Some(3));
        assert_eq!(stats.min, Some(1));
        assert!((stats.average.unwrap() - 1.5).abs() < 1e-9);
        // degrees 3,1,1,1: mean 1.5, squared deviations 2.25 + 3 * 0.25
        assert!((stats.variance.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_isolated_node_has_degree_zero() {
        let mut graph = GraphAccumulator::undirected();
        graph.upsert_node("lonely", crate::graph::NodeMetadata::empty());
        graph.upsert_edge("Ueno", "Akihabara");

        let stats = degree_statistics(&graph.snapshot());

        assert_eq!(stats.distribution.get(&0), Some(&1));
        assert_eq!(stats.min, Some(0));
        assert_eq!(stats.dangling, 2);
    }

    #[test]
    fn test_empty_graph_has_no_summary() {
        let stats = degree_statistics(&GraphAccumulator::directed().snapshot());
        assert_eq!(stats.nodes, 0);
        assert!(stats.distribution.is_empty());
        assert_eq!(stats.average, None);
        assert_eq!(stats.max, None);
    }
}
