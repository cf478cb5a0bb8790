use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::KnowledgeGraph;

/// Structural summary of a graph, for observability. Ordered maps keep the
/// serialized form deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub node_type_distribution: BTreeMap<String, usize>,
    pub edge_type_distribution: BTreeMap<String, usize>,
}

/// Pure, total over any well-formed graph including the empty one.
pub fn statistics(graph: &KnowledgeGraph) -> GraphStatistics {
    let mut node_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut edge_types: BTreeMap<String, usize> = BTreeMap::new();

    for node in &graph.nodes {
        *node_types.entry(node.node_type.clone()).or_insert(0) += 1;
    }
    for edge in &graph.edges {
        *edge_types.entry(edge.edge_type.clone()).or_insert(0) += 1;
    }

    GraphStatistics {
        total_nodes: graph.nodes.len(),
        total_edges: graph.edges.len(),
        node_type_distribution: node_types,
        edge_type_distribution: edge_types,
    }
}
