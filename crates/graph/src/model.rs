use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entity node. `id` is globally unique within the document because it is
/// namespaced as `"{chunk_index}_{local_id}"`; the same real-world entity
/// mentioned in two chunks becomes two distinct nodes (no deduplication).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub chunk_index: usize,
}

/// Relationship edge. Both endpoints carry the namespace of the chunk that
/// produced the edge, so an edge can never reference a node from a different
/// chunk. That restriction is part of the contract, not an accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub document_id: String,
    pub num_chunks: usize,
    pub created_at: String,
}

/// Document-level knowledge graph. Built once at ingestion and immutable
/// afterward; re-ingestion overwrites rather than patches. The serialized
/// JSON form is the only channel between the ingestion and query paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub metadata: GraphMetadata,
}

impl KnowledgeGraph {
    pub fn empty(document_id: impl Into<String>) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            metadata: GraphMetadata {
                document_id: document_id.into(),
                num_chunks: 0,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Lookup index over the full node set, keyed by namespaced id.
    pub fn node_index(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// Serialize to the persisted wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from the persisted wire form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
