use dashmap::DashMap;
use graph::KnowledgeGraph;
use std::sync::Arc;

/// Parsed-graph cache keyed by document id, filled on upload and on first
/// answer. Re-upload overwrites the entry, matching the store's overwrite
/// semantics.
pub struct GraphCache {
    graphs: DashMap<String, Arc<KnowledgeGraph>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self {
            graphs: DashMap::new(),
        }
    }

    pub fn insert(&self, document_id: &str, graph: KnowledgeGraph) -> Arc<KnowledgeGraph> {
        let graph = Arc::new(graph);
        self.graphs.insert(document_id.to_string(), graph.clone());
        graph
    }

    pub fn get(&self, document_id: &str) -> Option<Arc<KnowledgeGraph>> {
        self.graphs.get(document_id).map(|r| r.value().clone())
    }
}
