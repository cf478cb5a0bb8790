use std::collections::HashMap;

use extract::{ChatCompletion, ExtractionError, Extractor};
use ingest::Chunk;
use thiserror::Error;
use tracing::debug;

use crate::model::{Edge, GraphMetadata, KnowledgeGraph, Node};

/// Failure while building a document graph. A single chunk's extraction
/// failure aborts the whole assembly; there is no partial-graph result.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("extraction failed for chunk {index}: {source}")]
    Chunk {
        index: usize,
        source: ExtractionError,
    },
}

/// Merges per-chunk extraction fragments into one document-level graph with
/// globally unique, chunk-namespaced node ids.
pub struct GraphAssembler<C> {
    extractor: Extractor<C>,
}

impl<C: ChatCompletion> GraphAssembler<C> {
    pub fn new(llm: C) -> Self {
        Self {
            extractor: Extractor::new(llm),
        }
    }

    /// Assemble the knowledge graph for one document. Chunks are processed
    /// sequentially in order; every local entity id and relation endpoint is
    /// namespaced as `"{chunk_index}_{local_id}"`. Because edge endpoints get
    /// the namespace of the edge's own chunk, cross-chunk edges are
    /// structurally impossible (preserved limitation, pending product
    /// clarification).
    pub async fn assemble(
        &self,
        document_id: &str,
        chunks: &[Chunk],
    ) -> Result<KnowledgeGraph, AssemblyError> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut slot_by_id: HashMap<String, usize> = HashMap::new();
        let mut edges: Vec<Edge> = Vec::new();

        for chunk in chunks {
            let extraction =
                self.extractor
                    .extract(&chunk.text)
                    .await
                    .map_err(|source| AssemblyError::Chunk {
                        index: chunk.index,
                        source,
                    })?;

            debug!(
                document_id,
                chunk_index = chunk.index,
                entities = extraction.entities.len(),
                relationships = extraction.relationships.len(),
                "chunk extracted"
            );

            for entity in extraction.entities {
                let id = format!("{}_{}", chunk.index, entity.id);
                let node = Node {
                    id: id.clone(),
                    name: entity.name,
                    node_type: entity.entity_type,
                    chunk_index: chunk.index,
                };
                // Collisions cannot happen under correct namespacing, but if
                // one does, last write wins in place.
                match slot_by_id.get(&id) {
                    Some(&slot) => nodes[slot] = node,
                    None => {
                        slot_by_id.insert(id, nodes.len());
                        nodes.push(node);
                    }
                }
            }

            for rel in extraction.relationships {
                edges.push(Edge {
                    source: format!("{}_{}", chunk.index, rel.source),
                    target: format!("{}_{}", chunk.index, rel.target),
                    edge_type: rel.relationship_type,
                });
            }
        }

        Ok(KnowledgeGraph {
            nodes,
            edges,
            metadata: GraphMetadata {
                document_id: document_id.to_string(),
                num_chunks: chunks.len(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays one canned reply per call, in order.
    struct ScriptedCompletion {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        fn new(replies: &[&str]) -> Self {
            let mut replies: Vec<String> = replies.iter().map(|s| s.to_string()).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
        }
    }

    fn chunks(document_id: &str, texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(document_id, i, *t))
            .collect()
    }

    #[tokio::test]
    async fn namespaces_ids_across_chunks() {
        let llm = ScriptedCompletion::new(&[
            r#"{"entities": [{"id": "1", "name": "Alice", "type": "Person"}], "relationships": []}"#,
            r#"{"entities": [{"id": "1", "name": "Bob", "type": "Person"}], "relationships": []}"#,
        ]);
        let assembler = GraphAssembler::new(llm);

        let graph = assembler
            .assemble("doc-1", &chunks("doc-1", &["about alice", "about bob"]))
            .await
            .unwrap();

        // Both chunks emitted local id "1"; namespacing keeps them distinct.
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "0_1");
        assert_eq!(graph.nodes[1].id, "1_1");
        assert_eq!(graph.nodes[1].chunk_index, 1);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.metadata.document_id, "doc-1");
        assert_eq!(graph.metadata.num_chunks, 2);
    }

    #[tokio::test]
    async fn edges_stay_within_their_chunk_namespace() {
        let llm = ScriptedCompletion::new(&[
            r#"{"entities": [{"id": "1", "name": "Alice", "type": "Person"},
                             {"id": "2", "name": "Acme", "type": "Org"}],
                "relationships": [{"source": "1", "target": "2", "type": "founded"}]}"#,
            r#"{"entities": [{"id": "1", "name": "Bob", "type": "Person"}],
                "relationships": [{"source": "1", "target": "1", "type": "mentions"}]}"#,
        ]);
        let assembler = GraphAssembler::new(llm);

        let graph = assembler
            .assemble("doc-1", &chunks("doc-1", &["a", "b"]))
            .await
            .unwrap();

        let index = graph.node_index();
        for edge in &graph.edges {
            // Every endpoint that resolves must come from the edge's own
            // chunk; the prefix encodes that.
            let prefix = edge.source.split('_').next().unwrap();
            assert_eq!(edge.target.split('_').next().unwrap(), prefix);
            if let Some(node) = index.get(edge.source.as_str()) {
                assert_eq!(node.chunk_index.to_string(), prefix);
            }
        }
        assert_eq!(graph.edges[0].source, "0_1");
        assert_eq!(graph.edges[0].target, "0_2");
        assert_eq!(graph.edges[1].source, "1_1");
    }

    #[tokio::test]
    async fn duplicate_local_ids_last_write_wins() {
        let llm = ScriptedCompletion::new(&[
            r#"{"entities": [{"id": "1", "name": "First", "type": "Concept"},
                             {"id": "1", "name": "Second", "type": "Concept"}],
                "relationships": []}"#,
        ]);
        let assembler = GraphAssembler::new(llm);

        let graph = assembler
            .assemble("doc-1", &chunks("doc-1", &["a"]))
            .await
            .unwrap();

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].name, "Second");
    }

    #[tokio::test]
    async fn any_chunk_failure_aborts_the_assembly() {
        let llm = ScriptedCompletion::new(&[
            r#"{"entities": [{"id": "1", "name": "Alice", "type": "Person"}], "relationships": []}"#,
            "this is not json",
        ]);
        let assembler = GraphAssembler::new(llm);

        let err = assembler
            .assemble("doc-1", &chunks("doc-1", &["a", "b"]))
            .await
            .unwrap_err();

        let AssemblyError::Chunk { index, source } = err;
        assert_eq!(index, 1);
        assert!(matches!(source, ExtractionError::Json(_)));
    }

    #[tokio::test]
    async fn assembled_graph_feeds_statistics_and_round_trips() {
        let llm = ScriptedCompletion::new(&[
            r#"{"entities": [{"id": "1", "name": "Alice", "type": "Person"}], "relationships": []}"#,
            r#"{"entities": [{"id": "1", "name": "Bob", "type": "Person"}], "relationships": []}"#,
        ]);
        let assembler = GraphAssembler::new(llm);

        let graph = assembler
            .assemble("doc-1", &chunks("doc-1", &["a", "b"]))
            .await
            .unwrap();

        let stats = crate::stats::statistics(&graph);
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.total_edges, 0);
        assert_eq!(stats.node_type_distribution["Person"], 2);

        let restored = KnowledgeGraph::from_json(&graph.to_json().unwrap()).unwrap();
        assert_eq!(restored, graph);
    }

    #[tokio::test]
    async fn node_ids_match_namespace_pattern() {
        let llm = ScriptedCompletion::new(&[
            r#"{"entities": [{"id": "7", "name": "X", "type": "Concept"},
                             {"id": "8", "name": "Y", "type": "Concept"}],
                "relationships": []}"#,
            r#"{"entities": [{"id": "7", "name": "Z", "type": "Concept"}], "relationships": []}"#,
        ]);
        let assembler = GraphAssembler::new(llm);
        let chunk_list = chunks("doc-1", &["a", "b"]);

        let graph = assembler.assemble("doc-1", &chunk_list).await.unwrap();

        let mut seen = std::collections::HashSet::new();
        for node in &graph.nodes {
            assert!(seen.insert(node.id.clone()), "duplicate node id");
            let (prefix, _local) = node.id.split_once('_').unwrap();
            let i: usize = prefix.parse().unwrap();
            assert!(i < chunk_list.len());
            assert_eq!(i, node.chunk_index);
        }
    }
}
