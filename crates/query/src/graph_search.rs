use extract::ChatCompletion;
use extract::llm::strip_code_fences;
use graph::{KnowledgeGraph, Node};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Prompt-size bound: only this many nodes and edges are shown to the model.
/// Larger graphs are partially visible to the query step; resolution still
/// runs against the full graph.
const PREVIEW_NODES: usize = 10;
const PREVIEW_EDGES: usize = 10;

pub const QUERY_SYSTEM_PROMPT: &str =
    "You are a knowledge graph query analyzer. Return only valid JSON.";

/// Failure while querying the graph. Structural problems (completion call,
/// malformed JSON) are fatal; referential problems (ids the model invented)
/// are tolerated and filtered in `resolve_nodes`.
#[derive(Debug, Error)]
pub enum GraphQueryError {
    #[error("completion request failed: {0}")]
    Completion(#[source] anyhow::Error),

    #[error("query response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One relevance-scored, explained bundle of resolved nodes. `confidence` is
/// passed through from the model unvalidated and unclamped; callers must
/// tolerate missing or out-of-range values.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQueryResult {
    pub nodes: Vec<Node>,
    pub explanation: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Deserialize)]
struct RawResults {
    results: Vec<RawResult>,
}

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    relevant_nodes: Vec<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Matches an assembled graph against a natural-language question via the
/// completion capability.
pub struct GraphQueryEngine<C> {
    llm: C,
}

impl<C: ChatCompletion> GraphQueryEngine<C> {
    pub fn new(llm: C) -> Self {
        Self { llm }
    }

    pub async fn query(
        &self,
        graph: &KnowledgeGraph,
        question: &str,
    ) -> Result<Vec<GraphQueryResult>, GraphQueryError> {
        // An empty graph holds no relevant information; skip the model call.
        if graph.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_query_prompt(graph, question)?;
        let response = self
            .llm
            .complete(QUERY_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(GraphQueryError::Completion)?;

        let raw: RawResults = serde_json::from_str(strip_code_fences(&response))?;

        let index = graph.node_index();
        let results = raw
            .results
            .into_iter()
            .map(|r| GraphQueryResult {
                nodes: resolve_nodes(&index, &r.relevant_nodes),
                explanation: r.explanation,
                confidence: r.confidence,
            })
            .collect();

        Ok(results)
    }
}

fn build_query_prompt(graph: &KnowledgeGraph, question: &str) -> serde_json::Result<String> {
    let nodes_preview =
        serde_json::to_string(&graph.nodes[..graph.nodes.len().min(PREVIEW_NODES)])?;
    let edges_preview =
        serde_json::to_string(&graph.edges[..graph.edges.len().min(PREVIEW_EDGES)])?;

    Ok(format!(
        r#"Given this knowledge graph:
Nodes: {}
Edges: {}

Answer this query: {}

Return the response in JSON format:
{{
    "results": [
        {{
            "relevant_nodes": ["node_ids"],
            "explanation": "explanation of relevance",
            "confidence": 0.95
        }},
        ...
    ]
}}"#,
        nodes_preview, edges_preview, question
    ))
}

/// Tolerance policy: node ids named by the model that do not exist in the
/// graph are silently dropped. The model only sees a preview and routinely
/// hallucinates ids; a referential miss must never fail the query.
fn resolve_nodes(index: &HashMap<&str, &Node>, ids: &[String]) -> Vec<Node> {
    let resolved: Vec<Node> = ids
        .iter()
        .filter_map(|id| index.get(id.as_str()).map(|&n| n.clone()))
        .collect();
    if resolved.len() < ids.len() {
        debug!(
            named = ids.len(),
            resolved = resolved.len(),
            "dropped unresolvable node ids"
        );
    }
    resolved
}
