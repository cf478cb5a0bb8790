use anyhow::Result;
use async_trait::async_trait;
use extract::ChatCompletion;
use graph::KnowledgeGraph;
use thiserror::Error;
use tracing::warn;

use crate::graph_search::{GraphQueryEngine, GraphQueryError, GraphQueryResult};

pub const ANSWER_SYSTEM_PROMPT: &str = "You are a knowledgeable educational assistant that \
     provides accurate, well-structured answers based on provided information.";

const EMPTY_GRAPH_CONTEXT: &str = "No knowledge graph information available.";
const NO_GRAPH_RESULTS: &str = "No relevant information found in the knowledge graph.";

const APOLOGY: &str = "I apologize, but I cannot provide a complete answer based on the \
     available information in the document and knowledge graph.";

/// Hedging phrases that mean the model could not really answer. Any reply
/// containing one is replaced wholesale by the canonical apology.
const INSUFFICIENT_INFO_MARKERS: &[&str] = &[
    "cannot answer",
    "don't have enough information",
    "insufficient information",
    "cannot determine",
    "not enough context",
];

/// Vector-search collaborator: ranked chunk texts for a question, scoped to
/// one document.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn similar_texts(
        &self,
        document_id: &str,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<String>>;
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] anyhow::Error),

    #[error("graph query failed: {0}")]
    GraphQuery(#[from] GraphQueryError),

    #[error("completion request failed: {0}")]
    Completion(#[source] anyhow::Error),
}

/// Fuses vector-retrieved passages with graph query results into one grounded
/// prompt and post-validates the model's reply.
pub struct AnswerSynthesizer<A, Q, R> {
    llm: A,
    engine: GraphQueryEngine<Q>,
    retriever: R,
    top_n: usize,
}

impl<A: ChatCompletion, Q: ChatCompletion, R: Retriever> AnswerSynthesizer<A, Q, R> {
    /// `answer_llm` generates the final answer; `query_llm` drives the graph
    /// query engine (deterministic sampling).
    pub fn new(answer_llm: A, query_llm: Q, retriever: R) -> Self {
        Self {
            llm: answer_llm,
            engine: GraphQueryEngine::new(query_llm),
            retriever,
            top_n: 5,
        }
    }

    /// Generate an answer. This entry point never fails: any synthesis error
    /// is rendered into the returned string, which is the sole success or
    /// failure signal for callers.
    pub async fn answer(
        &self,
        document_id: &str,
        graph: &KnowledgeGraph,
        question: &str,
    ) -> String {
        match self.synthesize(document_id, graph, question).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(document_id, error = %e, "answer synthesis failed");
                format!("An error occurred while generating the answer: {}", e)
            }
        }
    }

    /// Structured-error core of `answer`.
    pub async fn synthesize(
        &self,
        document_id: &str,
        graph: &KnowledgeGraph,
        question: &str,
    ) -> Result<String, SynthesisError> {
        let texts = self
            .retriever
            .similar_texts(document_id, question, self.top_n)
            .await
            .map_err(SynthesisError::Retrieval)?;
        let context = texts.join("\n");

        let graph_context = if graph.is_empty() {
            EMPTY_GRAPH_CONTEXT.to_string()
        } else {
            let results = self.engine.query(graph, question).await?;
            format_graph_results(&results)
        };

        let prompt = build_answer_prompt(&context, &graph_context, question);
        let response = self
            .llm
            .complete(ANSWER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(SynthesisError::Completion)?;

        Ok(normalize_hedging(response.trim()))
    }
}

/// Render graph query results into the deterministic text block embedded in
/// the answer prompt: one Related Entities / Context / Confidence line group
/// per result, each line only when its field is present.
pub fn format_graph_results(results: &[GraphQueryResult]) -> String {
    if results.is_empty() {
        return NO_GRAPH_RESULTS.to_string();
    }

    let mut lines = Vec::new();
    for result in results {
        if !result.nodes.is_empty() {
            let node_info: Vec<String> = result
                .nodes
                .iter()
                .map(|n| format!("{} ({})", n.name, n.node_type))
                .collect();
            lines.push(format!("Related Entities: {}", node_info.join(", ")));
        }
        if let Some(explanation) = &result.explanation {
            lines.push(format!("Context: {}", explanation));
        }
        if let Some(confidence) = result.confidence {
            lines.push(format!("Confidence: {:.2}", confidence));
        }
    }

    lines.join("\n")
}

fn build_answer_prompt(context: &str, graph_context: &str, question: &str) -> String {
    format!(
        r#"You are an AI assistant helping with learning materials. Answer the following question based on the provided context and knowledge graph information.

Context from Document:
{}

Knowledge Graph Information:
{}

Question:
{}

Instructions:
1. Use both the document context and knowledge graph information to formulate your answer
2. If the knowledge graph provides relevant relationships or connections, incorporate them
3. Answer in a clear, motivational, and pedagogical tone
4. If you cannot find sufficient information to answer the question, please explicitly state so
5. Cite specific information from either the context or knowledge graph when possible

Please provide your answer:"#,
        context, graph_context, question
    )
}

/// Normalize varied hedging language into one canonical no-answer reply.
fn normalize_hedging(response: &str) -> String {
    let lowered = response.to_lowercase();
    if INSUFFICIENT_INFO_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        APOLOGY.to_string()
    } else {
        response.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph::{GraphMetadata, Node};
    use std::sync::Mutex;

    struct CannedCompletion(String);

    #[async_trait]
    impl ChatCompletion for CannedCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    /// Records the user prompt it was given, then replies with a fixed text.
    struct RecordingCompletion {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatCompletion for RecordingCompletion {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.seen.lock().unwrap().push(user.to_string());
            Ok(self.reply.clone())
        }
    }

    struct FixedRetriever(Vec<String>);

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn similar_texts(
            &self,
            _document_id: &str,
            _query: &str,
            _top_n: usize,
        ) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn similar_texts(
            &self,
            _document_id: &str,
            _query: &str,
            _top_n: usize,
        ) -> Result<Vec<String>> {
            anyhow::bail!("store unavailable")
        }
    }

    fn node(name: &str, node_type: &str) -> Node {
        Node {
            id: "0_1".into(),
            name: name.into(),
            node_type: node_type.into(),
            chunk_index: 0,
        }
    }

    #[test]
    fn renders_all_present_fields_in_order() {
        let results = vec![GraphQueryResult {
            nodes: vec![node("Alice", "Person"), node("Acme", "Org")],
            explanation: Some("both relate to the founding".into()),
            confidence: Some(0.9),
        }];

        let rendered = format_graph_results(&results);
        assert_eq!(
            rendered,
            "Related Entities: Alice (Person), Acme (Org)\n\
             Context: both relate to the founding\n\
             Confidence: 0.90"
        );
    }

    #[test]
    fn omits_absent_fields() {
        let results = vec![GraphQueryResult {
            nodes: vec![],
            explanation: None,
            confidence: Some(1.0),
        }];

        let rendered = format_graph_results(&results);
        assert_eq!(rendered, "Confidence: 1.00");
    }

    #[test]
    fn no_results_gets_the_fixed_sentence() {
        assert_eq!(format_graph_results(&[]), NO_GRAPH_RESULTS);
    }

    #[test]
    fn hedging_is_normalized_case_insensitively() {
        assert_eq!(
            normalize_hedging("There is Insufficient Information to say."),
            APOLOGY
        );
        assert_eq!(
            normalize_hedging("I cannot determine the cause from the text."),
            APOLOGY
        );
        assert_eq!(normalize_hedging("Alice founded Acme."), "Alice founded Acme.");
    }

    #[tokio::test]
    async fn empty_graph_uses_the_sentinel_context() {
        let llm = RecordingCompletion {
            reply: "An answer.".into(),
            seen: Mutex::new(Vec::new()),
        };
        let query_llm = CannedCompletion("unused".into());
        let retriever = FixedRetriever(vec!["chunk one".into(), "chunk two".into()]);
        let synthesizer = AnswerSynthesizer::new(llm, query_llm, retriever);

        let answer = synthesizer
            .answer("doc-1", &KnowledgeGraph::empty("doc-1"), "a question")
            .await;

        assert_eq!(answer, "An answer.");
        let prompts = synthesizer.llm.seen.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("No knowledge graph information available."));
        assert!(prompts[0].contains("chunk one\nchunk two"));
    }

    #[tokio::test]
    async fn graph_results_flow_into_the_prompt() {
        let graph = KnowledgeGraph {
            nodes: vec![node("Alice", "Person")],
            edges: vec![],
            metadata: GraphMetadata {
                document_id: "doc-1".into(),
                num_chunks: 1,
                created_at: "2024-01-01T00:00:00+00:00".into(),
            },
        };
        let llm = RecordingCompletion {
            reply: "  A grounded answer.  ".into(),
            seen: Mutex::new(Vec::new()),
        };
        let query_llm = CannedCompletion(
            r#"{"results": [{"relevant_nodes": ["0_1"],
                             "explanation": "alice appears",
                             "confidence": 0.8}]}"#
                .into(),
        );
        let synthesizer =
            AnswerSynthesizer::new(llm, query_llm, FixedRetriever(vec!["passage".into()]));

        let answer = synthesizer.answer("doc-1", &graph, "who is alice?").await;

        assert_eq!(answer, "A grounded answer.");
        let prompts = synthesizer.llm.seen.lock().unwrap();
        assert!(prompts[0].contains("Related Entities: Alice (Person)"));
        assert!(prompts[0].contains("Context: alice appears"));
        assert!(prompts[0].contains("Confidence: 0.80"));
    }

    #[tokio::test]
    async fn answer_never_fails() {
        let synthesizer = AnswerSynthesizer::new(
            CannedCompletion("unused".into()),
            CannedCompletion("unused".into()),
            FailingRetriever,
        );

        let answer = synthesizer
            .answer("doc-1", &KnowledgeGraph::empty("doc-1"), "a question")
            .await;

        assert!(answer.starts_with("An error occurred while generating the answer:"));
        assert!(answer.contains("store unavailable"));
    }

    #[tokio::test]
    async fn synthesize_surfaces_structured_errors() {
        let synthesizer = AnswerSynthesizer::new(
            CannedCompletion("unused".into()),
            CannedCompletion("unused".into()),
            FailingRetriever,
        );

        let err = synthesizer
            .synthesize("doc-1", &KnowledgeGraph::empty("doc-1"), "a question")
            .await
            .unwrap_err();

        assert!(matches!(err, SynthesisError::Retrieval(_)));
    }
}
