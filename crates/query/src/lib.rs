pub mod answer;
pub mod graph_search;

pub use answer::{AnswerSynthesizer, Retriever, SynthesisError};
pub use graph_search::{GraphQueryEngine, GraphQueryError, GraphQueryResult};

use anyhow::{Context, Result};
use async_trait::async_trait;
use index::{EmbeddingClient, VectorStore};

/// `Retriever` backed by the embedding client and the vector store: embed the
/// question, then run a document-scoped similarity search.
pub struct VectorRetriever {
    store: VectorStore,
    embedder: EmbeddingClient,
}

impl VectorRetriever {
    pub fn new(store: VectorStore, embedder: EmbeddingClient) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn similar_texts(
        &self,
        document_id: &str,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<String>> {
        let query_vector = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let hits = self.store.search(document_id, &query_vector, top_n).await?;
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }
}
