pub mod embeddings;
pub mod store;

pub use embeddings::EmbeddingClient;
pub use store::{EmbeddingRow, SearchHit, VectorStore};

use anyhow::Result;
use ingest::Chunk;

/// Embeds chunks and persists them, together with the document's serialized
/// knowledge graph, as vector rows.
pub struct Indexer {
    store: VectorStore,
    embedder: EmbeddingClient,
}

impl Indexer {
    pub fn new(store: VectorStore, embedder: EmbeddingClient) -> Self {
        Self { store, embedder }
    }

    /// Index every chunk of a document. The serialized graph is attached to
    /// each row verbatim. Existing rows for the document are dropped first,
    /// so re-ingestion overwrites rather than accumulates.
    pub async fn index_document(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        graph_json: &str,
    ) -> Result<usize> {
        if chunks.is_empty() {
            anyhow::bail!("Chunks list is empty");
        }

        let mut rows = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = self.embedder.embed(&chunk.text).await?;
            rows.push(EmbeddingRow {
                id: chunk.row_id(),
                document_id: document_id.to_string(),
                text: chunk.text.clone(),
                vector,
                knowledge_graph: graph_json.to_string(),
            });
        }

        let dimension = rows[0].vector.len();
        self.store.ensure_collection(dimension).await?;
        self.store.delete_document(document_id).await?;
        self.store.upsert_rows(&rows).await?;

        tracing::info!(document_id, rows = rows.len(), "document indexed");
        Ok(rows.len())
    }
}
