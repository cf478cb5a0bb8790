pub mod chunk;
pub mod pdf;
pub mod splitter;

pub use chunk::Chunk;
pub use pdf::fetch_document;
pub use splitter::{Splitter, SplitterConfig};

use anyhow::Result;

/// Fetch a document from a URL and split it into chunks. Returns the fresh
/// document id with the ordered chunk sequence.
pub async fn ingest_url(url: &str) -> Result<(String, Vec<Chunk>)> {
    let (document_id, text) = pdf::fetch_document(url).await?;
    let splitter = Splitter::new(SplitterConfig::default());
    let chunks = splitter.split_text(&document_id, &text);
    Ok((document_id, chunks))
}
