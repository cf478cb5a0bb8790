use serde::{Deserialize, Serialize};

/// One bounded slice of a document's text, the unit of extraction and
/// embedding. Chunks are immutable once produced by the splitter; `index` is
/// the chunk's 0-based position within the document and doubles as the
/// namespace prefix for every entity id extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(document_id: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            index,
            text: text.into(),
        }
    }

    /// Row id of this chunk's embedding row in the vector store.
    pub fn row_id(&self) -> String {
        format!("{}_{}", self.document_id, self.index)
    }
}
