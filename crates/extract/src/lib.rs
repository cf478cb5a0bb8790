pub mod error;
pub mod llm;
pub mod prompt;
pub mod schema;

pub use error::ExtractionError;
pub use llm::{ChatCompletion, OpenAiClient};
pub use schema::{ChunkExtraction, LocalEntity, LocalRelationship};

/// Turns one text chunk into a local graph fragment via the completion
/// capability. Purely functional given the capability's reply.
pub struct Extractor<C> {
    llm: C,
}

impl<C: ChatCompletion> Extractor<C> {
    pub fn new(llm: C) -> Self {
        Self { llm }
    }

    /// Extract entities and relationships from a chunk of text.
    pub async fn extract(&self, chunk_text: &str) -> Result<ChunkExtraction, ExtractionError> {
        let user_prompt = prompt::build_extraction_prompt(chunk_text);

        let response = self
            .llm
            .complete(prompt::EXTRACTION_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(ExtractionError::Completion)?;

        let extraction = serde_json::from_str(llm::strip_code_fences(&response))?;
        Ok(extraction)
    }
}
