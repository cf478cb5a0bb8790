use crate::chunk::Chunk;

pub struct SplitterConfig {
    /// Maximum estimated tokens per chunk.
    pub max_tokens: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self { max_tokens: 5000 }
    }
}

/// Sentence-packing splitter: sentences are accumulated into a chunk until
/// the token budget would overflow, then a new chunk starts. No overlap
/// between chunks.
pub struct Splitter {
    config: SplitterConfig,
}

impl Splitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn split_text(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;

        for sentence in text.split(". ") {
            if sentence.trim().is_empty() {
                continue;
            }
            let sentence_tokens = estimate_tokens(sentence);

            if current_tokens + sentence_tokens > self.config.max_tokens && !current.is_empty() {
                chunks.push(Chunk::new(document_id, chunks.len(), current.trim()));
                current = String::new();
                current_tokens = 0;
            }

            current.push_str(sentence);
            current.push_str(". ");
            current_tokens += sentence_tokens;
        }

        if !current.trim().is_empty() {
            chunks.push(Chunk::new(document_id, chunks.len(), current.trim()));
        }

        chunks
    }
}

/// Rough token estimate: ~1.3 tokens per whitespace-separated word. Good
/// enough to keep chunks under the completion model's context budget without
/// shipping a tokenizer model.
pub fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f64 * 1.3) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_ordered_chunks() {
        let splitter = Splitter::new(SplitterConfig { max_tokens: 5 });
        let text = "One two three four. Five six seven eight. Nine ten eleven twelve.";
        let chunks = splitter.split_text("doc-1", text);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.document_id, "doc-1");
            assert!(!chunk.text.trim().is_empty());
        }
    }

    #[test]
    fn small_text_is_one_chunk() {
        let splitter = Splitter::new(SplitterConfig::default());
        let chunks = splitter.split_text("doc-1", "A single short sentence.");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let splitter = Splitter::new(SplitterConfig::default());
        assert!(splitter.split_text("doc-1", "   ").is_empty());
    }

    #[test]
    fn chunks_respect_token_budget() {
        let splitter = Splitter::new(SplitterConfig { max_tokens: 10 });
        let text = "Alpha beta gamma delta. Epsilon zeta eta theta. Iota kappa lambda mu. Nu xi omicron pi.";
        for chunk in splitter.split_text("doc-1", text) {
            // A single sentence may exceed the budget on its own; packed
            // sentences must not.
            assert!(estimate_tokens(&chunk.text) <= 10 + estimate_tokens("Alpha beta gamma delta."));
        }
    }

    #[test]
    fn row_id_combines_document_and_index() {
        let chunk = Chunk::new("doc-9", 3, "text");
        assert_eq!(chunk.row_id(), "doc-9_3");
    }
}
