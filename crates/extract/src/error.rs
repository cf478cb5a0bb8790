use thiserror::Error;

/// Failure while extracting entities and relations from one chunk. No retry
/// happens at this layer; callers own the retry policy.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("completion request failed: {0}")]
    Completion(#[source] anyhow::Error),

    #[error("extraction response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
