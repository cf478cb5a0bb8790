use anyhow::{Context, Result};

/// Application configuration, read once at startup and passed explicitly into
/// component constructors. No global state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub store: StoreConfig,
    pub retry: RetryConfig,
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub completion_model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is required")?;

        Ok(Self {
            openai: OpenAiConfig {
                base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com"),
                api_key,
                completion_model: env_or("COMPLETION_MODEL", "gpt-3.5-turbo"),
                embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-ada-002"),
            },
            store: StoreConfig {
                url: env_or("QDRANT_URL", "http://localhost:6333"),
                collection: env_or("COLLECTION_NAME", "embeddings"),
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
