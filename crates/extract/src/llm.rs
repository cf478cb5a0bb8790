use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text-completion capability. The extractor, the graph query engine and the
/// answer synthesizer all talk to the model through this seam, so tests can
/// swap in a canned implementation.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Chat-completions client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAiClient {
    pub fn new(base_url: String, api_key: String, model: String, temperature: f32) -> Self {
        Self {
            base_url,
            api_key,
            model,
            temperature,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        if !response.status().is_success() {
            anyhow::bail!("Completion request failed: {}", response.status());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Completion response contained no choices")?;

        Ok(content)
    }
}

/// Strip a surrounding markdown code fence from a model reply. Models wrap
/// JSON in ``` fences even when told not to; the JSON itself is untouched.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line, if any.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
