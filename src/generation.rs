//! Text generation clients.
//!
//! Both the query rewriter and the answer generator send a single prompt as
//! one user message and take the first reply verbatim. Trimming happens in
//! the core crate.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use changi_rag_core::backend::GenerationProvider;

use crate::config::{require_env, GenerationConfig};
use crate::http::{build_client, read_json};

/// Chat completions over any OpenAI-compatible endpoint (OpenAI, the
/// Hugging Face router, vLLM, LiteLLM, ...).
pub struct OpenAICompatibleProvider {
    model: String,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAICompatibleProvider {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(require_env(var)?),
            None => None,
        };

        Ok(Self {
            model: config.model.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            api_key,
            max_tokens: config.max_tokens,
            client: build_client(config.timeout_secs)?,
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [ { "role": "user", "content": prompt } ],
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        body
    }
}

#[async_trait]
impl GenerationProvider for OpenAICompatibleProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = self.client.post(&self.endpoint).json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let json = read_json(response, "Chat completions").await?;
        parse_chat_completion(&json)
    }
}

/// Extract `choices[0].message.content`.
fn parse_chat_completion(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid chat completion response: missing choices[0].message.content"))
}

/// Chat via a local Ollama server (`POST /api/chat`, non-streaming).
pub struct OllamaGenerator {
    model: String,
    url: String,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [ { "role": "user", "content": prompt } ],
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["options"] = serde_json::json!({ "num_predict": max_tokens });
        }

        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Ollama connection error (is Ollama running at {}?): {}", self.url, e))?;

        let json = read_json(response, "Ollama").await?;
        parse_ollama_chat(&json)
    }
}

fn parse_ollama_chat(json: &serde_json::Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing message.content"))
}

/// Create the [`GenerationProvider`] named by `generation.provider`.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "openai-compatible" => Ok(Arc::new(OpenAICompatibleProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
