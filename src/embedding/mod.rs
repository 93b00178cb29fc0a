//! Embedding provider implementations.
//!
//! Concrete [`EmbeddingProvider`]s for the core pipeline:
//! - **`LocalProvider`**: runs the model in-process via fastembed; the
//!   model is loaded once at startup and inference is offloaded to the
//!   blocking pool.
//! - **[`OpenAIProvider`]**: `POST /v1/embeddings` on the OpenAI API (or a
//!   compatible gateway).
//! - **[`OllamaProvider`]**: `POST /api/embed` on a local Ollama instance.
//! - **[`HuggingFaceProvider`]**: the Hugging Face inference
//!   feature-extraction pipeline.
//!
//! Use [`create_provider`] to build the one named in `[embedding]`.
//!
//! # Failure Policy
//!
//! Providers never retry. Any transport error, non-2xx status, timeout, or
//! malformed response is returned as an error; the retriever turns that into
//! an empty context for the current turn.

#[cfg(feature = "local-embeddings-fastembed")]
mod local;

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalProvider;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use changi_rag_core::backend::EmbeddingProvider;

use crate::config::{require_env, EmbeddingConfig};
use crate::http::{build_client, read_json};

fn required_model(config: &EmbeddingConfig) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow!("embedding.model required for {} provider", config.provider))
}

fn required_dims(config: &EmbeddingConfig) -> Result<usize> {
    config
        .dims
        .ok_or_else(|| anyhow!("embedding.dims required for {} provider", config.provider))
}

fn check_dims(vec: Vec<f32>, dims: usize) -> Result<Vec<f32>> {
    if vec.len() != dims {
        bail!(
            "Embedding has {} dimensions, expected {}",
            vec.len(),
            dims
        );
    }
    Ok(vec)
}

fn json_to_vec(value: &serde_json::Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI embeddings API.
///
/// Requires the `OPENAI_API_KEY` environment variable (or the variable
/// named by `embedding.api_key_env`).
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = required_model(config)?;
        let dims = required_dims(config)?;
        let key_env = config
            .key_env()
            .unwrap_or_else(|| "OPENAI_API_KEY".to_string());
        let api_key = require_env(&key_env)?;
        let base_url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            model,
            dims,
            base_url,
            api_key,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let json = read_json(response, "OpenAI").await?;
        let vec = parse_openai_response(&json)?;
        check_dims(vec, self.dims)
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    first
        .get("embedding")
        .and_then(json_to_vec)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default:
/// `http://localhost:11434`). The model must already be pulled.
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            model: required_model(config)?,
            dims: required_dims(config)?,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Ollama connection error (is Ollama running at {}?): {}", self.url, e))?;

        let json = read_json(response, "Ollama").await?;
        let vec = parse_ollama_response(&json)?;
        check_dims(vec, self.dims)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .and_then(json_to_vec)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))
}

// ============ Hugging Face Provider ============

/// Embedding provider using the Hugging Face inference feature-extraction
/// pipeline (e.g. `BAAI/bge-base-en-v1.5`).
///
/// Requires `HUGGINGFACE_API_KEY` (or `embedding.api_key_env`).
pub struct HuggingFaceProvider {
    model: String,
    dims: usize,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HuggingFaceProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = required_model(config)?;
        let key_env = config
            .key_env()
            .unwrap_or_else(|| "HUGGINGFACE_API_KEY".to_string());
        let api_key = require_env(&key_env)?;
        let base = config
            .url
            .clone()
            .unwrap_or_else(|| "https://router.huggingface.co/hf-inference".to_string());
        let endpoint = format!(
            "{}/models/{}/pipeline/feature-extraction",
            base.trim_end_matches('/'),
            model
        );

        Ok(Self {
            dims: required_dims(config)?,
            model,
            endpoint,
            api_key,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "inputs": text }))
            .send()
            .await?;

        let json = read_json(response, "Hugging Face").await?;
        let vec = parse_feature_extraction(&json)?;
        check_dims(vec, self.dims)
    }
}

/// The pipeline answers with either a flat vector or a one-element batch.
fn parse_feature_extraction(json: &serde_json::Value) -> Result<Vec<f32>> {
    let arr = json
        .as_array()
        .ok_or_else(|| anyhow!("Invalid Hugging Face response: expected an array"))?;

    let flat = match arr.first() {
        Some(serde_json::Value::Array(_)) => &arr[0],
        _ => json,
    };
    json_to_vec(flat).ok_or_else(|| anyhow!("Invalid Hugging Face response: non-numeric embedding"))
}

/// Create the [`EmbeddingProvider`] named by `embedding.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"local"` | `LocalProvider` (fastembed, see features) |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"huggingface"` | [`HuggingFaceProvider`] |
///
/// # Errors
///
/// Unknown providers, missing credentials, or a local model that fails to
/// load. These are startup failures.
pub async fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        "huggingface" => Ok(Arc::new(HuggingFaceProvider::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalProvider::load(config).await?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => bail!(
            "Local embedding provider requires --features local-embeddings-fastembed"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_openai_response() {
        let json = json!({ "data": [ { "index": 0, "embedding": [0.5, -1.0, 2.0] } ] });
        assert_eq!(parse_openai_response(&json).unwrap(), vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_parse_openai_response_missing_data() {
        assert!(parse_openai_response(&json!({ "error": "nope" })).is_err());
        assert!(parse_openai_response(&json!({ "data": [] })).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = json!({ "model": "nomic-embed-text", "embeddings": [[1.0, 2.0]] });
        assert_eq!(parse_ollama_response(&json).unwrap(), vec![1.0, 2.0]);
        assert!(parse_ollama_response(&json!({})).is_err());
    }

    #[test]
    fn test_parse_feature_extraction_flat_and_batched() {
        assert_eq!(
            parse_feature_extraction(&json!([0.25, 0.75])).unwrap(),
            vec![0.25, 0.75]
        );
        assert_eq!(
            parse_feature_extraction(&json!([[0.25, 0.75]])).unwrap(),
            vec![0.25, 0.75]
        );
        assert!(parse_feature_extraction(&json!({ "error": "loading" })).is_err());
        assert!(parse_feature_extraction(&json!(["a", "b"])).is_err());
    }

    #[test]
    fn test_check_dims() {
        assert!(check_dims(vec![1.0, 2.0], 2).is_ok());
        assert!(check_dims(vec![1.0], 2).is_err());
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "cohere".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_openai_requires_key() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-small".to_string()),
            dims: Some(1536),
            api_key_env: Some("CHANGI_RAG_TEST_UNSET_KEY".to_string()),
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config).await.err().unwrap();
        assert!(err.to_string().contains("CHANGI_RAG_TEST_UNSET_KEY"));
    }
}
