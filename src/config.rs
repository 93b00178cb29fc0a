//! TOML configuration parsing and validation.
//!
//! Every section has defaults matching the production deployment, so a
//! config file only needs the values it changes. Credentials never live in
//! the file: each backend names the environment variable holding its key,
//! and the key is checked when the client is built at startup.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [retrieval]
//! top_k = 5
//!
//! [index]
//! provider = "pinecone"
//! name = "changi-rag-chatbot"
//!
//! [embedding]
//! provider = "local"
//! model = "bge-base-en-v1.5"
//! dims = 768
//!
//! [generation]
//! provider = "openai-compatible"
//! model = "deepseek-ai/DeepSeek-V3-0324"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use changi_rag_core::pipeline::PipelineSettings;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    changi_rag_core::retriever::DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// `"pinecone"` or `"memory"`.
    #[serde(default = "default_index_provider")]
    pub provider: String,
    #[serde(default = "default_index_name")]
    pub name: String,
    /// Data-plane host. Resolved from the control plane when absent.
    #[serde(default)]
    pub host: Option<String>,
    /// JSON snapshot loaded by the `memory` provider.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    #[serde(default = "default_index_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: default_index_provider(),
            name: default_index_name(),
            host: None,
            snapshot: None,
            api_key_env: default_index_key_env(),
            timeout_secs: default_index_timeout(),
        }
    }
}

fn default_index_provider() -> String {
    "pinecone".to_string()
}
fn default_index_name() -> String {
    "changi-rag-chatbot".to_string()
}
fn default_index_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}
fn default_index_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"local"`, `"openai"`, `"ollama"`, or `"huggingface"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Required for remote providers; `local` falls back to
    /// `bge-base-en-v1.5`.
    #[serde(default)]
    pub model: Option<String>,
    /// Required for remote providers; `local` looks it up from the model.
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama server, OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    /// Overrides the provider's default key variable.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            api_key_env: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}

/// Model used by the `local` provider when `embedding.model` is unset.
pub const DEFAULT_LOCAL_MODEL: &str = "bge-base-en-v1.5";

/// Output dimensionality of each model the `local` provider can load.
pub fn local_model_dims(model: &str) -> Option<usize> {
    match model {
        "all-minilm-l6-v2" => Some(384),
        "bge-small-en-v1.5" => Some(384),
        "bge-base-en-v1.5" => Some(768),
        "bge-large-en-v1.5" => Some(1024),
        "nomic-embed-text-v1.5" => Some(768),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// The configured model, or the local default for the `local` provider.
    pub fn resolved_model(&self) -> Option<String> {
        match (&self.model, self.provider.as_str()) {
            (Some(model), _) => Some(model.clone()),
            (None, "local") => Some(DEFAULT_LOCAL_MODEL.to_string()),
            (None, _) => None,
        }
    }

    /// The configured dimensionality, or the model's known size for the
    /// `local` provider.
    pub fn resolved_dims(&self) -> Option<usize> {
        if self.dims.is_some() {
            return self.dims;
        }
        if self.provider == "local" {
            return self.resolved_model().as_deref().and_then(local_model_dims);
        }
        None
    }

    /// Environment variable holding the API key, if the provider needs one.
    pub fn key_env(&self) -> Option<String> {
        if let Some(env) = &self.api_key_env {
            return Some(env.clone());
        }
        match self.provider.as_str() {
            "openai" => Some("OPENAI_API_KEY".to_string()),
            "huggingface" => Some("HUGGINGFACE_API_KEY".to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `"openai-compatible"` or `"ollama"`.
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    /// Variable holding the bearer token; `None` for keyless local servers.
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            base_url: default_generation_base_url(),
            api_key_env: default_generation_key_env(),
            max_tokens: None,
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_generation_provider() -> String {
    "openai-compatible".to_string()
}
fn default_generation_model() -> String {
    "deepseek-ai/DeepSeek-V3-0324".to_string()
}
fn default_generation_base_url() -> String {
    "https://router.huggingface.co/v1".to_string()
}
fn default_generation_key_env() -> Option<String> {
    Some("HUGGINGFACE_API_KEY".to_string())
}
fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    #[serde(default = "default_persona")]
    pub persona: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
        }
    }
}

fn default_persona() -> String {
    "Changi Airport".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Pipeline settings derived from `[retrieval]` and `[assistant]`.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            top_k: self.retrieval.top_k,
            persona: self.assistant.persona.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be >= 1");
        }

        match self.index.provider.as_str() {
            "pinecone" => {}
            "memory" => {
                if self.index.snapshot.is_none() {
                    bail!("index.snapshot must be set when provider is 'memory'");
                }
            }
            other => bail!(
                "Unknown index provider: '{}'. Must be pinecone or memory.",
                other
            ),
        }
        if self.index.name.trim().is_empty() {
            bail!("index.name must not be empty");
        }

        match self.embedding.provider.as_str() {
            "local" | "openai" | "ollama" | "huggingface" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, openai, ollama, or huggingface.",
                other
            ),
        }
        let model = match self.embedding.resolved_model() {
            Some(model) => model,
            None => bail!(
                "embedding.model must be specified when provider is '{}'",
                self.embedding.provider
            ),
        };
        if self.embedding.provider == "local" {
            let Some(known) = local_model_dims(&model) else {
                bail!("Unknown local embedding model: '{}'", model);
            };
            if let Some(dims) = self.embedding.dims {
                if dims != known {
                    bail!(
                        "embedding.dims = {} but local model '{}' produces {} dimensions",
                        dims,
                        model,
                        known
                    );
                }
            }
        }
        match self.embedding.resolved_dims() {
            Some(dims) if dims > 0 => {}
            _ => bail!(
                "embedding.dims must be set (> 0) when provider is '{}'",
                self.embedding.provider
            ),
        }

        match self.generation.provider.as_str() {
            "openai-compatible" | "ollama" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be openai-compatible or ollama.",
                other
            ),
        }
        if self.generation.model.trim().is_empty() {
            bail!("generation.model must not be empty");
        }

        for (name, secs) in [
            ("index", self.index.timeout_secs),
            ("embedding", self.embedding.timeout_secs),
            ("generation", self.generation.timeout_secs),
        ] {
            if secs == 0 {
                bail!("{}.timeout_secs must be > 0", name);
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Read a required credential from the environment.
pub fn require_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => bail!("{} environment variable not set", var),
    }
}
