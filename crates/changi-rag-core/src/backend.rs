//! Collaborator traits for the external backends.
//!
//! The pipeline talks to three services, each behind an object-safe async
//! trait so the application can plug in HTTP clients, local models, or test
//! doubles:
//!
//! | Trait | Operation |
//! |-------|-----------|
//! | [`EmbeddingProvider`] | `text → Vec<f32>` (fixed dimensionality) |
//! | [`VectorIndex`] | nearest-neighbour query with metadata, best-first |
//! | [`GenerationProvider`] | `prompt → text`, single turn, stateless |
//!
//! Implementations are built once at startup and shared across concurrent
//! chat turns as `Arc<dyn …>`, so they must be `Send + Sync` and hold no
//! per-request mutable state. Every method suspends rather than blocks;
//! implementations wrapping blocking libraries offload the work themselves.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Embedding model backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"bge-base-en-v1.5"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A single nearest-neighbour match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: String,
    /// Similarity score as reported by the index (higher is closer).
    #[serde(default)]
    pub score: f32,
    /// Attached metadata; passages carry their text under `"text"`.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl IndexMatch {
    /// The passage text stored in the match metadata, if present.
    pub fn text(&self) -> Option<&str> {
        self.metadata.get("text").and_then(|t| t.as_str())
    }
}

/// Vector index backend.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns the index name (e.g. `"changi-rag-chatbot"`).
    fn name(&self) -> &str;
    /// Return up to `top_k` matches for `vector`, best-first, metadata included.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;
}

/// Text generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"deepseek-ai/DeepSeek-V3-0324"`).
    fn model_name(&self) -> &str;
    /// Complete a single prompt. No server-side conversation state.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
