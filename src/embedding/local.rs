//! In-process embeddings via fastembed.
//!
//! The ONNX model is downloaded from Hugging Face on first use and cached;
//! afterwards no network calls are made. Inference is CPU-bound and
//! blocking, so each call runs on tokio's blocking pool under the configured
//! timeout.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use changi_rag_core::backend::EmbeddingProvider;

use crate::config::{local_model_dims, EmbeddingConfig, DEFAULT_LOCAL_MODEL};

/// Embedding provider for local inference.
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    timeout: Duration,
    model: Arc<Mutex<fastembed::TextEmbedding>>,
}

impl LocalProvider {
    /// Load the configured model. Runs on the blocking pool since the first
    /// load may download weights.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let (model_name, dims) = resolve_local_model(config)?;
        let fastembed_model = config_to_fastembed_model(&model_name)?;

        let model = tokio::task::spawn_blocking(move || {
            fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
            )
            .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))
        })
        .await??;

        tracing::info!(model = %model_name, dims, "Loaded local embedding model");

        Ok(Self {
            model_name,
            dims,
            timeout: Duration::from_secs(config.timeout_secs),
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let texts = vec![text.to_string()];

        let task = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| anyhow!("Local embedding model lock poisoned"))?;
            model
                .embed(texts, None)
                .map_err(|e| anyhow!("Local embedding failed: {}", e))
        });

        let embeddings = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| anyhow!("Local embedding timed out after {:?}", self.timeout))???;

        let vec = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))?;
        if vec.len() != self.dims {
            bail!(
                "Embedding has {} dimensions, expected {}",
                vec.len(),
                self.dims
            );
        }
        Ok(vec)
    }
}

fn resolve_local_model(config: &EmbeddingConfig) -> Result<(String, usize)> {
    let model_name = config
        .resolved_model()
        .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
    let known = local_model_dims(&model_name)
        .ok_or_else(|| anyhow!("Unknown local embedding model: '{}'", model_name))?;
    if let Some(dims) = config.dims {
        if dims != known {
            bail!(
                "embedding.dims = {} but local model '{}' produces {} dimensions",
                dims,
                model_name,
                known
            );
        }
    }
    Ok((model_name, known))
}

fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1.5",
            other
        ),
    }
}
