//! Backend wiring.
//!
//! Builds every backend client once from [`Config`] and hands them to the
//! core pipeline as shared trait objects. Any failure here (missing key,
//! unreachable control plane, model that fails to load) aborts startup.

use anyhow::{Context, Result};
use std::sync::Arc;

use changi_rag_core::backend::{EmbeddingProvider, GenerationProvider, VectorIndex};
use changi_rag_core::pipeline::{PipelineSettings, RagPipeline};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::generation::create_generator;
use crate::index::create_index;

/// The three backend handles a pipeline needs.
pub struct Backends {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub generator: Arc<dyn GenerationProvider>,
}

impl Backends {
    pub async fn connect(config: &Config) -> Result<Self> {
        let embedder = create_provider(&config.embedding)
            .await
            .context("Failed to initialize embedding provider")?;
        let index = create_index(&config.index, embedder.dims())
            .await
            .context("Failed to initialize vector index")?;
        let generator =
            create_generator(&config.generation).context("Failed to initialize generator")?;

        tracing::info!(
            embedding = embedder.model_name(),
            dims = embedder.dims(),
            index = index.name(),
            generation = generator.model_name(),
            "Backends ready"
        );

        Ok(Self {
            embedder,
            index,
            generator,
        })
    }

    pub fn into_pipeline(self, settings: PipelineSettings) -> RagPipeline {
        RagPipeline::new(self.embedder, self.index, self.generator, settings)
    }
}

/// Connect all backends and build the pipeline described by `config`.
pub async fn build_pipeline(config: &Config) -> Result<RagPipeline> {
    Ok(Backends::connect(config)
        .await?
        .into_pipeline(config.pipeline_settings()))
}
