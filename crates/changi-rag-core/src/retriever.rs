//! Context retrieval: query text → joined knowledge-base passages.
//!
//! The query is embedded, the index is asked for the `top_k` nearest
//! passages, and their `metadata.text` fields are joined in the index's own
//! ranking order with [`CONTEXT_SEPARATOR`]. No re-ranking happens here.
//!
//! Any failure along the way (embedding error, index error or timeout, a
//! match without a text field) degrades to an empty context rather than
//! failing the chat turn.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::{EmbeddingProvider, VectorIndex};
use crate::outcome::Outcome;

/// Separator placed between retrieved passages.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Number of passages requested from the index by default.
pub const DEFAULT_TOP_K: usize = 5;

/// Join passages best-first. No passages yields an empty string.
pub fn join_passages(passages: &[&str]) -> String {
    passages.join(CONTEXT_SEPARATOR)
}

/// Maps a query string to a block of supporting text.
pub struct ContextRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl ContextRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    /// Retrieve context for `query`. Never fails; errors become
    /// `Outcome::Degraded("")`.
    pub async fn retrieve(&self, query: &str) -> Outcome<String> {
        match self.try_retrieve(query).await {
            Ok(context) => Outcome::Ok(context),
            Err(e) => {
                warn!(
                    index = self.index.name(),
                    error = format!("{:#}", e),
                    "Context retrieval failed, continuing without context"
                );
                Outcome::Degraded(String::new())
            }
        }
    }

    async fn try_retrieve(&self, query: &str) -> Result<String> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .with_context(|| format!("embedding with {}", self.embedder.model_name()))?;

        let matches = self
            .index
            .query(&vector, self.top_k)
            .await
            .with_context(|| format!("querying index {}", self.index.name()))?;

        let passages = matches
            .iter()
            .map(|m| {
                m.text()
                    .ok_or_else(|| anyhow!("match '{}' has no text metadata", m.id))
            })
            .collect::<Result<Vec<&str>>>()?;

        debug!(passages = passages.len(), "Retrieved context passages");
        Ok(join_passages(&passages))
    }
}
