//! In-memory [`VectorIndex`] implementation.
//!
//! Records are held in a `Vec` and searched by brute-force cosine similarity.
//! The index is immutable once shared, so no locking is needed across
//! concurrent queries.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::{IndexMatch, VectorIndex};
use crate::embedding::cosine_similarity;

/// A stored vector with its metadata, in the same shape as a Pinecone
/// upsert record (`{ "id", "values", "metadata" }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Brute-force in-memory index.
pub struct InMemoryIndex {
    name: String,
    records: Vec<IndexRecord>,
}

impl InMemoryIndex {
    /// Build an index from records, checking that every vector has `dims`
    /// components.
    pub fn from_records(
        name: impl Into<String>,
        dims: usize,
        records: Vec<IndexRecord>,
    ) -> Result<Self> {
        for r in &records {
            if r.values.len() != dims {
                bail!(
                    "Record '{}' has {} dimensions, expected {}",
                    r.id,
                    r.values.len(),
                    dims
                );
            }
        }
        Ok(Self {
            name: name.into(),
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        if let Some(first) = self.records.first() {
            if first.values.len() != vector.len() {
                bail!(
                    "Query vector has {} dimensions, index '{}' expects {}",
                    vector.len(),
                    self.name,
                    first.values.len()
                );
            }
        }

        let mut matches: Vec<IndexMatch> = self
            .records
            .iter()
            .map(|r| IndexMatch {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.values),
                metadata: r.metadata.clone(),
            })
            .collect();
        // Stable sort: equal scores keep insertion order.
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
