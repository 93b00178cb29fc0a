//! Vector index clients.
//!
//! | Provider | Struct | Notes |
//! |----------|--------|-------|
//! | `pinecone` | [`PineconeIndex`] | Hosted index; data-plane `POST /query` |
//! | `memory` | [`InMemoryIndex`] | JSON snapshot loaded at startup |
//!
//! The snapshot format matches a Pinecone upsert batch, so an exported index
//! can be served locally without changes:
//!
//! ```json
//! [ { "id": "jewel-0", "values": [0.01, ...], "metadata": { "text": "Jewel is ..." } } ]
//! ```

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use changi_rag_core::backend::{IndexMatch, VectorIndex};
use changi_rag_core::index::{InMemoryIndex, IndexRecord};

use crate::config::{require_env, IndexConfig};
use crate::http::{build_client, read_json};

const PINECONE_CONTROL_PLANE: &str = "https://api.pinecone.io";
const PINECONE_API_VERSION: &str = "2024-07";

/// Client for a hosted Pinecone index.
pub struct PineconeIndex {
    name: String,
    host: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

impl PineconeIndex {
    /// Connect to the configured index. When `index.host` is unset the
    /// data-plane host is looked up once via the control plane.
    pub async fn connect(config: &IndexConfig) -> Result<Self> {
        let api_key = require_env(&config.api_key_env)?;
        let client = build_client(config.timeout_secs)?;

        let host = match &config.host {
            Some(host) => host.clone(),
            None => describe_index_host(&client, &api_key, &config.name)
                .await
                .with_context(|| format!("Failed to resolve host for index '{}'", config.name))?,
        };

        tracing::info!(index = %config.name, host = %host, "Connected to Pinecone index");

        Ok(Self {
            name: config.name.clone(),
            host: normalize_host(&host),
            api_key,
            client,
        })
    }
}

async fn describe_index_host(client: &reqwest::Client, api_key: &str, name: &str) -> Result<String> {
    let response = client
        .get(format!("{}/indexes/{}", PINECONE_CONTROL_PLANE, name))
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
        .send()
        .await?;
    let json = read_json(response, "Pinecone").await?;
    let described: DescribeIndexResponse = serde_json::from_value(json)
        .map_err(|e| anyhow!("Invalid Pinecone describe_index response: {}", e))?;
    Ok(described.host)
}

/// Hosts come back bare (`idx-abc.svc.pinecone.io`); accept full URLs too.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn parse_query_response(json: serde_json::Value) -> Result<Vec<IndexMatch>> {
    let parsed: QueryResponse = serde_json::from_value(json)
        .map_err(|e| anyhow!("Invalid Pinecone query response: {}", e))?;
    Ok(parsed.matches)
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&body)
            .send()
            .await?;

        let json = read_json(response, "Pinecone").await?;
        parse_query_response(json)
    }
}

/// Load a JSON snapshot into an [`InMemoryIndex`], checking every vector
/// against the embedding dimensionality.
pub fn load_snapshot(name: &str, path: &Path, dims: usize) -> Result<InMemoryIndex> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index snapshot: {}", path.display()))?;
    let records: Vec<IndexRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse index snapshot: {}", path.display()))?;
    let index = InMemoryIndex::from_records(name, dims, records)
        .with_context(|| format!("Index snapshot {} does not match embedding.dims", path.display()))?;

    if index.is_empty() {
        tracing::warn!(index = name, "Index snapshot is empty; every turn will retrieve no context");
    } else {
        tracing::info!(index = name, records = index.len(), "Loaded index snapshot");
    }
    Ok(index)
}

/// Create the [`VectorIndex`] named by `index.provider`.
pub async fn create_index(config: &IndexConfig, dims: usize) -> Result<Arc<dyn VectorIndex>> {
    match config.provider.as_str() {
        "pinecone" => Ok(Arc::new(PineconeIndex::connect(config).await?)),
        "memory" => {
            let path = config
                .snapshot
                .as_ref()
                .ok_or_else(|| anyhow!("index.snapshot required for memory provider"))?;
            Ok(Arc::new(load_snapshot(&config.name, path, dims)?))
        }
        other => anyhow::bail!("Unknown index provider: {}", other),
    }
}
