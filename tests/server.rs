//! Drives the real axum router on a free port with in-process backends.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use changi_rag::server;
use changi_rag_core::backend::{EmbeddingProvider, GenerationProvider, IndexMatch, VectorIndex};
use changi_rag_core::index::{InMemoryIndex, IndexRecord};
use changi_rag_core::pipeline::{PipelineSettings, RagPipeline};
use changi_rag_core::DEGRADED_REPLY;

/// Maps "jewel" queries to [1, 0] and everything else to [0, 1], so only
/// queries mentioning Jewel find the single indexed passage.
struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }

    fn dims(&self) -> usize {
        2
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.to_lowercase().contains("jewel") {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }
}

struct CountingIndex {
    inner: InMemoryIndex,
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl VectorIndex for CountingIndex {
    fn name(&self) -> &str {
        "test"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("index unavailable");
        }
        // Only positive similarities count as hits.
        let matches = self.inner.query(vector, top_k).await?;
        Ok(matches.into_iter().filter(|m| m.score > 0.0).collect())
    }
}

/// Rewrites every follow-up to mention Jewel; answers with the first
/// context line it was given, or "no context".
struct EchoGenerator;

#[async_trait]
impl GenerationProvider for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("Standalone Query:") {
            return Ok("  Parking at Jewel Changi  ".to_string());
        }
        let context = prompt
            .split("Retrieved Context:\n---\n")
            .nth(1)
            .and_then(|rest| rest.split("\n---\n").next())
            .unwrap_or("");
        if context.trim().is_empty() {
            Ok("no context".to_string())
        } else {
            Ok(format!("from context: {}", context.lines().next().unwrap_or("")))
        }
    }
}

struct TestServer {
    base: String,
    index: Arc<CountingIndex>,
}

async fn start(fail_index: bool) -> TestServer {
    let records = vec![IndexRecord {
        id: "jewel".to_string(),
        values: vec![1.0, 0.0],
        metadata: json!({ "text": "Jewel car park is at basement levels B3 to B5." }),
    }];
    let index = Arc::new(CountingIndex {
        inner: InMemoryIndex::from_records("test", 2, records).unwrap(),
        calls: AtomicUsize::new(0),
        fail: fail_index,
    });

    let pipeline = RagPipeline::new(
        Arc::new(KeywordEmbedder),
        index.clone(),
        Arc::new(EchoGenerator),
        PipelineSettings {
            top_k: 1,
            ..PipelineSettings::default()
        },
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::new(pipeline)));

    TestServer {
        base: format!("http://{}", addr),
        index,
    }
}

async fn post_chat(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let srv = start(false).await;
    let body: Value = reqwest::get(format!("{}/health", srv.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "OK");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_chat_answers_from_first_retrieval() {
    let srv = start(false).await;
    let (status, body) = post_chat(
        &srv.base,
        json!({ "query": "Is there parking at Jewel?", "history": [] }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(
        body["answer"],
        "from context: Jewel car park is at basement levels B3 to B5."
    );
    assert!(body.get("updated_history").is_none());
    assert_eq!(srv.index.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_follow_up_uses_corrective_retrieval() {
    let srv = start(false).await;
    let (status, body) = post_chat(
        &srv.base,
        json!({
            "query": "And parking there?",
            "history": [
                { "role": "User", "content": "Tell me about Jewel" },
                { "role": "AI", "content": "Jewel is a nature-themed complex." }
            ],
            "return_history": true
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(
        body["answer"],
        "from context: Jewel car park is at basement levels B3 to B5."
    );
    assert_eq!(srv.index.calls.load(Ordering::SeqCst), 2);

    let history = body["updated_history"].as_array().unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2], json!({ "role": "User", "content": "And parking there?" }));
    assert_eq!(history[3]["role"], "Assistant");
    assert_eq!(history[3]["content"], body["answer"]);
}

#[tokio::test]
async fn test_index_outage_degrades_to_empty_context() {
    let srv = start(true).await;
    let (status, body) = post_chat(&srv.base, json!({ "query": "Where is Terminal 4?" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["answer"], "no context");
    assert_eq!(srv.index.calls.load(Ordering::SeqCst), 2);
    assert_ne!(body["answer"], DEGRADED_REPLY);
}

#[tokio::test]
async fn test_blank_query_is_generic_internal_error() {
    let srv = start(false).await;
    let (status, body) = post_chat(&srv.base, json!({ "query": "   ", "history": [] })).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "internal");
    assert_eq!(
        body["error"]["message"],
        "An internal error occurred. Please try again later."
    );
    assert_eq!(srv.index.calls.load(Ordering::SeqCst), 0);
}

async fn post_raw(base: &str, body: &'static str) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn assert_generic_internal(status: u16, body: &Value) {
    assert_eq!(status, 500);
    assert_eq!(
        body,
        &json!({ "error": { "code": "internal", "message": "An internal error occurred. Please try again later." } })
    );
}

#[tokio::test]
async fn test_unknown_role_is_generic_internal_error() {
    let srv = start(false).await;
    let (status, body) = post_raw(
        &srv.base,
        r#"{"query":"hi","history":[{"role":"Bot","content":"x"}]}"#,
    )
    .await;

    assert_generic_internal(status, &body);
    assert!(!body.to_string().contains("Bot"));
    assert_eq!(srv.index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_query_is_generic_internal_error() {
    let srv = start(false).await;
    let (status, body) = post_raw(&srv.base, r#"{"history":[]}"#).await;
    assert_generic_internal(status, &body);
}

#[tokio::test]
async fn test_unparseable_body_is_generic_internal_error() {
    let srv = start(false).await;
    let (status, body) = post_raw(&srv.base, "{not json").await;
    assert_generic_internal(status, &body);
    assert_eq!(srv.index.calls.load(Ordering::SeqCst), 0);
}
