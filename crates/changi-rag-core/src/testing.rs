//! Scripted backend doubles for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::backend::{EmbeddingProvider, GenerationProvider, IndexMatch, VectorIndex};

pub fn passage(id: &str, text: &str) -> IndexMatch {
    IndexMatch {
        id: id.to_string(),
        score: 0.5,
        metadata: json!({ "text": text }),
    }
}

/// Records every embedded text and returns a tiny vector derived from it.
pub struct RecordingEmbedder {
    texts: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingEmbedder {
    pub fn new() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            texts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    fn model_name(&self) -> &str {
        "recording"
    }

    fn dims(&self) -> usize {
        2
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(anyhow!("embedding backend down"));
        }
        Ok(vec![text.len() as f32, 1.0])
    }
}

/// Answers queries from a queue of scripted responses; once the queue is
/// drained every query returns no matches.
pub struct ScriptedIndex {
    responses: Mutex<VecDeque<Result<Vec<IndexMatch>>>>,
    top_ks: Mutex<Vec<usize>>,
}

impl ScriptedIndex {
    pub fn new(responses: Vec<Result<Vec<IndexMatch>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            top_ks: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.top_ks.lock().unwrap().len()
    }

    pub fn requested_top_k(&self) -> Vec<usize> {
        self.top_ks.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        self.top_ks.lock().unwrap().push(top_k);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

type Handler = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Generation backend driven by a closure over the prompt.
pub struct ScriptedGenerator {
    handler: Handler,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(handler: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(anyhow!("generation backend down")))
    }

    /// Replies `rewrite` to rewrite prompts and `answer` to answer prompts.
    pub fn rewriting(rewrite: &str, answer: &str) -> Self {
        let rewrite = rewrite.to_string();
        let answer = answer.to_string();
        Self::new(move |prompt| {
            if prompt.contains("Standalone Query:") {
                Ok(rewrite.clone())
            } else {
                Ok(answer.clone())
            }
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.handler)(prompt)
    }
}
