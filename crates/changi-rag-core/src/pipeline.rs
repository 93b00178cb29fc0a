//! Chat-turn orchestration.
//!
//! [`RagPipeline`] is the service handle built once at startup and shared by
//! every concurrent chat turn. A turn moves through these stages:
//!
//! ```text
//! Start → RewritingAndRetrieving → (CorrectiveRetrieval) → Generating → Done
//! ```
//!
//! 1. **RewritingAndRetrieving**: the query rewrite and a retrieval with the
//!    *original* query run concurrently and are joined; neither sees the
//!    other's result.
//! 2. **CorrectiveRetrieval**: entered only when the first context is empty
//!    and the standalone query differs from the original (see
//!    [`needs_corrective_retrieval`]). Runs at most once.
//! 3. **Generating**: the answer is generated from the original query, the
//!    final context, and the windowed history.
//!
//! Component failures degrade inside the components. The only errors that
//! escape [`RagPipeline::run_turn`] are faults with no sensible fallback,
//! such as a blank query; the transport turns those into a generic error.

use anyhow::{bail, Result};
use futures_util::future::join;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::answer::AnswerGenerator;
use crate::backend::{EmbeddingProvider, GenerationProvider, VectorIndex};
use crate::models::{append_turn, ChatTurnRequest, ChatTurnResult};
use crate::retriever::{ContextRetriever, DEFAULT_TOP_K};
use crate::rewriter::QueryRewriter;

/// Tuning knobs for the pipeline, decoupled from application config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Passages requested per retrieval.
    pub top_k: usize,
    /// What the assistant helps with, used in the answer prompt.
    pub persona: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            persona: "Changi Airport".to_string(),
        }
    }
}

/// Stage of a chat turn, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    RewritingAndRetrieving,
    CorrectiveRetrieval,
    Generating,
    Done,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnStage::RewritingAndRetrieving => "rewriting_and_retrieving",
            TurnStage::CorrectiveRetrieval => "corrective_retrieval",
            TurnStage::Generating => "generating",
            TurnStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// What happened during one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    /// Query used for the corrective retrieval (if any).
    pub standalone_query: String,
    pub rewrite_degraded: bool,
    /// 1 or 2.
    pub retrieval_calls: usize,
    pub corrective_retrieval: bool,
    /// True when any retrieval call failed and fell back to empty context.
    pub retrieval_degraded: bool,
    /// Context handed to the answer step.
    pub context: String,
    pub answer_degraded: bool,
}

/// The corrective retrieval runs iff the first context is empty and the
/// rewrite actually changed the query (compared after trimming).
pub fn needs_corrective_retrieval(context: &str, original: &str, standalone: &str) -> bool {
    context.is_empty() && standalone.trim() != original.trim()
}

/// Conversational RAG pipeline over shared backend handles.
pub struct RagPipeline {
    rewriter: QueryRewriter,
    retriever: ContextRetriever,
    answerer: AnswerGenerator,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerationProvider>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(generator.clone()),
            retriever: ContextRetriever::new(embedder, index, settings.top_k),
            answerer: AnswerGenerator::new(generator, settings.persona),
        }
    }

    /// Run one chat turn.
    pub async fn run_turn(&self, req: &ChatTurnRequest) -> Result<ChatTurnResult> {
        let (result, _) = self.run_turn_with_report(req).await?;
        Ok(result)
    }

    /// Run one chat turn and also return a [`TurnReport`].
    pub async fn run_turn_with_report(
        &self,
        req: &ChatTurnRequest,
    ) -> Result<(ChatTurnResult, TurnReport)> {
        if req.query.trim().is_empty() {
            bail!("query must not be empty");
        }
        let query = req.query.as_str();
        let history = req.history.as_slice();

        debug!(stage = %TurnStage::RewritingAndRetrieving, history_len = history.len());
        let (rewritten, first) = join(
            self.rewriter.rewrite(query, history),
            self.retriever.retrieve(query),
        )
        .await;

        let rewrite_degraded = rewritten.is_degraded();
        let standalone_query = rewritten.into_inner();
        let mut retrieval_degraded = first.is_degraded();
        let mut context = first.into_inner();
        let mut retrieval_calls = 1;
        let mut corrective_retrieval = false;

        if needs_corrective_retrieval(&context, query, &standalone_query) {
            debug!(stage = %TurnStage::CorrectiveRetrieval, standalone = %standalone_query);
            if rewrite_degraded {
                warn!("Corrective retrieval is using the fallback reply as its query");
            }
            let second = self.retriever.retrieve(&standalone_query).await;
            retrieval_calls += 1;
            corrective_retrieval = true;
            retrieval_degraded |= second.is_degraded();
            context = second.into_inner();
        }

        debug!(stage = %TurnStage::Generating, context_len = context.len());
        let answer = self.answerer.generate(query, &context, history).await;
        let answer_degraded = answer.is_degraded();
        let answer = answer.into_inner();

        info!(
            stage = %TurnStage::Done,
            retrieval_calls,
            context_empty = context.is_empty(),
            rewrite_degraded,
            answer_degraded,
            "Chat turn complete"
        );

        let updated_history = req
            .return_history
            .then(|| append_turn(history, query, &answer));

        let report = TurnReport {
            standalone_query,
            rewrite_degraded,
            retrieval_calls,
            corrective_retrieval,
            retrieval_degraded,
            context,
            answer_degraded,
        };

        Ok((
            ChatTurnResult {
                answer,
                updated_history,
            },
            report,
        ))
    }
}
