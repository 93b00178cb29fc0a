//! Grounded answer generation.
//!
//! The answer is generated from the user's original wording, not the
//! rewritten query, so the reply addresses what was actually asked. The
//! rewritten query only drives retrieval.

use std::sync::Arc;
use tracing::warn;

use crate::backend::GenerationProvider;
use crate::models::ChatMessage;
use crate::outcome::Outcome;
use crate::prompt::answer_prompt;
use crate::DEGRADED_REPLY;

pub struct AnswerGenerator {
    generator: Arc<dyn GenerationProvider>,
    persona: String,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn GenerationProvider>, persona: impl Into<String>) -> Self {
        Self {
            generator,
            persona: persona.into(),
        }
    }

    /// Generate an answer to `query` from `context` and the windowed
    /// `history`. Backend failure yields `Outcome::Degraded(DEGRADED_REPLY)`.
    pub async fn generate(
        &self,
        query: &str,
        context: &str,
        history: &[ChatMessage],
    ) -> Outcome<String> {
        let prompt = answer_prompt(&self.persona, query, context, history);
        match self.generator.complete(&prompt).await {
            Ok(text) => Outcome::Ok(text.trim().to_string()),
            Err(e) => {
                warn!(
                    model = self.generator.model_name(),
                    error = format!("{:#}", e),
                    "Answer generation failed"
                );
                Outcome::Degraded(DEGRADED_REPLY.to_string())
            }
        }
    }
}
