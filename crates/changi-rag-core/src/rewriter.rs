//! Standalone query rewriting.
//!
//! A follow-up like "And what about parking there?" cannot be retrieved on
//! its own. The rewriter asks the generation backend to fold the recent
//! history into a self-contained query that drives retrieval.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::GenerationProvider;
use crate::models::ChatMessage;
use crate::outcome::Outcome;
use crate::prompt::rewrite_prompt;
use crate::DEGRADED_REPLY;

pub struct QueryRewriter {
    generator: Arc<dyn GenerationProvider>,
}

impl QueryRewriter {
    pub fn new(generator: Arc<dyn GenerationProvider>) -> Self {
        Self { generator }
    }

    /// Rewrite `query` using the windowed `history`.
    ///
    /// On backend failure returns `Outcome::Degraded(DEGRADED_REPLY)`. The
    /// pipeline still uses that string as the standalone query.
    pub async fn rewrite(&self, query: &str, history: &[ChatMessage]) -> Outcome<String> {
        let prompt = rewrite_prompt(query, history);
        match self.generator.complete(&prompt).await {
            Ok(text) => {
                let standalone = text.trim().to_string();
                debug!(standalone = %standalone, "Rewrote query");
                Outcome::Ok(standalone)
            }
            Err(e) => {
                warn!(
                    model = self.generator.model_name(),
                    error = format!("{:#}", e),
                    "Query rewrite failed, using fallback reply as standalone query"
                );
                Outcome::Degraded(DEGRADED_REPLY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    #[tokio::test]
    async fn test_rewrite_trims_completion() {
        let generator = Arc::new(ScriptedGenerator::replying("  Where can I park at Jewel?\n"));
        let rewriter = QueryRewriter::new(generator.clone());
        let history = vec![
            ChatMessage::user("Tell me about Jewel"),
            ChatMessage::assistant("Jewel is ..."),
        ];

        let outcome = rewriter.rewrite("And what about parking there?", &history).await;
        assert_eq!(outcome, Outcome::Ok("Where can I park at Jewel?".to_string()));

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("User: Tell me about Jewel\nAssistant: Jewel is ..."));
        assert!(prompts[0].contains("And what about parking there?"));
    }

    #[tokio::test]
    async fn test_rewrite_failure_returns_fallback() {
        let rewriter = QueryRewriter::new(Arc::new(ScriptedGenerator::failing()));
        let outcome = rewriter.rewrite("q", &[]).await;
        assert_eq!(outcome, Outcome::Degraded(DEGRADED_REPLY.to_string()));
    }

    #[tokio::test]
    async fn test_rewrite_prompt_is_windowed() {
        let generator = Arc::new(ScriptedGenerator::replying("q"));
        let rewriter = QueryRewriter::new(generator.clone());
        let history: Vec<ChatMessage> = (0..9).map(|i| ChatMessage::user(format!("turn-{}", i))).collect();

        rewriter.rewrite("q", &history).await;
        let prompt = &generator.prompts()[0];
        assert!(!prompt.contains("turn-2"));
        assert!(prompt.contains("turn-3"));
        assert!(prompt.contains("turn-8"));
    }
}
