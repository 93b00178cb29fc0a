//! # changi-rag core
//!
//! Runtime-agnostic logic for the changi-rag chatbot: chat data models, the
//! bounded history window, prompt templates, the collaborator traits for the
//! embedding / vector-index / generation backends, and the conversational
//! retrieval-augmented generation pipeline built on top of them.
//!
//! This crate contains no HTTP clients, no tokio, and no filesystem I/O.
//! Concrete backends live in the `changi-rag` app crate and are handed to
//! [`pipeline::RagPipeline`] as `Arc<dyn …>` trait objects.
//!
//! ## Turn flow
//!
//! ```text
//!              ┌──────────────────┐
//!  query ──┬──▶│  QueryRewriter   │──▶ standalone query ─┐
//!          │   └──────────────────┘                      │
//!          │   ┌──────────────────┐                      ▼
//!          └──▶│ ContextRetriever │──▶ context ──▶ empty && differs?
//!              └──────────────────┘                      │ yes: retrieve(standalone)
//!                                                      ▼
//!                                            ┌─────────────────┐
//!                                            │ AnswerGenerator │──▶ answer
//!                                            └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Role`, `ChatMessage`, `ChatTurnRequest`, `ChatTurnResult` |
//! | [`history`] | Bounded history window |
//! | [`prompt`] | Rewrite and answer prompt templates |
//! | [`outcome`] | `Outcome::{Ok, Degraded}` component result type |
//! | [`backend`] | Embedding, vector index, and generation traits |
//! | [`embedding`] | Vector utilities (cosine similarity) |
//! | [`index`] | In-memory vector index |
//! | [`retriever`] | Context retrieval |
//! | [`rewriter`] | Standalone query rewriting |
//! | [`answer`] | Grounded answer generation |
//! | [`pipeline`] | Chat-turn orchestration and fallback retrieval |

pub mod answer;
pub mod backend;
pub mod embedding;
pub mod history;
pub mod index;
pub mod models;
pub mod outcome;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod rewriter;

#[cfg(test)]
mod testing;

/// Returned by the rewriter and the answer generator when the generation
/// backend fails.
pub const DEGRADED_REPLY: &str = "I'm having trouble generating a response right now.";
