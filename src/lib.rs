//! # changi-rag
//!
//! A conversational retrieval-augmented chatbot for Changi Airport customer
//! support.
//!
//! The pipeline itself (history window, query rewrite, retrieval with a
//! corrective fallback, answer generation) lives in [`changi_rag_core`].
//! This crate supplies the concrete backends, configuration, and the HTTP
//! and console frontends.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────┐   ┌──────────┐     ┌───────────────────────┐
//!  │   HTTP   │   │   CLI    │     │    changi-rag-core    │
//!  │  /chat   │──▶│ ask/chat │────▶│      RagPipeline      │
//!  └──────────┘   └──────────┘     └──┬────────┬────────┬──┘
//!                                     ▼        ▼        ▼
//!                              ┌──────────┐ ┌──────────┐ ┌──────────┐
//!                              │Embedding │ │  Index   │ │Generation│
//!                              │local/API │ │ Pinecone │ │ LLM API  │
//!                              └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`embedding`] | Embedding providers (fastembed, OpenAI, Ollama, Hugging Face) |
//! | [`index`] | Vector index clients (Pinecone, in-memory snapshot) |
//! | [`generation`] | Chat completion clients |
//! | [`services`] | Builds the pipeline from config |
//! | [`server`] | HTTP chat server |
//! | [`ask`] | Console `ask` and `chat` |
//! | [`check`] | Backend connectivity check |
//! | [`logging`] | Tracing subscriber setup |

pub mod ask;
pub mod check;
pub mod config;
pub mod embedding;
pub mod generation;
mod http;
pub mod index;
pub mod logging;
pub mod server;
pub mod services;
