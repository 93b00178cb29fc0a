//! Vector index implementations that need no network.
//!
//! Hosted indexes (Pinecone) live in the app crate; this module provides the
//! in-memory index used for local development snapshots and tests.

pub mod memory;

pub use memory::{InMemoryIndex, IndexRecord};
