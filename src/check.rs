//! `changi-rag check`: build every backend and report what was configured.

use anyhow::Result;

use crate::config::Config;
use crate::services::Backends;

/// Connect all backends (failing exactly as `serve` would) and print a
/// summary table.
pub async fn run_check(config: &Config) -> Result<()> {
    let backends = Backends::connect(config).await?;

    println!("{:<12} {:<20} DETAIL", "BACKEND", "PROVIDER");
    println!(
        "{:<12} {:<20} {} ({} dims)",
        "embedding",
        config.embedding.provider,
        backends.embedder.model_name(),
        backends.embedder.dims()
    );
    println!(
        "{:<12} {:<20} {}",
        "index",
        config.index.provider,
        backends.index.name()
    );
    println!(
        "{:<12} {:<20} {}",
        "generation",
        config.generation.provider,
        backends.generator.model_name()
    );
    println!();
    println!(
        "top_k = {}, persona = \"{}\"",
        config.retrieval.top_k, config.assistant.persona
    );

    Ok(())
}
