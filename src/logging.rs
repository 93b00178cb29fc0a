//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise `logging.level` applies to this crate
//! and its core, with `tower_http` following the same level. Output goes to
//! stderr so `ask` can keep stdout for the answer.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

fn default_directives(level: &str) -> String {
    format!(
        "changi_rag={level},changi_rag_core={level},tower_http={level},warn",
        level = level
    )
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.level)))
        .map_err(|e| anyhow!("Invalid logging.level '{}': {}", config.level, e))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }
}
