//! # changi-rag CLI
//!
//! The `changi-rag` binary serves the airport chatbot over HTTP and offers
//! console access to the same pipeline for testing and demos.
//!
//! ## Usage
//!
//! ```bash
//! changi-rag --config ./config/changi-rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `changi-rag serve` | Start the HTTP chat server |
//! | `changi-rag ask "<query>"` | Answer one question |
//! | `changi-rag chat` | Interactive console chat |
//! | `changi-rag check` | Build every backend and print what is configured |
//!
//! ## Examples
//!
//! ```bash
//! # Follow-up question with prior turns from a file
//! changi-rag ask "And what about parking there?" --history ./history.json --explain
//!
//! # Serve the web client
//! changi-rag serve --config ./config/changi-rag.toml
//! ```
//!
//! Credentials are read from the environment; a `.env` file in the working
//! directory is loaded first if present.

use changi_rag::{ask, check, config, logging, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Conversational retrieval-augmented chatbot for Changi Airport.
#[derive(Parser)]
#[command(
    name = "changi-rag",
    about = "Conversational RAG chatbot for airport customer support",
    version,
    long_about = "changi-rag answers questions about the airport from a vector index of \
    its public pages. Follow-up questions are rewritten into standalone queries, relevant \
    passages are retrieved, and an LLM answers grounded in that context."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/changi-rag.toml`. See
    /// `config/changi-rag.example.toml` for every option.
    #[arg(long, global = true, default_value = "./config/changi-rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat server.
    ///
    /// Binds to `[server].bind` and serves `POST /chat` and `GET /health`.
    Serve,

    /// Answer a single question and exit.
    Ask {
        /// The question to ask.
        query: String,

        /// JSON file with prior turns (`[{"role": "User", "content": "..."}]`).
        #[arg(long)]
        history: Option<PathBuf>,

        /// Also print how the turn was answered: the standalone query,
        /// retrieval calls, and the context used.
        #[arg(long)]
        explain: bool,
    },

    /// Interactive console chat. Type `exit` to quit.
    Chat,

    /// Build every backend client and print the resolved configuration.
    ///
    /// Fails with the same error `serve` would on missing credentials or
    /// an unreachable index.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask {
            query,
            history,
            explain,
        } => {
            ask::run_ask(&cfg, &query, history.as_deref(), explain).await?;
        }
        Commands::Chat => {
            ask::run_chat(&cfg).await?;
        }
        Commands::Check => {
            check::run_check(&cfg).await?;
        }
    }

    Ok(())
}
