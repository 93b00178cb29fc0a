//! Console frontends: one-shot `ask` and the interactive `chat` loop.
//!
//! Both run the same pipeline the HTTP server uses. Answers go to stdout;
//! logs go to stderr through the tracing subscriber.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Instrument;

use changi_rag_core::models::{ChatHistory, ChatTurnRequest};
use changi_rag_core::pipeline::{RagPipeline, TurnReport};

use crate::config::Config;
use crate::services::build_pipeline;

/// Read a conversation from a JSON file shaped like the `history` field of
/// a `/chat` request.
pub fn load_history(path: &Path) -> Result<ChatHistory> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))
}

/// Run one chat turn and print the answer.
///
/// With `explain`, the turn report (standalone query, whether the corrective
/// retrieval ran, the context used) is printed after the answer.
pub async fn run_ask(
    config: &Config,
    query: &str,
    history_file: Option<&Path>,
    explain: bool,
) -> Result<()> {
    let history = match history_file {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    let pipeline = build_pipeline(config).await?;
    let req = ChatTurnRequest::new(query, history);

    let (result, report) = pipeline
        .run_turn_with_report(&req)
        .instrument(turn_span())
        .await?;

    println!("{}", result.answer);
    if explain {
        println!();
        print!("{}", render_report(&report));
    }
    Ok(())
}

/// Interactive console chat. History is kept in memory for the session;
/// `exit` (or end of input) quits.
pub async fn run_chat(config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    println!("Chatting with the {} assistant. Type 'exit' to quit.", config.assistant.persona);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: ChatHistory = Vec::new();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit(query) {
            break;
        }

        history = chat_once(&pipeline, query, history).await?;
        if let Some(answer) = history.last() {
            println!("Bot: {}", answer.content);
        }
    }

    Ok(())
}

async fn chat_once(pipeline: &RagPipeline, query: &str, history: ChatHistory) -> Result<ChatHistory> {
    let req = ChatTurnRequest::new(query, history).with_history_returned();
    let result = pipeline.run_turn(&req).instrument(turn_span()).await?;
    Ok(result.updated_history.unwrap_or(req.history))
}

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit")
}

fn turn_span() -> tracing::Span {
    tracing::info_span!("chat_turn", turn_id = %uuid::Uuid::new_v4())
}

fn render_report(report: &TurnReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("standalone query:     {}\n", report.standalone_query));
    out.push_str(&format!("rewrite degraded:     {}\n", report.rewrite_degraded));
    out.push_str(&format!("retrieval calls:      {}\n", report.retrieval_calls));
    out.push_str(&format!("corrective retrieval: {}\n", report.corrective_retrieval));
    out.push_str(&format!("retrieval degraded:   {}\n", report.retrieval_degraded));
    out.push_str(&format!("answer degraded:      {}\n", report.answer_degraded));
    if report.context.is_empty() {
        out.push_str("context:              (empty)\n");
    } else {
        out.push_str("context:\n");
        for line in report.context.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
