//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - ask: resolve one query and print the answer
//! - chat: interactive loop over a session
//! - history: show a session's stored turns and memory state
//! - ingest: add a file to the knowledge base
//! - status: configuration, provider availability, store counts

use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::bootstrap::{build_engine, build_provider};
use crate::config::Config;
use crate::db::Database;
use crate::memory::BudgetState;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn fresh_session_id() -> String {
    format!("session-{}", uuid::Uuid::new_v4())
}

/// Resolve one query and print the answer
pub async fn handle_ask(
    query: String,
    session: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let engine = build_engine(config).await?;
    let session_id = session.unwrap_or_else(fresh_session_id);

    let reply = engine.assistant.handle_query(&session_id, &query).await?;
    engine.database.close().await?;

    match format {
        OutputFormat::Text => println!("{reply}"),
        OutputFormat::Json => println!(
            "{}",
            json!({ "session": session_id, "query": query, "answer": reply })
        ),
    }
    Ok(())
}

/// Interactive chat loop over one session
pub async fn handle_chat(session: Option<String>, config: &Config) -> Result<()> {
    let engine = build_engine(config).await?;
    let session_id = session.unwrap_or_else(fresh_session_id);

    println!("Chatting in session '{session_id}'. Type 'exit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match engine.assistant.handle_query(&session_id, line).await {
            Ok(reply) => println!("{reply}"),
            Err(error) => eprintln!("error: {error:#}"),
        }
    }

    engine.database.close().await?;
    Ok(())
}

/// Show a session's compacted history and memory state
pub async fn handle_history(
    session: String,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let database = Database::new(&config.database_path()).await?;
    let history = database.history();

    let view = history.read_history(&session).await?;
    let total_turns = history.turn_count(&session).await?;
    let raw_length = history.text_length_since_checkpoint(&session).await?;
    let state = if raw_length as usize > config.memory.budget_chars {
        BudgetState::OverBudget
    } else {
        BudgetState::WithinBudget
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                json!({
                    "session": session,
                    "summary": view.summary,
                    "turns": view.turns,
                    "total_turns": total_turns,
                    "raw_chars": raw_length,
                    "budget_chars": config.memory.budget_chars,
                    "over_budget": state == BudgetState::OverBudget,
                })
            );
        }
        OutputFormat::Text => {
            println!("Session '{session}': {total_turns} turn(s) stored.");
            println!(
                "Memory: {raw_length}/{} raw characters ({:?}).",
                config.memory.budget_chars, state
            );
            if let Some(summary) = &view.summary {
                println!("\nSummary of earlier conversation:\n{summary}");
            }
            if !view.turns.is_empty() {
                println!("\nRecent turns:");
                for turn in &view.turns {
                    println!("  {}: {}", turn.role, turn.content);
                }
            }
        }
    }

    database.close().await?;
    Ok(())
}

/// Add a file to the knowledge base
pub async fn handle_ingest(
    path: PathBuf,
    id: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let source_id = id.unwrap_or_else(|| file_stem_id(&path));

    let database = Database::new(&config.database_path()).await?;
    let documents = database.documents();
    documents.add_document(&source_id, &content).await?;
    let count = documents.count().await?;
    database.close().await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "source_id": source_id, "chars": content.len(), "documents": count })
        ),
        OutputFormat::Text => println!(
            "Ingested '{}' as '{source_id}' ({} characters). {count} document(s) stored.",
            path.display(),
            content.len()
        ),
    }
    Ok(())
}

/// Show configuration, provider availability, and store counts
pub async fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let provider = build_provider(config)?;
    let healthy = provider.check_health().await;

    let database = Database::new(&config.database_path()).await?;
    let document_count = database.documents().count().await?;
    database.close().await?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "provider": provider.name(),
                "provider_available": healthy,
                "database": config.database_path(),
                "documents": document_count,
                "memory_budget_chars": config.memory.budget_chars,
            })
        ),
        OutputFormat::Text => {
            println!("Provider: {} ({})", provider.name(), if healthy { "available" } else { "unavailable" });
            println!("Database: {}", config.database_path().display());
            println!("Documents stored: {document_count}");
            println!("Memory budget: {} characters", config.memory.budget_chars);
        }
    }
    Ok(())
}

fn file_stem_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("doc-{}", uuid::Uuid::new_v4()))
}
