//! Engine assembly
//!
//! Wires the configured collaborators together: database, model provider,
//! the built-in executors, the supervisor over them, and the session layer
//! on top. This is the only place that knows the concrete shape of the
//! whole engine; everything else sees traits.

use crate::assistant::Assistant;
use crate::config::Config;
use crate::db::Database;
use crate::executors::{ConversationalExecutor, DocumentExecutor, ToolExecutor};
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAiProvider;
use crate::llm::ModelProvider;
use crate::memory::MemoryBudgetController;
use crate::retrieval::Retriever;
use crate::supervisor::{CapabilityRegistry, Supervisor};
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;

/// A fully assembled engine
pub struct Engine {
    pub assistant: Assistant,
    pub database: Database,
    pub model: Arc<dyn ModelProvider>,
}

/// Build the model provider named in the config
pub fn build_provider(config: &Config) -> Result<Arc<dyn ModelProvider>> {
    match config.llm.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.llm.openai.clone()))),
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
        ))),
        other => bail!("unknown llm provider '{other}'"),
    }
}

/// Assemble the engine from a validated config
pub async fn build_engine(config: &Config) -> Result<Engine> {
    let database = Database::new(&config.database_path()).await?;
    let model = build_provider(config)?;

    let documents = database.documents();
    let retriever: Arc<dyn Retriever> = Arc::new(documents.clone());

    let registry = Arc::new(CapabilityRegistry::new());
    registry.register(Arc::new(
        ConversationalExecutor::new(Arc::clone(&model)).with_retriever(
            retriever,
            config.retrieval.top_k,
            config.retrieval.score_gate,
        ),
    ))?;
    registry.register(Arc::new(DocumentExecutor::new(
        Arc::clone(&model),
        documents,
        config.retrieval.top_k,
    )))?;
    registry.register(Arc::new(ToolExecutor::new(Arc::clone(&model))))?;

    let supervisor = Arc::new(Supervisor::new(Arc::clone(&model), Arc::clone(&registry)));

    let memory = MemoryBudgetController::new(
        database.history(),
        Arc::clone(&model),
        config.memory.budget_chars,
        config.memory.recent_tail_turns,
    );

    let assistant = Assistant::new(supervisor, database.history(), memory);

    info!(
        provider = %model.name(),
        executors = registry.len(),
        database = %config.database_path().display(),
        "engine assembled"
    );

    Ok(Engine {
        assistant,
        database,
        model,
    })
}
