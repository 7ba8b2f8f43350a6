//! Document executor
//!
//! Knowledge-base worker over the document store: adds material, searches
//! it, and summarizes what a search turned up. The intended action is read
//! from the input through a JSON-constrained model decision, with a keyword
//! fallback so the common phrasings ("add this...", "search for...") keep
//! working when the decision function is unavailable.

use crate::db::documents::DocumentRepository;
use crate::executors::failure_from_model;
use crate::llm::{self, Message, ModelProvider};
use async_trait::async_trait;
use sdk::{Executor, ExecutorDescriptor, ExecutorFailure};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum DocumentAction {
    Add,
    Search,
    Summarize,
}

#[derive(Debug, Deserialize)]
struct Intent {
    action: DocumentAction,
    /// Text to store (add) or the search terms (search/summarize)
    #[serde(default)]
    payload: Option<String>,
    /// Stable id for stored material; generated when absent
    #[serde(default)]
    source_id: Option<String>,
}

pub struct DocumentExecutor {
    descriptor: ExecutorDescriptor,
    model: Arc<dyn ModelProvider>,
    documents: DocumentRepository,
    top_k: usize,
}

impl DocumentExecutor {
    pub fn new(model: Arc<dyn ModelProvider>, documents: DocumentRepository, top_k: usize) -> Self {
        Self {
            descriptor: ExecutorDescriptor::new(
                "document",
                "Knowledge base operations: store documents, search stored \
                 material, summarize what a search finds.",
            ),
            model,
            documents,
            top_k,
        }
    }

    async fn intent(&self, input: &str) -> Intent {
        let messages = [
            Message::system(
                "You classify a request against a document store.\n\
                 Output ONLY a JSON object:\n\
                 {\"action\": \"add\"|\"search\"|\"summarize\", \
                 \"payload\": \"<text to store, or the search terms>\", \
                 \"source_id\": \"<id for stored text, or null>\"}\n\
                 \"add\" stores new material, \"search\" looks material up, \
                 \"summarize\" searches and condenses the matches.",
            ),
            Message::user(input),
        ];

        match llm::generate_json::<Intent>(self.model.as_ref(), &messages).await {
            Ok(intent) => intent,
            Err(error) => {
                warn!(%error, "intent decision unusable, using keyword fallback");
                keyword_intent(input)
            }
        }
    }

    async fn add(&self, intent: &Intent, input: &str) -> Result<String, ExecutorFailure> {
        let content = intent.payload.as_deref().unwrap_or(input);
        let source_id = match &intent.source_id {
            Some(id) => id.clone(),
            None => format!("doc-{}", uuid::Uuid::new_v4()),
        };

        self.documents
            .add_document(&source_id, content)
            .await
            .map_err(|e| ExecutorFailure::recoverable(e.to_string()))?;

        debug!(source_id, chars = content.len(), "document stored");
        Ok(format!("Stored document '{source_id}' ({} characters).", content.len()))
    }

    async fn search(&self, intent: &Intent, input: &str) -> Result<String, ExecutorFailure> {
        let query = intent.payload.as_deref().unwrap_or(input);
        let results = self
            .documents
            .search_documents(query, self.top_k)
            .await
            .map_err(|e| ExecutorFailure::recoverable(e.to_string()))?;

        if results.is_empty() {
            return Ok("No stored documents match that query.".to_string());
        }

        let mut listing = String::new();
        for result in &results {
            listing.push_str(&format!("[{}] {}\n", result.source_id, result.content));
        }
        Ok(listing)
    }

    async fn summarize(&self, intent: &Intent, input: &str) -> Result<String, ExecutorFailure> {
        let listing = self.search(intent, input).await?;
        if listing.starts_with("No stored documents") {
            return Ok(listing);
        }

        let messages = [
            Message::system(
                "Summarize the documents below into a short, factual digest. \
                 Output only the summary.",
            ),
            Message::user(format!("Documents:\n{listing}")),
        ];

        self.model
            .generate(&messages)
            .await
            .map_err(failure_from_model)
    }
}

/// Best-effort intent when the decision function is down
fn keyword_intent(input: &str) -> Intent {
    let lowered = input.to_lowercase();
    let action = if lowered.contains("summar") {
        DocumentAction::Summarize
    } else if lowered.contains("add ")
        || lowered.contains("store ")
        || lowered.contains("remember this")
        || lowered.contains("save ")
    {
        DocumentAction::Add
    } else {
        DocumentAction::Search
    };

    Intent {
        action,
        payload: None,
        source_id: None,
    }
}

#[async_trait]
impl Executor for DocumentExecutor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, input: &str, _context: &str) -> Result<String, ExecutorFailure> {
        let intent = self.intent(input).await;
        debug!(action = ?intent.action, "document action");

        match intent.action {
            DocumentAction::Add => self.add(&intent, input).await,
            DocumentAction::Search => self.search(&intent, input).await,
            DocumentAction::Summarize => self.summarize(&intent, input).await,
        }
    }
}
