//! Conversational executor
//!
//! The general-dialogue worker: answers a task in natural language through
//! the model collaborator, optionally grounded by retrieved passages. It
//! holds no session state of its own; whatever history matters arrives in
//! the context string the supervisor hands it.

use crate::executors::failure_from_model;
use crate::llm::{Message, ModelProvider};
use crate::retrieval::Retriever;
use async_trait::async_trait;
use sdk::{Executor, ExecutorDescriptor, ExecutorFailure};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ConversationalExecutor {
    descriptor: ExecutorDescriptor,
    model: Arc<dyn ModelProvider>,
    retriever: Option<Arc<dyn Retriever>>,
    top_k: usize,
    score_gate: f64,
}

impl ConversationalExecutor {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self {
            descriptor: ExecutorDescriptor::new(
                "conversational",
                "General dialogue: greetings, questions, explanations, and \
                 anything answerable in natural language.",
            ),
            model,
            retriever: None,
            top_k: 4,
            score_gate: 0.0,
        }
    }

    /// Ground answers with passages from the given retriever
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>, top_k: usize, score_gate: f64) -> Self {
        self.retriever = Some(retriever);
        self.top_k = top_k;
        self.score_gate = score_gate;
        self
    }

    /// Fetch grounding passages; a retrieval failure degrades to an
    /// ungrounded answer rather than failing the task.
    async fn grounding(&self, input: &str) -> Option<String> {
        let retriever = self.retriever.as_ref()?;

        let documents = match retriever.search(input, self.top_k).await {
            Ok(documents) => documents,
            Err(error) => {
                warn!(%error, "retrieval failed, answering without passages");
                return None;
            }
        };

        let mut passages = String::new();
        for document in documents.iter().filter(|d| d.score > self.score_gate) {
            passages.push_str(&format!("[{}] {}\n", document.source_id, document.content));
        }

        if passages.is_empty() {
            None
        } else {
            debug!(chars = passages.len(), "grounding passages attached");
            Some(passages)
        }
    }
}

#[async_trait]
impl Executor for ConversationalExecutor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, input: &str, context: &str) -> Result<String, ExecutorFailure> {
        let passages = self.grounding(input).await;

        let mut prompt = String::new();
        if !context.is_empty() {
            prompt.push_str(&format!("Conversation so far:\n{context}\n"));
        }
        if let Some(passages) = &passages {
            prompt.push_str(&format!("Relevant passages:\n{passages}\n"));
        }
        prompt.push_str(input);

        let messages = [
            Message::system(
                "You are a friendly, concise assistant. Answer the user's \
                 message directly. When passages are provided, ground your \
                 answer in them and say so when they don't cover the question.",
            ),
            Message::user(prompt),
        ];

        self.model
            .generate(&messages)
            .await
            .map_err(failure_from_model)
    }
}
