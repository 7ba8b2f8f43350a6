//! Shared test helpers: a scriptable model provider and engine assembly
//! over a temporary database.

use async_trait::async_trait;
use maestro_engine::llm::{Message, ModelError, ModelProvider, Result as ModelResult};
use std::sync::{Arc, Mutex};

/// Model stub that replays a fixed response sequence and records every
/// prompt it was handed.
pub struct ScriptedModel {
    responses: Mutex<Vec<String>>,
    pub prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn with(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, messages: &[Message]) -> ModelResult<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| ModelError::Unknown("script exhausted".to_string()))
    }
}

/// Model stub that always fails, for outage scenarios.
pub struct OfflineModel;

#[async_trait]
impl ModelProvider for OfflineModel {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, _messages: &[Message]) -> ModelResult<String> {
        Err(ModelError::ProviderUnavailable("no backend".to_string()))
    }
}
