//! Result synthesizer
//!
//! Combines all successful task results plus the original query into one
//! coherent final answer. Failed task slots never reach the synthesis
//! prompt, so the model cannot be led into fabricating attribution for work
//! that didn't happen. Source references (task index to executor identity)
//! are derived from the context directly and are stable regardless of what
//! the model writes.

use crate::llm::{Message, ModelError, ModelProvider};
use crate::supervisor::context::{ExecutionContext, TaskOutcome};
use serde::Serialize;
use std::sync::Arc;

/// Final user-facing answer
#[derive(Debug, Clone)]
pub struct Answer {
    /// The answer text
    pub text: String,

    /// Which executor produced each successful task result
    pub sources: Vec<SourceRef>,
}

/// Attribution of one successful task slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub task_index: usize,
    pub executor: String,
}

pub struct ResultSynthesizer {
    model: Arc<dyn ModelProvider>,
}

impl ResultSynthesizer {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self { model }
    }

    /// Produce the final answer for a completed (possibly partial) context
    pub async fn synthesize(
        &self,
        original_query: &str,
        context: &ExecutionContext,
    ) -> Result<Answer, ModelError> {
        let sources: Vec<SourceRef> = context
            .successes()
            .map(|(task_index, record)| SourceRef {
                task_index,
                executor: record.executor.clone(),
            })
            .collect();

        let mut results_block = String::new();
        for (index, record) in context.successes() {
            if let TaskOutcome::Success(result) = &record.outcome {
                results_block.push_str(&format!(
                    "Step {}: {}\nResult: {}\n---\n",
                    index + 1,
                    record.description,
                    result
                ));
            }
        }

        let attempted = context.entries().len();
        let completed = sources.len();

        let system = if completed == 0 {
            Message::system(
                "You are an assistant. Every step taken to answer the user's \
                 request failed. Apologize briefly, say you could not complete \
                 the request, and do not invent results.",
            )
        } else if completed < attempted {
            Message::system(
                "You are an assistant. Combine the step results below into one \
                 coherent answer to the user's request. Some steps failed and \
                 are omitted; answer from the results you have and note any \
                 gap honestly. Never invent results for missing steps.",
            )
        } else {
            Message::system(
                "You are an assistant. Combine the step results below into one \
                 coherent, concise answer to the user's request. Base the \
                 answer only on those results.",
            )
        };

        let user = Message::user(format!(
            "Request: {original_query}\n\nStep results:\n{}",
            if results_block.is_empty() {
                "(none)"
            } else {
                &results_block
            }
        ));

        let text = self.model.generate(&[system, user]).await?;

        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, Result as ModelResult};
    use crate::supervisor::context::TaskRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Capture {
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ModelProvider for Capture {
        fn name(&self) -> &str {
            "capture"
        }

        async fn generate(&self, messages: &[Message]) -> ModelResult<String> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            Ok("combined answer".to_string())
        }
    }

    fn context_with_one_failure() -> ExecutionContext {
        let mut context = ExecutionContext::new();
        context.push(TaskRecord {
            description: "look up the capital".to_string(),
            executor: "conversational".to_string(),
            outcome: TaskOutcome::Success("Paris".to_string()),
            router_fallback: false,
        });
        context.push(TaskRecord {
            description: "fetch population".to_string(),
            executor: "document".to_string(),
            outcome: TaskOutcome::Failure("search offline".to_string()),
            router_fallback: false,
        });
        context
    }

    #[tokio::test]
    async fn failed_slots_stay_out_of_the_prompt() {
        let capture = Arc::new(Capture {
            prompts: Mutex::new(Vec::new()),
        });
        let synthesizer = ResultSynthesizer::new(capture.clone() as Arc<dyn ModelProvider>);

        let answer = synthesizer
            .synthesize("capital and population?", &context_with_one_failure())
            .await
            .unwrap();

        assert_eq!(answer.text, "combined answer");
        assert_eq!(
            answer.sources,
            vec![SourceRef {
                task_index: 0,
                executor: "conversational".to_string()
            }]
        );

        let prompts = capture.prompts.lock().unwrap();
        let user_content = &prompts[0][1].content;
        assert!(user_content.contains("Paris"));
        assert!(!user_content.contains("search offline"));
        assert!(!user_content.contains("fetch population"));
    }

    #[tokio::test]
    async fn attribution_set_is_stable_across_reruns() {
        let capture = Arc::new(Capture {
            prompts: Mutex::new(Vec::new()),
        });
        let synthesizer = ResultSynthesizer::new(capture as Arc<dyn ModelProvider>);
        let context = context_with_one_failure();

        let first = synthesizer.synthesize("q", &context).await.unwrap();
        let second = synthesizer.synthesize("q", &context).await.unwrap();
        assert_eq!(first.sources, second.sources);
    }
}
