//! Delegation router
//!
//! For a single task plus accumulated context, selects exactly one executor
//! (or the supervisor itself) and produces the literal input handed to it.
//! The decision function is the model collaborator; the router's own
//! contract is purely on the shape of that decision: the chosen identity is
//! always either a candidate or the reserved self identity. An invented name
//! from the model never leaks through, it becomes a logged fallback to self.

use crate::llm::{self, Message, ModelProvider};
use crate::supervisor::context::ExecutionContext;
use crate::supervisor::planner::Task;
use sdk::ExecutorDescriptor;
use serde::Deserialize;
use std::sync::Arc;

/// Reserved identity meaning "the supervisor executes this task directly"
pub const SELF_IDENTITY: &str = "supervisor";

/// The router's decision for one task
#[derive(Debug, Clone)]
pub struct Delegation {
    /// A candidate identity, or [`SELF_IDENTITY`]
    pub chosen: String,

    /// The exact string handed to the chosen executor; carries enough
    /// context that the executor need not re-derive prior results
    pub literal_input: String,

    /// True when the decision function's output was unusable and the router
    /// fell back to the self identity
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    executor: String,
    #[serde(default)]
    input: Option<String>,
}

pub struct DelegationRouter {
    model: Arc<dyn ModelProvider>,
}

impl DelegationRouter {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self { model }
    }

    /// Choose an executor for one task.
    ///
    /// This never fails the query: any trouble with the decision (model
    /// error, malformed JSON after the retry, unknown identity) resolves to
    /// the self identity with `fallback = true`, which the caller records as
    /// a `RouterFallback` condition.
    pub async fn select(
        &self,
        task: &Task,
        context: &ExecutionContext,
        candidates: &[ExecutorDescriptor],
    ) -> Delegation {
        let default_input = default_literal_input(task, context);

        if candidates.is_empty() {
            return Delegation {
                chosen: SELF_IDENTITY.to_string(),
                literal_input: default_input,
                fallback: false,
            };
        }

        let mut roster = String::new();
        for descriptor in candidates {
            roster.push_str(&format!(
                "- {}: {}\n",
                descriptor.identity, descriptor.capability
            ));
        }

        let transcript = context.transcript();
        let messages = [
            Message::system(format!(
                "You are a delegation router. Pick the single best executor for \
                 the task below, or \"{SELF_IDENTITY}\" if none fits.\n\
                 Available executors:\n{roster}\n\
                 Output ONLY a JSON object:\n\
                 {{\"executor\": \"<identity>\", \"input\": \"<the exact input to hand it>\"}}\n\
                 The input must be self-contained: include whatever earlier \
                 results the executor needs. Use the identity verbatim."
            )),
            Message::user(format!(
                "Task: {}\n\nContext so far:\n{}",
                task.description,
                if transcript.is_empty() {
                    "(none)"
                } else {
                    &transcript
                }
            )),
        ];

        let decision =
            match llm::generate_json::<RawDecision>(self.model.as_ref(), &messages).await {
                Ok(decision) => decision,
                Err(error) => {
                    tracing::warn!(
                        task = task.index,
                        %error,
                        "router decision unusable, falling back to self"
                    );
                    return Delegation {
                        chosen: SELF_IDENTITY.to_string(),
                        literal_input: default_input,
                        fallback: true,
                    };
                }
            };

        let literal_input = match decision.input {
            Some(input) if !input.trim().is_empty() => input,
            _ => default_input.clone(),
        };

        if decision.executor == SELF_IDENTITY {
            return Delegation {
                chosen: SELF_IDENTITY.to_string(),
                literal_input,
                fallback: false,
            };
        }

        if candidates.iter().any(|d| d.identity == decision.executor) {
            Delegation {
                chosen: decision.executor,
                literal_input,
                fallback: false,
            }
        } else {
            tracing::warn!(
                task = task.index,
                invented = decision.executor,
                "router returned unknown identity, falling back to self"
            );
            Delegation {
                chosen: SELF_IDENTITY.to_string(),
                literal_input: default_input,
                fallback: true,
            }
        }
    }
}

/// Literal input used when the decision function supplies none: the task
/// description, plus the accumulated transcript when the task declared
/// dependencies on earlier results.
fn default_literal_input(task: &Task, context: &ExecutionContext) -> String {
    let transcript = context.transcript();
    if task.depends_on.is_empty() || transcript.is_empty() {
        task.description.clone()
    } else {
        format!(
            "{}\n\nResults from earlier steps:\n{}",
            task.description, transcript
        )
    }
}
