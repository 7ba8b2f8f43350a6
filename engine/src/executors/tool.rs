//! Tool executor
//!
//! Matches a task against a small set of built-in tools through a
//! JSON-constrained model decision, then runs the chosen tool with the
//! arguments the decision carried. A decision below the confidence floor is
//! not trusted; for arithmetic-looking input the executor falls back to
//! lifting the expression out of the text directly, so "what's the result of
//! 3*312" still computes even when the decision function misbehaves.

use crate::executors::calc;
use crate::llm::{self, Message, ModelProvider};
use async_trait::async_trait;
use regex::Regex;
use sdk::{Executor, ExecutorDescriptor, ExecutorFailure};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Decisions below this confidence are treated as "no tool"
const CONFIDENCE_FLOOR: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct ToolDecision {
    needs_tool: bool,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    arguments: serde_json::Value,
}

pub struct ToolExecutor {
    descriptor: ExecutorDescriptor,
    model: Arc<dyn ModelProvider>,
}

impl ToolExecutor {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self {
            descriptor: ExecutorDescriptor::new(
                "tool",
                "Calculations and structured operations: arithmetic \
                 expressions, adding or multiplying numbers.",
            ),
            model,
        }
    }

    async fn decide(&self, input: &str) -> Result<ToolDecision, llm::ModelError> {
        let messages = [
            Message::system(
                "You match requests against available tools.\n\
                 Tools:\n\
                 - calculate: evaluate an arithmetic expression. \
                 arguments: {\"expression\": \"3*312\"}\n\
                 - add: add two numbers. arguments: {\"a\": 1, \"b\": 2}\n\
                 - multiply: multiply two numbers. arguments: {\"a\": 3, \"b\": 4}\n\
                 Output ONLY a JSON object:\n\
                 {\"needs_tool\": true|false, \"tool_name\": \"<name or null>\", \
                 \"confidence\": 0.0-1.0, \"arguments\": {...}}\n\
                 needs_tool is false when no tool fits.",
            ),
            Message::user(input),
        ];

        llm::generate_json::<ToolDecision>(self.model.as_ref(), &messages).await
    }

    fn run_tool(&self, decision: &ToolDecision) -> Result<String, ExecutorFailure> {
        let name = decision.tool_name.as_deref().unwrap_or("");
        match name {
            "calculate" => {
                let expression = decision
                    .arguments
                    .get("expression")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        ExecutorFailure::recoverable("calculate tool requires an expression")
                    })?;
                let value = calc::evaluate(expression)
                    .map_err(|e| ExecutorFailure::recoverable(e.to_string()))?;
                Ok(calc::format_number(value))
            }
            "add" | "multiply" => {
                let a = number_argument(&decision.arguments, "a")?;
                let b = number_argument(&decision.arguments, "b")?;
                let value = if name == "add" { a + b } else { a * b };
                Ok(calc::format_number(value))
            }
            other => Err(ExecutorFailure::recoverable(format!(
                "unknown tool '{other}'"
            ))),
        }
    }
}

fn number_argument(arguments: &serde_json::Value, key: &str) -> Result<f64, ExecutorFailure> {
    arguments.get(key).and_then(|v| v.as_f64()).ok_or_else(|| {
        ExecutorFailure::recoverable(format!("missing numeric argument '{key}'"))
    })
}

/// Lift an arithmetic expression out of free text, if one is there.
///
/// Accepts only candidates that contain a digit and an operator, so plain
/// prose never turns into a bogus calculation.
fn extract_expression(input: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"[-+*/().\d\s]+").unwrap_or_else(|_| unreachable!("static pattern"))
    });

    pattern
        .find_iter(input)
        .map(|m| m.as_str().trim())
        .filter(|candidate| {
            candidate.chars().any(|c| c.is_ascii_digit())
                && candidate.chars().any(|c| matches!(c, '+' | '-' | '*' | '/'))
        })
        .max_by_key(|candidate| candidate.len())
        .map(str::to_string)
}

#[async_trait]
impl Executor for ToolExecutor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, input: &str, _context: &str) -> Result<String, ExecutorFailure> {
        match self.decide(input).await {
            Ok(decision) if decision.needs_tool && decision.confidence >= CONFIDENCE_FLOOR => {
                debug!(
                    tool = decision.tool_name.as_deref().unwrap_or(""),
                    confidence = decision.confidence,
                    "running tool"
                );
                self.run_tool(&decision)
            }
            Ok(decision) => {
                debug!(
                    needs_tool = decision.needs_tool,
                    confidence = decision.confidence,
                    "decision below confidence floor"
                );
                self.fallback(input, "no tool matched with enough confidence")
            }
            Err(error) => {
                warn!(%error, "tool decision unusable, trying expression fallback");
                self.fallback(input, &error.to_string())
            }
        }
    }
}

impl ToolExecutor {
    fn fallback(&self, input: &str, reason: &str) -> Result<String, ExecutorFailure> {
        if let Some(expression) = extract_expression(input) {
            if let Ok(value) = calc::evaluate(&expression) {
                debug!(expression, "expression fallback computed");
                return Ok(calc::format_number(value));
            }
        }
        Err(ExecutorFailure::recoverable(reason.to_string()))
    }
}
