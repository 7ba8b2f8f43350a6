//! Execution context
//!
//! Append-only record of what happened while a plan ran: one entry per task
//! in execution order, including failures. Exclusively owned by the running
//! query; nothing here is shared across sessions.

use serde::Serialize;

/// How one task ended
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum TaskOutcome {
    /// The executor produced a usable result
    Success(String),

    /// The executor failed; the message is the error marker recorded in
    /// place of a result
    Failure(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }
}

/// One completed (or failed) task slot
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    /// The task description from the plan
    pub description: String,

    /// Identity of the executor that handled it (the self identity when the
    /// supervisor executed directly)
    pub executor: String,

    /// Result or error marker
    pub outcome: TaskOutcome,

    /// True when the router's decision was unusable and the supervisor
    /// self-executed as a fallback
    pub router_fallback: bool,
}

/// Accumulated context for one query resolution
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Free-text context seeded before the first task (e.g. conversation
    /// history handed in by the session layer)
    seed: String,

    entries: Vec<TaskRecord>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from pre-existing context text (conversation history, or the
    /// parent's context when a supervisor runs as a sub-executor)
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            entries: Vec::new(),
        }
    }

    /// Append one task record; records are never mutated afterwards
    pub fn push(&mut self, record: TaskRecord) {
        self.entries.push(record);
    }

    /// All records in execution order
    pub fn entries(&self) -> &[TaskRecord] {
        &self.entries
    }

    /// Records of successfully completed tasks, with their plan positions
    pub fn successes(&self) -> impl Iterator<Item = (usize, &TaskRecord)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, record)| record.outcome.is_success())
    }

    /// Render everything a later task (or the synthesizer) may rely on.
    ///
    /// Failed slots appear as failure markers so downstream prompts know a
    /// step was attempted, without fabricating a result for it.
    pub fn transcript(&self) -> String {
        let mut text = String::new();

        if !self.seed.is_empty() {
            text.push_str(&self.seed);
            text.push('\n');
        }

        for (index, record) in self.entries.iter().enumerate() {
            match &record.outcome {
                TaskOutcome::Success(result) => {
                    text.push_str(&format!(
                        "Task {} ({}): {}\nResult: {}\n",
                        index + 1,
                        record.executor,
                        record.description,
                        result
                    ));
                }
                TaskOutcome::Failure(error) => {
                    text.push_str(&format!(
                        "Task {} ({}): {}\n[failed: {}]\n",
                        index + 1,
                        record.executor,
                        record.description,
                        error
                    ));
                }
            }
        }

        text
    }

    /// The seed text the context was created with
    pub fn seed(&self) -> &str {
        &self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(description: &str, executor: &str, result: &str) -> TaskRecord {
        TaskRecord {
            description: description.to_string(),
            executor: executor.to_string(),
            outcome: TaskOutcome::Success(result.to_string()),
            router_fallback: false,
        }
    }

    #[test]
    fn transcript_includes_seed_and_results() {
        let mut context = ExecutionContext::with_seed("User previously said their name is Jun.");
        context.push(success("greet the user", "conversational", "Hello Jun!"));

        let transcript = context.transcript();
        assert!(transcript.contains("name is Jun"));
        assert!(transcript.contains("Task 1 (conversational)"));
        assert!(transcript.contains("Hello Jun!"));
    }

    #[test]
    fn failures_are_marked_not_fabricated() {
        let mut context = ExecutionContext::new();
        context.push(TaskRecord {
            description: "search docs".to_string(),
            executor: "document".to_string(),
            outcome: TaskOutcome::Failure("backend offline".to_string()),
            router_fallback: false,
        });

        let transcript = context.transcript();
        assert!(transcript.contains("[failed: backend offline]"));
        assert!(!transcript.contains("Result:"));
    }

    #[test]
    fn successes_skip_failed_slots() {
        let mut context = ExecutionContext::new();
        context.push(success("a", "tool", "1"));
        context.push(TaskRecord {
            description: "b".to_string(),
            executor: "tool".to_string(),
            outcome: TaskOutcome::Failure("boom".to_string()),
            router_fallback: false,
        });
        context.push(success("c", "tool", "3"));

        let indices: Vec<usize> = context.successes().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
