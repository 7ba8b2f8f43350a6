//! Supervisor orchestration
//!
//! The supervising coordinator: decomposes a query into an ordered task
//! list, selects an executor for each task from the capability registry,
//! propagates accumulating context between tasks, and synthesizes a final
//! answer. The supervisor is itself an [`Executor`], so one supervisor can
//! be registered under another and delegation chains can go arbitrarily
//! deep through the same small interface.

pub mod context;
pub mod error;
pub mod planner;
pub mod registry;
pub mod router;
pub mod synthesizer;

pub use context::{ExecutionContext, TaskOutcome, TaskRecord};
pub use error::{PlanningError, RegistryError, SupervisorError};
pub use planner::{Plan, Task, TaskPlanner};
pub use registry::{CapabilityRegistry, RegistrationPolicy};
pub use router::{Delegation, DelegationRouter, SELF_IDENTITY};
pub use synthesizer::{Answer, ResultSynthesizer, SourceRef};

use crate::llm::{Message, ModelProvider};
use async_trait::async_trait;
use sdk::{Executor, ExecutorDescriptor, ExecutorFailure};
use std::sync::Arc;
use tracing::{info, warn};

/// The supervising coordinator
pub struct Supervisor {
    descriptor: ExecutorDescriptor,
    registry: Arc<CapabilityRegistry>,
    planner: TaskPlanner,
    router: DelegationRouter,
    synthesizer: ResultSynthesizer,
    model: Arc<dyn ModelProvider>,
}

impl Supervisor {
    /// Create a top-level supervisor over the given registry.
    ///
    /// Its identity is the reserved [`SELF_IDENTITY`]. A supervisor meant to
    /// be registered under another supervisor needs [`Supervisor::named`]
    /// instead: to its parent's router, [`SELF_IDENTITY`] always means "the
    /// supervisor running the current plan", so a nested one is only
    /// routable under a distinct name.
    pub fn new(model: Arc<dyn ModelProvider>, registry: Arc<CapabilityRegistry>) -> Self {
        Self::named(
            SELF_IDENTITY,
            "Coordinates sub-executors: plans tasks, delegates them, and \
             synthesizes a final answer.",
            model,
            registry,
        )
    }

    /// Create a supervisor with its own identity and capability text, for
    /// registration as a sub-executor of another supervisor.
    pub fn named(
        identity: impl Into<String>,
        capability: impl Into<String>,
        model: Arc<dyn ModelProvider>,
        registry: Arc<CapabilityRegistry>,
    ) -> Self {
        Self {
            descriptor: ExecutorDescriptor::new(identity, capability),
            registry: Arc::clone(&registry),
            planner: TaskPlanner::new(Arc::clone(&model)),
            router: DelegationRouter::new(Arc::clone(&model)),
            synthesizer: ResultSynthesizer::new(Arc::clone(&model)),
            model,
        }
    }

    /// The registry this supervisor delegates into
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Resolve one query end to end: plan, run, synthesize.
    ///
    /// `seed` is pre-existing context text (conversation history, or the
    /// parent's transcript when this supervisor runs as a sub-executor).
    pub async fn resolve(
        &self,
        query: &str,
        seed: &str,
    ) -> Result<(Answer, ExecutionContext), SupervisorError> {
        let plan = self.planner.plan(query).await?;
        info!(tasks = plan.tasks.len(), "plan ready");

        let context = self.run(&plan, ExecutionContext::with_seed(seed)).await;

        let answer = self
            .synthesizer
            .synthesize(query, &context)
            .await
            .map_err(SupervisorError::Synthesis)?;

        Ok((answer, context))
    }

    /// Drive the plan task by task, strictly in order.
    ///
    /// Every invocation's outcome is recorded in the context before the next
    /// task runs, so a partial result set is always available for synthesis.
    /// A fatal executor failure halts the loop early; anything else is
    /// recorded and skipped over.
    async fn run(&self, plan: &Plan, mut context: ExecutionContext) -> ExecutionContext {
        for task in &plan.tasks {
            let candidates = self.registry.list_all();
            let delegation = self.router.select(task, &context, &candidates).await;

            if delegation.fallback {
                warn!(task = task.index, "router fallback, supervisor self-executes");
            }
            info!(task = task.index, executor = %delegation.chosen, "dispatching task");

            let (executor_identity, result) = if delegation.chosen == SELF_IDENTITY {
                (
                    SELF_IDENTITY.to_string(),
                    self.self_execute(&delegation.literal_input, &context).await,
                )
            } else {
                match self.registry.lookup(&delegation.chosen) {
                    Some(executor) => (
                        delegation.chosen.clone(),
                        executor
                            .invoke(&delegation.literal_input, &context.transcript())
                            .await,
                    ),
                    None => {
                        // Deregistered between listing and dispatch; same
                        // treatment as an invented identity.
                        warn!(
                            task = task.index,
                            identity = %delegation.chosen,
                            "chosen executor vanished, supervisor self-executes"
                        );
                        (
                            SELF_IDENTITY.to_string(),
                            self.self_execute(&delegation.literal_input, &context).await,
                        )
                    }
                }
            };

            match result {
                Ok(result_text) => {
                    context.push(TaskRecord {
                        description: task.description.clone(),
                        executor: executor_identity,
                        outcome: TaskOutcome::Success(result_text),
                        router_fallback: delegation.fallback,
                    });
                }
                Err(failure) => {
                    warn!(task = task.index, %failure, "task failed");
                    let fatal = failure.is_fatal();
                    context.push(TaskRecord {
                        description: task.description.clone(),
                        executor: executor_identity,
                        outcome: TaskOutcome::Failure(failure.to_string()),
                        router_fallback: delegation.fallback,
                    });
                    if fatal {
                        warn!(task = task.index, "fatal failure, halting plan early");
                        break;
                    }
                }
            }
        }

        context
    }

    /// Execute a task directly through the model collaborator, used when no
    /// sub-executor fits (or the router fell back).
    async fn self_execute(
        &self,
        input: &str,
        context: &ExecutionContext,
    ) -> Result<String, ExecutorFailure> {
        let transcript = context.transcript();
        let messages = [
            Message::system(
                "You are a capable assistant completing one task directly. \
                 Use the context if relevant and answer concisely.",
            ),
            Message::user(if transcript.is_empty() {
                input.to_string()
            } else {
                format!("Context:\n{transcript}\nTask: {input}")
            }),
        ];

        self.model
            .generate(&messages)
            .await
            .map_err(|e| ExecutorFailure::recoverable(format!("self-execution failed: {e}")))
    }
}

#[async_trait]
impl Executor for Supervisor {
    fn descriptor(&self) -> &ExecutorDescriptor {
        &self.descriptor
    }

    /// A supervisor invoked as a sub-executor runs its own plan/route/loop
    /// over its own registry and returns the synthesized answer.
    async fn invoke(&self, input: &str, context: &str) -> Result<String, ExecutorFailure> {
        let (answer, _context) = self
            .resolve(input, context)
            .await
            .map_err(|e| ExecutorFailure::recoverable(e.to_string()))?;
        Ok(answer.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelError, Result as ModelResult};
    use std::sync::Mutex;

    /// Replays a scripted response sequence; panics are confined to tests.
    struct Scripted {
        responses: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn with(responses: &[&str]) -> Arc<dyn ModelProvider> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _messages: &[Message]) -> ModelResult<String> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ModelError::Unknown("script exhausted".to_string()))
        }
    }

    struct Failing {
        descriptor: ExecutorDescriptor,
        fatal: bool,
    }

    #[async_trait]
    impl Executor for Failing {
        fn descriptor(&self) -> &ExecutorDescriptor {
            &self.descriptor
        }

        async fn invoke(&self, _input: &str, _context: &str) -> Result<String, ExecutorFailure> {
            if self.fatal {
                Err(ExecutorFailure::fatal("unreadable response"))
            } else {
                Err(ExecutorFailure::recoverable("flaky backend"))
            }
        }
    }

    struct Echo {
        descriptor: ExecutorDescriptor,
    }

    #[async_trait]
    impl Executor for Echo {
        fn descriptor(&self) -> &ExecutorDescriptor {
            &self.descriptor
        }

        async fn invoke(&self, input: &str, _context: &str) -> Result<String, ExecutorFailure> {
            Ok(format!("done: {input}"))
        }
    }

    #[tokio::test]
    async fn recoverable_failure_does_not_stop_the_plan() {
        let registry = Arc::new(CapabilityRegistry::new());
        registry
            .register(Arc::new(Failing {
                descriptor: ExecutorDescriptor::new("flaky", "Fails recoverably."),
                fatal: false,
            }))
            .unwrap();
        registry
            .register(Arc::new(Echo {
                descriptor: ExecutorDescriptor::new("echo", "Echoes."),
            }))
            .unwrap();

        let model = Scripted::with(&[
            // plan: two tasks
            r#"{"tasks": [{"description": "first", "depends_on": []},
                          {"description": "second", "depends_on": []}]}"#,
            // route task 1 -> flaky
            r#"{"executor": "flaky", "input": "first"}"#,
            // route task 2 -> echo
            r#"{"executor": "echo", "input": "second"}"#,
            // synthesis
            "final answer",
        ]);

        let supervisor = Supervisor::new(model, registry);
        let (answer, context) = supervisor.resolve("two things", "").await.unwrap();

        assert_eq!(context.entries().len(), 2);
        assert!(!context.entries()[0].outcome.is_success());
        assert!(context.entries()[1].outcome.is_success());
        // only the surviving task is attributed
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].task_index, 1);
    }

    #[tokio::test]
    async fn fatal_failure_halts_early_with_partial_context() {
        let registry = Arc::new(CapabilityRegistry::new());
        registry
            .register(Arc::new(Failing {
                descriptor: ExecutorDescriptor::new("broken", "Fails fatally."),
                fatal: true,
            }))
            .unwrap();

        let model = Scripted::with(&[
            r#"{"tasks": [{"description": "first", "depends_on": []},
                          {"description": "second", "depends_on": []},
                          {"description": "third", "depends_on": []}]}"#,
            r#"{"executor": "broken", "input": "first"}"#,
            // synthesis over the partial context
            "partial answer",
        ]);

        let supervisor = Supervisor::new(model, registry);
        let (answer, context) = supervisor.resolve("three things", "").await.unwrap();

        // only the fatal first task was attempted
        assert_eq!(context.entries().len(), 1);
        assert!(answer.sources.is_empty());
        assert_eq!(answer.text, "partial answer");
    }

    #[tokio::test]
    async fn supervisor_composes_as_a_sub_executor() {
        // inner supervisor with its own echo executor
        let inner_registry = Arc::new(CapabilityRegistry::new());
        inner_registry
            .register(Arc::new(Echo {
                descriptor: ExecutorDescriptor::new("echo", "Echoes."),
            }))
            .unwrap();
        let inner_model = Scripted::with(&[
            r#"{"tasks": [{"description": "inner task", "depends_on": []}]}"#,
            r#"{"executor": "echo", "input": "inner task"}"#,
            "inner synthesized",
        ]);
        let inner = Supervisor::named(
            "research",
            "Coordinates its own executors to answer research tasks.",
            inner_model,
            inner_registry,
        );

        // outer supervisor delegates to the inner one through Executor
        let outer_registry = Arc::new(CapabilityRegistry::new());
        outer_registry.register(Arc::new(inner)).unwrap();
        let outer_model = Scripted::with(&[
            r#"{"tasks": [{"description": "delegate down", "depends_on": []}]}"#,
            r#"{"executor": "research", "input": "delegate down"}"#,
            "outer synthesized",
        ]);
        let outer = Supervisor::new(outer_model, outer_registry);

        let (answer, context) = outer.resolve("nested", "").await.unwrap();
        assert_eq!(answer.text, "outer synthesized");
        assert_eq!(context.entries().len(), 1);
        // the task went to the nested supervisor, not to self-execution
        assert_eq!(context.entries()[0].executor, "research");
        assert_eq!(
            context.entries()[0].outcome,
            TaskOutcome::Success("inner synthesized".to_string())
        );
    }

    #[tokio::test]
    async fn nested_supervisor_is_routable_while_self_identity_stays_reserved() {
        let inner = Supervisor::named(
            "research",
            "Coordinates its own executors to answer research tasks.",
            Scripted::with(&[]),
            Arc::new(CapabilityRegistry::new()),
        );
        assert_eq!(inner.descriptor().identity, "research");

        let outer = Supervisor::new(Scripted::with(&[]), Arc::new(CapabilityRegistry::new()));
        assert_eq!(outer.descriptor().identity, SELF_IDENTITY);
    }
}
