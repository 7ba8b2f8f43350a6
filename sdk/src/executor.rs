//! Executor trait and descriptor types
//!
//! An executor is a unit capable of handling one delegated task and producing
//! a textual result, possibly by further delegation. Coordinators are
//! executors too: a supervisor that plans, routes, and synthesizes over
//! sub-executors still presents the same `invoke`/`descriptor` surface, which
//! is what makes deep delegation hierarchies possible without inheritance.

use crate::errors::ExecutorFailure;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity and capability description of an executor.
///
/// The `identity` is the unique name the capability registry keys on; the
/// `capability` text is what a delegation router feeds to its decision
/// function when choosing between candidates. Keep it concrete: it is the
/// only thing a router sees about this executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorDescriptor {
    /// Unique executor name (case-sensitive, exact-match lookup)
    pub identity: String,

    /// Free-text capability description used for delegation decisions
    pub capability: String,
}

impl ExecutorDescriptor {
    /// Create a new descriptor
    pub fn new(identity: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            capability: capability.into(),
        }
    }
}

/// Trait that all executors must implement
///
/// `invoke` receives the literal input prepared by the delegation router
/// (not the raw task description) plus the accumulated context text from
/// earlier tasks in the same plan. Implementations must not assume they can
/// re-derive prior results: everything they need has to come through those
/// two arguments.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Returns the descriptor for this executor
    fn descriptor(&self) -> &ExecutorDescriptor;

    /// Handle one delegated task and produce a result
    ///
    /// A `Recoverable` failure is recorded by the caller and the plan
    /// continues; a `Fatal` failure halts the plan early with whatever has
    /// been accumulated so far.
    async fn invoke(&self, input: &str, context: &str) -> Result<String, ExecutorFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoExecutor {
        descriptor: ExecutorDescriptor,
    }

    #[async_trait]
    impl Executor for EchoExecutor {
        fn descriptor(&self) -> &ExecutorDescriptor {
            &self.descriptor
        }

        async fn invoke(&self, input: &str, _context: &str) -> Result<String, ExecutorFailure> {
            Ok(format!("echo: {input}"))
        }
    }

    #[tokio::test]
    async fn executor_trait_is_object_safe() {
        let echo: Box<dyn Executor> = Box::new(EchoExecutor {
            descriptor: ExecutorDescriptor::new("echo", "Repeats its input back."),
        });

        assert_eq!(echo.descriptor().identity, "echo");
        let result = echo.invoke("hello", "").await.unwrap();
        assert_eq!(result, "echo: hello");
    }

    #[test]
    fn descriptor_serializes_round_trip() {
        let descriptor = ExecutorDescriptor::new("tool", "Runs tools.");
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: ExecutorDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, back);
    }
}
