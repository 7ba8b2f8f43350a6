//! Error types and handling
//!
//! Failure types shared between the engine and executors. The central
//! distinction is recoverable vs fatal: a recoverable failure of one task is
//! recorded in the execution context and the plan continues, while a fatal
//! failure (a result that cannot be interpreted at all) halts the plan early
//! and hands the partial context to the synthesizer.

use thiserror::Error;

/// Failure produced by an executor invocation
#[derive(Debug, Error)]
pub enum ExecutorFailure {
    /// The task failed but later tasks may still succeed
    #[error("executor failed: {0}")]
    Recoverable(String),

    /// The executor produced something that cannot be interpreted;
    /// the plan must halt early
    #[error("executor failed fatally: {0}")]
    Fatal(String),
}

impl ExecutorFailure {
    /// Create a recoverable failure
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::Recoverable(message.into())
    }

    /// Create a fatal failure
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    /// Returns true if this failure must halt the running plan
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_flag_matches_variant() {
        assert!(ExecutorFailure::fatal("garbled response").is_fatal());
        assert!(!ExecutorFailure::recoverable("timeout").is_fatal());
    }

    #[test]
    fn failure_messages_render() {
        let failure = ExecutorFailure::recoverable("search backend offline");
        assert_eq!(failure.to_string(), "executor failed: search backend offline");

        let fatal = ExecutorFailure::fatal("malformed payload");
        assert_eq!(fatal.to_string(), "executor failed fatally: malformed payload");
    }
}
