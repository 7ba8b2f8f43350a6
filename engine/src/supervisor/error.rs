//! Supervisor error taxonomy
//!
//! Propagation policy: a failure local to one task never aborts the whole
//! query unless the executor flagged it fatal; planning failures at the top
//! level abort the query with a user-visible apology while full diagnostics
//! go to the log. Router trouble is never fatal at all: the supervisor falls
//! back to executing the task itself.

use crate::llm::ModelError;
use thiserror::Error;

/// Errors from the task planner
#[derive(Debug, Error)]
pub enum PlanningError {
    /// Decomposition produced zero tasks
    #[error("planner produced no tasks")]
    EmptyPlan,

    /// Declared dependencies contain a cycle
    #[error("cyclic dependency involving task {0}")]
    CyclicDependency(usize),

    /// A task depends on an index outside the emitted list
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: usize, dependency: usize },

    /// The model collaborator failed outright
    #[error("model error during planning: {0}")]
    Model(#[from] ModelError),
}

/// Errors from the capability registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An executor with this identity is already registered and the policy
    /// forbids silent shadowing
    #[error("executor '{0}' is already registered")]
    DuplicateRegistration(String),

    /// No executor registered under this identity
    #[error("executor '{0}' is not registered")]
    NotFound(String),
}

/// Top-level supervisor errors surfaced by `resolve`
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// Synthesis could not produce an answer at all
    #[error("synthesis failed: {0}")]
    Synthesis(#[source] ModelError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
