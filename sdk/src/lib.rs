//! Maestro SDK
//!
//! Shared contract crate for Maestro components. Defines the `Executor`
//! trait that every task-executor (including coordinators) implements,
//! together with the descriptor and failure types the engine's supervisor
//! works against.

/// Executor trait and descriptor types
pub mod executor;

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use errors::ExecutorFailure;
pub use executor::{Executor, ExecutorDescriptor};
