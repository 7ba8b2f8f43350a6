//! Maestro Engine Library
//!
//! This library provides the core functionality of the Maestro assistant
//! engine: the supervising coordinator (planning, delegation, execution,
//! synthesis), the memory-budget controller, model providers, retrieval,
//! and SQLite persistence. It is used by both the main binary and
//! integration tests.

/// Configuration management module
pub mod config;

/// Database persistence module
pub mod db;

/// Model provider abstraction layer
pub mod llm;

/// Document retrieval abstraction
pub mod retrieval;

/// Supervisor orchestration module
pub mod supervisor;

/// Memory-budget controller
pub mod memory;

/// Built-in executors
pub mod executors;

/// Session-facing assistant (process boundary)
pub mod assistant;

/// Startup wiring for built-in executors and collaborators
pub mod bootstrap;

/// Telemetry and observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
