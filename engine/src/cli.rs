//! CLI interface for Maestro
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for the assistant.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Maestro Conversational Assistant
///
/// A supervising assistant that decomposes requests into tasks, delegates
/// them to specialized executors, and keeps long conversations inside a
/// fixed memory budget.
#[derive(Parser, Debug)]
#[command(name = "maestro")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask one question and print the answer
    Ask {
        /// The question or request
        query: String,

        /// Session to continue (default: a fresh session)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// Session to continue (default: a fresh session)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Show a session's stored history and memory state
    History {
        /// Session id
        session: String,
    },

    /// Add a document to the knowledge base
    Ingest {
        /// Path of the file to ingest
        path: PathBuf,

        /// Stable id for the document (default: the file name)
        #[arg(long)]
        id: Option<String>,
    },

    /// Show configuration, provider availability, and store counts
    Status,
}
