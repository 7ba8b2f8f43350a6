// Maestro Conversational Assistant
// Main entry point for the maestro binary

use clap::Parser;
use maestro_engine::cli::{Cli, Command};
use maestro_engine::config::Config;
use maestro_engine::handlers::{
    handle_ask, handle_chat, handle_history, handle_ingest, handle_status, OutputFormat,
};
use maestro_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Basic telemetry first, before config is loaded
    init_telemetry();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with the config-driven log level
    // (only takes effect if RUST_LOG env var is not set)
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    match cli.command {
        Command::Ask { query, session } => handle_ask(query, session, &config, format).await,
        Command::Chat { session } => handle_chat(session, &config).await,
        Command::History { session } => handle_history(session, &config, format).await,
        Command::Ingest { path, id } => handle_ingest(path, id, &config, format).await,
        Command::Status => handle_status(&config, format).await,
    }
}
