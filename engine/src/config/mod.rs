//! Configuration management
//!
//! Loading, validation, and defaults for the Maestro configuration.
//! Configuration is stored in TOML format at ~/.maestro/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: data directory, log level
//! - **llm**: model provider settings
//! - **memory**: conversation budget for the summarization controller
//! - **retrieval**: document search settings
//!
//! Paths support `~` expansion; the data directory is created on first load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Model provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Memory-budget controller configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Document retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory holding the SQLite database (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which provider to use: "openai" or "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Memory-budget controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Raw-text budget in characters; exceeding it triggers summarization
    #[serde(default = "default_budget_chars")]
    pub budget_chars: usize,

    /// How many of the most recent turns stay raw after a compaction
    #[serde(default = "default_recent_tail_turns")]
    pub recent_tail_turns: usize,
}

/// Document retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum number of passages handed to the conversational executor
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum relevance score for a passage to be used
    #[serde(default = "default_score_gate")]
    pub score_gate: f64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.maestro")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_budget_chars() -> usize {
    3200
}

fn default_recent_tail_turns() -> usize {
    2
}

fn default_top_k() -> usize {
    4
}

fn default_score_gate() -> f64 {
    0.0
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_openai_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            budget_chars: default_budget_chars(),
            recent_tail_turns: default_recent_tail_turns(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_gate: default_score_gate(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LlmConfig::default(),
            memory: MemoryConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.maestro/config.toml),
    /// creating a default file if none exists.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: Config = toml::from_str(&contents).context("Failed to parse config")?;
        config.validate_and_process()?;
        Ok(config)
    }

    fn create_default(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let mut config = Config::default();
        config.validate_and_process()?;

        let toml_text = toml::to_string_pretty(&config).context("Failed to serialize config")?;
        fs::write(path, toml_text).context("Failed to write default config")?;

        tracing::info!("Created default configuration at {}", path.display());
        Ok(config)
    }

    /// Default config file path (~/.maestro/config.toml)
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".maestro").join("config.toml"))
    }

    /// Path of the SQLite database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join("maestro.db")
    }

    fn validate_and_process(&mut self) -> Result<()> {
        self.core.data_dir = expand_tilde(&self.core.data_dir)?;
        fs::create_dir_all(&self.core.data_dir).with_context(|| {
            format!(
                "Failed to create data directory {}",
                self.core.data_dir.display()
            )
        })?;

        if self.llm.provider != "openai" && self.llm.provider != "ollama" {
            anyhow::bail!("unknown llm provider '{}'", self.llm.provider);
        }

        if self.memory.budget_chars == 0 {
            anyhow::bail!("memory.budget_chars must be greater than zero");
        }

        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~") {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        let rest = rest.trim_start_matches('/');
        Ok(home.join(rest))
    } else {
        Ok(path.to_path_buf())
    }
}
