//! Configuration
//!
//! Centralized configuration loading for the chat client, supporting a
//! TOML file at `~/.config/babbel/config.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! endpoint = "http://localhost:5001/api/ai"
//! system_prompt = "You are a concise cooking assistant."
//! streaming = true
//! max_history_messages = 20
//!
//! [typing]
//! min_delay_ms = 2
//! max_delay_ms = 8
//! scale = 0.3
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animator::TypingConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Resolved chat client configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the chat API.
    pub endpoint: String,
    /// Optional system prompt sent with every request.
    pub system_prompt: Option<String>,
    /// Whether to use the streaming endpoint.
    pub streaming: bool,
    /// How many completed messages to send as history.
    pub max_history_messages: usize,
    /// Typing animation cadence bounds.
    pub typing: TypingConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5001/api/ai".to_string(),
            system_prompt: None,
            streaming: true,
            max_history_messages: 20,
            typing: TypingConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Load from the default file location plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match default_config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file (no environment overrides).
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ChatToml = toml::from_str(&contents)?;

        let mut config = Self::default();
        config.merge_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a parsed TOML file.
    fn merge_file(&mut self, file: ChatToml) {
        if let Some(endpoint) = file.endpoint {
            self.endpoint = endpoint;
        }
        if file.system_prompt.is_some() {
            self.system_prompt = file.system_prompt;
        }
        if let Some(streaming) = file.streaming {
            self.streaming = streaming;
        }
        if let Some(max) = file.max_history_messages {
            self.max_history_messages = max;
        }
        if let Some(ms) = file.typing.min_delay_ms {
            self.typing.min_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.typing.max_delay_ms {
            self.typing.max_delay = Duration::from_millis(ms);
        }
        if let Some(scale) = file.typing.scale {
            self.typing.scale = scale;
        }
    }

    /// Overlay values from environment variables.
    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("BABBEL_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(prompt) = std::env::var("BABBEL_SYSTEM_PROMPT") {
            self.system_prompt = Some(prompt);
        }
        if let Ok(value) = std::env::var("BABBEL_STREAMING") {
            self.streaming = parse_bool(&value);
        }
        if let Some(max) = std::env::var("BABBEL_MAX_HISTORY")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_history_messages = max;
        }
    }

    /// Reject configurations the animator cannot honor.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::ValidationError("endpoint is empty".to_string()));
        }
        if self.typing.min_delay > self.typing.max_delay {
            return Err(ConfigError::ValidationError(format!(
                "typing.min_delay_ms ({:?}) exceeds typing.max_delay_ms ({:?})",
                self.typing.min_delay, self.typing.max_delay
            )));
        }
        if self.typing.scale < 0.0 {
            return Err(ConfigError::ValidationError(
                "typing.scale must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file location:
/// `$XDG_CONFIG_HOME/babbel/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("babbel").join("config.toml"))
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.to_lowercase() == "true"
}

/// Top-level TOML configuration structure. Every field is optional;
/// absent fields keep their defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ChatToml {
    endpoint: Option<String>,
    system_prompt: Option<String>,
    streaming: Option<bool>,
    max_history_messages: Option<usize>,
    typing: TypingToml,
}

/// Typing section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct TypingToml {
    min_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    scale: Option<f64>,
}
