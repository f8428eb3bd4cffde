//! Configuration settings for Shabda.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub agent: AgentSettings,
    pub search: SearchSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error) used when no `-v` is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.shabda".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Where the language model runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI cloud API.
    #[default]
    OpenAI,
    /// Local Ollama server through its OpenAI-compatible endpoint.
    Ollama,
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "cloud" => Ok(ModelProvider::OpenAI),
            "ollama" | "local" => Ok(ModelProvider::Ollama),
            _ => Err(format!("Unknown model provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelProvider::OpenAI => write!(f, "openai"),
            ModelProvider::Ollama => write!(f, "ollama"),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model provider (openai, ollama).
    pub provider: ModelProvider,
    /// Model name. Empty means the provider default.
    pub model: String,
    /// Override for the API base URL.
    pub api_base: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: ModelProvider::OpenAI,
            model: String::new(),
            api_base: None,
            temperature: 0.2,
            timeout_secs: 300,
        }
    }
}

impl ModelSettings {
    /// Model name, falling back to the provider default.
    pub fn resolved_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }
        match self.provider {
            ModelProvider::OpenAI => "gpt-4o-mini".to_string(),
            ModelProvider::Ollama => "mistral".to_string(),
        }
    }

    /// API base URL, falling back to the local Ollama endpoint for that provider.
    pub fn resolved_api_base(&self) -> Option<String> {
        match (&self.api_base, self.provider) {
            (Some(base), _) if !base.is_empty() => Some(base.clone()),
            (_, ModelProvider::Ollama) => Some("http://localhost:11434/v1".to_string()),
            _ => None,
        }
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of model turns before the recovery path runs.
    pub max_turns: usize,
    /// Turn index from which unparsable replies trigger automatic recovery.
    pub auto_recovery_threshold: usize,
    /// Consecutive model client failures tolerated before giving up on the model.
    pub max_client_failures: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_turns: 10,
            auto_recovery_threshold: 3,
            max_client_failures: 3,
        }
    }
}

/// Web search backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    /// SerpAPI Google results (requires an API key).
    #[default]
    SerpApi,
    /// DuckDuckGo HTML results (no key).
    DuckDuckGo,
}

impl std::fmt::Display for SearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchProvider::SerpApi => write!(f, "serpapi"),
            SearchProvider::DuckDuckGo => write!(f, "duckduckgo"),
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Search provider (serpapi, duckduckgo).
    pub provider: SearchProvider,
    /// SerpAPI key. Falls back to the SERP_API_KEY environment variable.
    pub api_key: Option<String>,
    /// Default number of results per search.
    pub max_results: usize,
    /// Timeout for search and page requests in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: SearchProvider::SerpApi,
            api_key: None,
            max_results: 5,
            timeout_secs: 15,
        }
    }
}

impl SearchSettings {
    /// API key from config or environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("SERP_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Output storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for lyrics text files.
    pub lyrics_dir: String,
    /// Directory for vocabulary JSON files.
    pub vocabulary_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            lyrics_dir: "~/.shabda/outputs/lyrics".to_string(),
            vocabulary_dir: "~/.shabda/outputs/vocabulary".to_string(),
        }
    }
}

/// HTTP API server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ShabdaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shabda")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Tracing filter for the crate: `-v` counts win over `general.log_level`.
    pub fn log_filter(&self, verbose: u8) -> String {
        let level = match verbose {
            0 => self.general.log_level.trim(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("shabda={}", if level.is_empty() { "warn" } else { level })
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded lyrics directory path.
    pub fn lyrics_dir(&self) -> PathBuf {
        Self::expand_path(&self.storage.lyrics_dir)
    }

    /// Get the expanded vocabulary directory path.
    pub fn vocabulary_dir(&self) -> PathBuf {
        Self::expand_path(&self.storage.vocabulary_dir)
    }
}
