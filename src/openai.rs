//! OpenAI-compatible client configuration.
//!
//! The same client talks to the OpenAI API or to a local Ollama server,
//! which exposes the chat completions API under `/v1`.

use crate::config::{ModelProvider, ModelSettings};
use crate::error::{Result, ShabdaError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for model requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Ollama ignores the key but async-openai always sends one.
const OLLAMA_API_KEY: &str = "ollama";

/// Create a client for the configured provider.
pub fn create_client(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    let timeout = match settings.timeout_secs {
        0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        secs => Duration::from_secs(secs),
    };

    let mut config = OpenAIConfig::default();
    if settings.provider == ModelProvider::Ollama {
        config = config.with_api_key(OLLAMA_API_KEY);
    }
    if let Some(base) = settings.resolved_api_base() {
        config = config.with_api_base(base);
    }

    create_client_with_timeout(config, timeout)
}

/// Create a client with a custom timeout.
pub fn create_client_with_timeout(
    config: OpenAIConfig,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ShabdaError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
