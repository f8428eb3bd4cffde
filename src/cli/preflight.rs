//! Pre-flight checks before contacting the language model.
//!
//! Validates that required configuration is available before starting a run
//! that would otherwise fail on its first model call.

use crate::config::{ModelProvider, Settings};
use crate::error::{Result, ShabdaError};

/// Run pre-flight checks for an agent run.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(settings: &Settings) -> Result<()> {
    match settings.model.provider {
        ModelProvider::OpenAI => check_api_key(),
        // A local server needs no credentials
        ModelProvider::Ollama => Ok(()),
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(ShabdaError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...' or use provider = \"ollama\"".to_string(),
        )),
        Err(_) => Err(ShabdaError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...' or use provider = \"ollama\"".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_model_needs_no_key() {
        let mut settings = Settings::default();
        settings.model.provider = ModelProvider::Ollama;
        assert!(check(&settings).is_ok());
    }
}
