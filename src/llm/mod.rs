//! Language model capability used by the agent and the vocabulary extractor.

mod openai;

pub use openai::OpenAIChatModel;

use crate::agent::Turn;
use crate::error::Result;
use async_trait::async_trait;

/// Trait for chat-style text generation.
///
/// Implementations receive the whole conversation and return the assistant's
/// text. An empty string is a valid (empty) reply, not an error.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send the conversation and return the assistant's reply.
    async fn send(&self, conversation: &[Turn]) -> Result<String>;

    /// Model name, for logging.
    fn name(&self) -> &str;
}
