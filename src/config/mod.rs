//! Configuration module for Shabda.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, ExtractionPrompts, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, ModelProvider, ModelSettings, PromptSettings,
    SearchProvider, SearchSettings, ServerSettings, Settings, StorageSettings,
};
