//! Error types for Shabda.

use thiserror::Error;

/// Library-level error type for Shabda operations.
#[derive(Error, Debug)]
pub enum ShabdaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    /// The model client answered with something other than a chat reply.
    #[error("Unexpected response from language model: {0}")]
    ClientProtocol(String),

    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    #[error("Tool Unknown: {0}")]
    UnknownTool(String),

    #[error("{tool} is missing required argument '{argument}'")]
    MissingArgument { tool: String, argument: String },

    #[error("{tool} failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Web search failed: {0}")]
    Search(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Shabda operations.
pub type Result<T> = std::result::Result<T, ShabdaError>;
