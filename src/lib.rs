//! Shabda - Marathi song vocabulary agent
//!
//! Finds lyrics for a Marathi song and turns them into a vocabulary list for
//! language practice.
//!
//! The name "Shabda" is the Marathi (and Sanskrit) word for "word."
//!
//! # Overview
//!
//! A request such as "find lyrics for Song X" is handed to a language model
//! that drives a small set of tools in a ReAct-style loop:
//! - search the web for a lyrics page
//! - fetch the page and pull out Devanagari or transliterated lyrics
//! - extract vocabulary items from the lyrics
//! - generate a stable song ID and persist lyrics plus vocabulary
//!
//! The model talks to the agent in plain text, so the agent parses tool calls
//! out of free-form replies and recovers on its own when the model loses track.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Language model capability and the OpenAI-compatible client
//! - `agent` - The tool-calling loop, reply parser and recovery paths
//! - `tools` - Web search, page fetching, vocabulary extraction, song IDs
//! - `storage` - Lyrics and vocabulary files on disk
//!
//! # Example
//!
//! ```rust,no_run
//! use shabda::config::Settings;
//! use shabda::agent::Agent;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let agent = Agent::from_settings(&settings)?;
//!
//!     let outcome = agent.process_request("Find lyrics for Zingaat by Ajay-Atul").await;
//!     println!("Saved as {}", outcome.song_id);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod openai;
pub mod storage;
pub mod tools;

pub use error::{Result, ShabdaError};
