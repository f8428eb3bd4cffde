//! CLI module for Shabda.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Shabda - Marathi song vocabulary agent
///
/// Finds lyrics for a Marathi song and builds a vocabulary list from them.
/// The name "Shabda" is the Marathi (and Sanskrit) word for "word."
#[derive(Parser, Debug)]
#[command(name = "shabda")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent on a request (e.g., "Find lyrics for Zingaat by Ajay-Atul")
    Agent {
        /// The request for the agent
        request: String,

        /// Language model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum number of model turns (overrides config)
        #[arg(long)]
        max_turns: Option<usize>,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show stored lyrics and vocabulary for a song
    Show {
        /// Song ID
        song_id: String,

        /// Print the stored vocabulary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored songs
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_command() {
        let cli = Cli::parse_from(["shabda", "-v", "agent", "Find lyrics for Zingaat", "--max-turns", "5"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Agent {
                request, max_turns, ..
            } => {
                assert_eq!(request, "Find lyrics for Zingaat");
                assert_eq!(max_turns, Some(5));
            }
            other => panic!("Expected agent command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["shabda", "serve"]);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                host: None,
                port: None
            }
        ));
    }
}
