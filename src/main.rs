//! Shabda CLI entry point.

use anyhow::Result;
use clap::Parser;
use shabda::cli::{commands, Cli, Commands};
use shabda::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_ref().map(PathBuf::from);

    // Load configuration
    let settings = match &config_path {
        Some(path) => Settings::load_from(Some(path))?,
        None => Settings::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_filter(cli.verbose)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Agent {
            request,
            model,
            max_turns,
        } => {
            commands::run_agent(request, model.clone(), *max_turns, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Show { song_id, json } => {
            commands::run_show(song_id, *json, settings)?;
        }

        Commands::List => {
            commands::run_list(settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
