//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: Option<PathBuf>, settings: Settings) -> Result<()> {
    let path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(&settings).context("Failed to serialize settings")?);
            println!();
            Output::kv("Model", &settings.model.resolved_model());
            Output::kv("Lyrics", &settings.lyrics_dir().display().to_string());
            Output::kv("Vocabulary", &settings.vocabulary_dir().display().to_string());
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }

        ConfigAction::Edit => edit(&path, &settings)?,
    }

    Ok(())
}

/// Open the config in `$EDITOR`, then check that it still parses.
fn edit(path: &PathBuf, settings: &Settings) -> Result<()> {
    if !path.exists() {
        settings.save_to(path)?;
        Output::info(&format!("Wrote default settings to {}", path.display()));
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = std::process::Command::new(&editor)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch {}", editor))?;

    if !status.success() {
        Output::warning(&format!("{} exited with {}", editor, status));
        return Ok(());
    }

    match Settings::load_from(Some(path)) {
        Ok(_) => Output::success("Settings are valid."),
        Err(e) => Output::error(&format!("{} no longer parses: {}", path.display(), e)),
    }

    Ok(())
}
