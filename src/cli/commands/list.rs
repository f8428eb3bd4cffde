//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::storage::ArtifactStore;
use anyhow::Result;

/// Run the list command.
pub fn run_list(settings: Settings) -> Result<()> {
    let store = ArtifactStore::from_settings(&settings)?;

    match store.list() {
        Ok(ids) => {
            if ids.is_empty() {
                Output::info("No songs stored yet. Use 'shabda agent \"Find lyrics for ...\"' to add one.");
            } else {
                Output::header(&format!("Stored Songs ({})", ids.len()));
                println!();

                for id in &ids {
                    Output::list_item(id);
                }

                println!();
                Output::kv("Lyrics", &store.lyrics_dir().display().to_string());
                Output::kv("Vocabulary", &store.vocabulary_dir().display().to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list songs: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
