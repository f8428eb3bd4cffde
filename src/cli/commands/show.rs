//! Show command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::storage::ArtifactStore;
use anyhow::Result;

/// Run the show command.
pub fn run_show(song_id: &str, json: bool, settings: Settings) -> Result<()> {
    let store = ArtifactStore::from_settings(&settings)?;

    let Some(song) = store.load(song_id)? else {
        Output::error(&format!("No stored song with ID {}", song_id));
        Output::info("Use 'shabda list' to see stored songs.");
        anyhow::bail!("song not found: {}", song_id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&song)?);
        return Ok(());
    }

    Output::header(&song.song_id);
    println!("\n{}\n", song.lyrics.trim());

    Output::header(&format!("Vocabulary ({})", song.vocabulary.len()));
    for item in &song.vocabulary {
        Output::vocabulary_item(item);
    }

    Ok(())
}
