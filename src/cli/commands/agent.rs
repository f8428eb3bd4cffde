//! Agent command implementation.

use crate::agent::Agent;
use crate::cli::output::content_preview;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::storage::ArtifactStore;
use anyhow::Result;

/// Run the agent command.
pub async fn run_agent(
    request: &str,
    model: Option<String>,
    max_turns: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.model.model = model;
    }
    if let Some(max_turns) = max_turns {
        settings.agent.max_turns = max_turns;
    }

    let agent = Agent::from_settings(&settings)?;
    let store = ArtifactStore::from_settings(&settings)?;

    let spinner = Output::spinner("Agent working...");
    let outcome = agent.process_request(request).await;
    spinner.finish_and_clear();

    if !outcome.tool_calls.is_empty() {
        Output::header(&format!("Tool calls ({})", outcome.tool_calls.len()));
        for call in &outcome.tool_calls {
            Output::list_item(&format!("{} {}", call.name, content_preview(&call.arguments, 60)));
        }
        println!();
    }

    if let Some(reason) = outcome.recovered {
        Output::warning(&format!("Agent finished on its own: {}", reason));
    }

    Output::success(&format!("Song ID: {}", outcome.song_id));
    match store.load(&outcome.song_id)? {
        Some(song) => {
            Output::kv("Lyrics", &content_preview(&song.lyrics, 80));
            Output::kv("Vocabulary items", &song.vocabulary.len().to_string());
        }
        None => Output::warning("Nothing was saved for this song."),
    }

    Output::info(&format!("Completed in {} turn(s)", outcome.turns));

    Ok(())
}
