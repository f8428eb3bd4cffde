//! Recovery paths for when the model loses track of the task.

use super::conversation::Conversation;
use super::parser::implicit_completion_call;
use super::runner::{Session, CORRECTIVE_PROMPT};
use super::tools::{ToolCall, ToolKind, ToolOutput};
use crate::storage::placeholder_lyrics;
use crate::tools::{extract_fallback, fallback_song_id, placeholder_vocabulary};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

static COMPLETION_SONG_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"song_id[:\s="']+([A-Za-z0-9_-]+)"#).expect("valid regex")
});

static QUOTED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["“]([^"”]+)["”]"#).expect("valid regex"));

static LYRICS_FOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blyrics\s+for\s+(.+)").expect("valid regex"));

static SONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsong\s+(.+)").expect("valid regex"));

static BY_ARTIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*by\s+(.+)").expect("valid regex"));

/// Song ID named in a `FINISHED` reply.
pub fn completion_song_id(reply: &str) -> Option<String> {
    COMPLETION_SONG_ID
        .captures(reply)
        .map(|c| c[1].to_string())
}

/// Local result for tools that must not fail the request.
pub fn local_fallback(call: &ToolCall) -> Option<ToolOutput> {
    match call {
        ToolCall::ExtractVocabulary { text } => Some(ToolOutput::Vocabulary(extract_fallback(text))),
        ToolCall::SaveResults { song_id, .. } => Some(ToolOutput::Saved(song_id.clone())),
        _ => None,
    }
}

/// Newest song ID reported by a `generate_song_id` or `save_results` result.
pub fn song_id_from_history(conversation: &Conversation) -> Option<String> {
    conversation.system_turns_rev().find_map(|turn| {
        if let Some(payload) = tool_result_payload(&turn.content, ToolKind::GenerateSongId) {
            let value: serde_json::Value = serde_json::from_str(payload).ok()?;
            return value["song_id"].as_str().map(str::to_string);
        }
        let payload = tool_result_payload(&turn.content, ToolKind::SaveResults)?;
        serde_json::from_str::<String>(payload).ok()
    })
    .filter(|id| !id.is_empty())
}

fn tool_result_payload(content: &str, kind: ToolKind) -> Option<&str> {
    let rest = content
        .strip_prefix("Tool ")?
        .strip_prefix(kind.name())?
        .strip_prefix(" result")?;
    let rest = rest.strip_prefix(" (local fallback)").unwrap_or(rest);
    rest.strip_prefix(": ").map(str::trim)
}

/// Guess a title and artist from a request like "lyrics for X by Y".
///
/// Quoted text wins; otherwise whatever follows "lyrics for" or "song".
pub fn guess_title_artist(request: &str) -> (String, Option<String>) {
    if let Some(quoted) = QUOTED_TITLE.captures(request) {
        let title = tidy(&quoted[1]);
        let after = &request[quoted.get(0).map_or(request.len(), |m| m.end())..];
        let artist = BY_ARTIST
            .captures(after)
            .map(|c| tidy(&c[1]))
            .filter(|a| !a.is_empty());
        return (title, artist);
    }

    let subject = LYRICS_FOR
        .captures(request)
        .or_else(|| SONG.captures(request))
        .and_then(|c| c.get(1))
        .map_or(request, |m| m.as_str());

    match split_by(subject) {
        Some((title, artist)) => (tidy(title), Some(tidy(artist)).filter(|a| !a.is_empty())),
        None => (tidy(subject), None),
    }
}

fn split_by(subject: &str) -> Option<(&str, &str)> {
    let lower = subject.to_lowercase();
    // Lowercasing can change byte lengths outside ASCII
    if lower.len() != subject.len() {
        return subject.split_once(" by ");
    }
    let pos = lower.find(" by ")?;
    Some((&subject[..pos], &subject[pos + 4..]))
}

fn tidy(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '?', '!', ','])
        .trim()
        .to_string()
}

impl Session<'_> {
    /// Finish the request without the model.
    pub(super) async fn recover(&mut self) {
        info!("Recovering: saving whatever the session holds");

        if self.memory.pending_identifier.is_none() {
            if let Some(song_id) = song_id_from_history(&self.conversation) {
                info!("Recovered song ID {} from the conversation", song_id);
                self.memory.pending_identifier = Some(song_id);
            }
        }
        if self.memory.needs_extraction() {
            self.extract_held_lyrics().await;
        }
        self.ensure_identifier();
        self.persist().await;
    }

    /// Handle `FINISHED` when the reply names no song ID.
    pub(super) async fn salvage_completion(&mut self, reply: &str) {
        if self.memory.needs_extraction() {
            self.extract_held_lyrics().await;
        }

        match implicit_completion_call(reply, &self.memory) {
            Some(invocation) => self.execute(&invocation).await,
            None => {
                if let Some(song_id) = song_id_from_history(&self.conversation) {
                    info!("Recovered song ID {} from the conversation", song_id);
                    self.memory.pending_identifier = Some(song_id);
                }
                self.ensure_identifier();
                self.persist().await;
            }
        }
    }

    /// Act on an unparsable reply late in the conversation.
    pub(super) async fn auto_recover(&mut self) {
        if self.memory.needs_extraction() {
            if let Some(count) = self.extract_held_lyrics().await {
                self.conversation.push_system(format!(
                    "Automatic recovery: extracted {} vocabulary items from the fetched lyrics. Call save_results next, or indicate FINISHED.",
                    count
                ));
                return;
            }
        } else if self.memory.pending_identifier.is_none() && !self.tool_calls.is_empty() {
            let (title, artist) = guess_title_artist(self.request);
            info!("Automatic recovery: generating a song ID for '{}'", title);
            let call = ToolCall::GenerateSongId { title, artist };
            if let Some(ToolOutput::SongId { song_id }) = self.run_tool(&call).await {
                self.conversation.push_system(format!(
                    "Automatic recovery: generated song ID '{}' from the request. Continue with the next tool, or indicate FINISHED.",
                    song_id
                ));
                return;
            }
        }

        self.conversation.push_system(CORRECTIVE_PROMPT);
    }

    /// Extract vocabulary from held lyrics. Returns the item count.
    pub(super) async fn extract_held_lyrics(&mut self) -> Option<usize> {
        let text = self.memory.pending_primary_artifact.clone()?;
        info!("Extracting vocabulary from held lyrics");
        match self.run_tool(&ToolCall::ExtractVocabulary { text }).await {
            Some(ToolOutput::Vocabulary(items)) => Some(items.len()),
            _ => None,
        }
    }

    fn ensure_identifier(&mut self) {
        if self.memory.pending_identifier.is_none() {
            let song_id = fallback_song_id();
            warn!("No song ID found, using {}", song_id);
            self.memory.pending_identifier = Some(song_id);
        }
    }

    /// Save held artifacts, with placeholders for anything missing.
    pub(super) async fn persist(&mut self) {
        let Some(song_id) = self.memory.pending_identifier.clone() else {
            return;
        };

        let lyrics = self
            .memory
            .pending_primary_artifact
            .clone()
            .unwrap_or_else(|| placeholder_lyrics(&song_id));
        let vocabulary = self
            .memory
            .pending_derived_artifact
            .clone()
            .filter(|items| !items.is_empty())
            .unwrap_or_else(placeholder_vocabulary);

        self.run_tool(&ToolCall::SaveResults {
            song_id,
            lyrics,
            vocabulary: Some(vocabulary),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_song_id() {
        assert_eq!(
            completion_song_id("FINISHED song_id: \"ajay-atul-zingaat\"").as_deref(),
            Some("ajay-atul-zingaat")
        );
        assert_eq!(
            completion_song_id("Done, song_id='song_20261019143005123' FINISHED").as_deref(),
            Some("song_20261019143005123")
        );
        assert!(completion_song_id("FINISHED").is_none());
    }

    #[test]
    fn test_song_id_from_history_prefers_newest() {
        let mut conversation = Conversation::new("instructions", "request");
        conversation.push_system(r#"Tool generate_song_id result: {"song_id":"first"}"#);
        conversation.push_assistant("Tool: save_results()");
        conversation.push_system(r#"Tool save_results result (local fallback): "second""#);
        conversation.push_system("Please specify a tool to use");

        assert_eq!(song_id_from_history(&conversation).as_deref(), Some("second"));
    }

    #[test]
    fn test_song_id_from_history_ignores_other_turns() {
        let mut conversation = Conversation::new("instructions", "request");
        conversation.push_assistant(r#"Tool generate_song_id result: {"song_id":"fake"}"#);
        conversation.push_system(r#"Tool search_web result: []"#);

        assert!(song_id_from_history(&conversation).is_none());
    }

    #[test]
    fn test_guess_title_artist() {
        assert_eq!(
            guess_title_artist("Find lyrics for Zingaat by Ajay-Atul."),
            ("Zingaat".to_string(), Some("Ajay-Atul".to_string()))
        );
        assert_eq!(
            guess_title_artist("Please get me \"Mann Udhaan Varyache\" by Shankar Mahadevan"),
            (
                "Mann Udhaan Varyache".to_string(),
                Some("Shankar Mahadevan".to_string())
            )
        );
        assert_eq!(
            guess_title_artist("Marathi song Apsara Aali"),
            ("Apsara Aali".to_string(), None)
        );
        assert_eq!(guess_title_artist("Zingaat"), ("Zingaat".to_string(), None));
    }

    #[test]
    fn test_local_fallback() {
        let extract = ToolCall::ExtractVocabulary {
            text: "मन उधाण".to_string(),
        };
        assert!(matches!(
            local_fallback(&extract),
            Some(ToolOutput::Vocabulary(items)) if items.len() == 2
        ));

        let save = ToolCall::SaveResults {
            song_id: "mann".to_string(),
            lyrics: String::new(),
            vocabulary: None,
        };
        assert_eq!(local_fallback(&save), Some(ToolOutput::Saved("mann".to_string())));

        let search = ToolCall::SearchWeb {
            query: "x".to_string(),
            max_results: 1,
        };
        assert!(local_fallback(&search).is_none());
    }
}
