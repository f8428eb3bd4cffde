//! Per-request session memory.

use super::tools::{ToolCall, ToolOutput};
use crate::tools::VocabularyItem;

/// What the agent has learned so far while serving one request.
///
/// A fresh value is created for every request and threaded through the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMemory {
    /// Song ID from `generate_song_id` or `save_results`.
    pub pending_identifier: Option<String>,
    /// Lyrics from `get_page_content`.
    pub pending_primary_artifact: Option<String>,
    /// Vocabulary from `extract_vocabulary`.
    pub pending_derived_artifact: Option<Vec<VocabularyItem>>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lyrics or vocabulary are held.
    pub fn holds_artifacts(&self) -> bool {
        self.pending_primary_artifact.is_some() || self.pending_derived_artifact.is_some()
    }

    /// Lyrics are held but no vocabulary has been extracted from them.
    pub fn needs_extraction(&self) -> bool {
        self.pending_primary_artifact.is_some() && self.pending_derived_artifact.is_none()
    }

    /// Update memory after `call` produced `output`.
    pub fn record(&mut self, call: &ToolCall, output: &ToolOutput) {
        match (call, output) {
            (_, ToolOutput::SongId { song_id }) => {
                self.pending_identifier = Some(song_id.clone());
            }
            (_, ToolOutput::Page(page)) => {
                if let Some(lyrics) = page.primary_lyrics() {
                    // Vocabulary from other lyrics no longer applies
                    if self.pending_primary_artifact.as_deref() != Some(lyrics) {
                        self.pending_derived_artifact = None;
                    }
                    self.pending_primary_artifact = Some(lyrics.to_string());
                }
            }
            (_, ToolOutput::Vocabulary(items)) => {
                self.pending_derived_artifact = Some(items.clone());
            }
            (
                ToolCall::SaveResults {
                    lyrics, vocabulary, ..
                },
                ToolOutput::Saved(song_id),
            ) => {
                self.pending_identifier = Some(song_id.clone());
                if self.pending_primary_artifact.is_none() {
                    self.pending_primary_artifact = Some(lyrics.clone());
                }
                if self.pending_derived_artifact.is_none() {
                    self.pending_derived_artifact = vocabulary.clone();
                }
            }
            (_, ToolOutput::Saved(song_id)) => {
                self.pending_identifier = Some(song_id.clone());
            }
            (_, ToolOutput::SearchResults(_)) => {}
        }
    }
}
