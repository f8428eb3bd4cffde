//! Scripted model and recording tool registry for agent tests.

use super::conversation::Turn;
use super::tools::{ToolCall, ToolKind, ToolOutput, ToolRegistry};
use crate::error::{Result, ShabdaError};
use crate::llm::LanguageModel;
use crate::tools::{extract_fallback, generate_song_id, PageContent, SearchHit};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

pub const SAMPLE_LYRICS: &str = "झिंग झिंग झिंगाट\nआता वाजलं की बारा";

/// Replies with a fixed script, then with `exhausted` forever.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    exhausted: String,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn from_results(replies: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            exhausted: "I am not sure what to do next.".to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Conversations as they were sent, one per call.
    pub fn conversations(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn send(&self, conversation: &[Turn]) -> Result<String> {
        self.seen.lock().unwrap().push(conversation.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.exhausted.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Records every call and answers with canned or default results.
#[derive(Default)]
pub struct RecordingRegistry {
    calls: Mutex<Vec<ToolCall>>,
    queued: Mutex<HashMap<ToolKind, VecDeque<Result<ToolOutput>>>>,
    failing: HashSet<ToolKind>,
    unavailable: HashSet<ToolKind>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next call to `kind` with `result`.
    pub fn respond(self, kind: ToolKind, result: Result<ToolOutput>) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(result);
        self
    }

    /// Fail every call to `kind`.
    pub fn fail(mut self, kind: ToolKind) -> Self {
        self.failing.insert(kind);
        self
    }

    /// Report `kind` as not provided.
    pub fn without(mut self, kind: ToolKind) -> Self {
        self.unavailable.insert(kind);
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<ToolKind> {
        self.calls().iter().map(ToolCall::kind).collect()
    }

    pub fn calls_of(&self, kind: ToolKind) -> Vec<ToolCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind() == kind)
            .collect()
    }

    fn default_output(call: &ToolCall) -> ToolOutput {
        match call {
            ToolCall::SearchWeb { query, .. } => ToolOutput::SearchResults(vec![SearchHit {
                title: format!("{} - Lyrics", query),
                url: "https://lyrics.example/zingaat".to_string(),
                snippet: "Marathi lyrics".to_string(),
            }]),
            ToolCall::GetPageContent { .. } => ToolOutput::Page(PageContent {
                marathi_lyrics: Some(SAMPLE_LYRICS.to_string()),
                phonetic_lyrics: None,
                metadata: "Lyrics extracted successfully".to_string(),
            }),
            ToolCall::ExtractVocabulary { text } => ToolOutput::Vocabulary(extract_fallback(text)),
            ToolCall::GenerateSongId { title, artist } => ToolOutput::SongId {
                song_id: generate_song_id(title, artist.as_deref()),
            },
            ToolCall::SaveResults { song_id, .. } => ToolOutput::Saved(song_id.clone()),
        }
    }
}

#[async_trait]
impl ToolRegistry for RecordingRegistry {
    fn provides(&self, kind: ToolKind) -> bool {
        !self.unavailable.contains(&kind)
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(call.clone());

        let kind = call.kind();
        if self.failing.contains(&kind) {
            return Err(ShabdaError::ToolExecution {
                tool: kind.to_string(),
                message: "service unavailable".to_string(),
            });
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        queued.unwrap_or_else(|| Ok(Self::default_output(call)))
    }
}
