//! Tools available to the lyrics agent.
//!
//! Each tool is usable on its own; [`ToolContext`] bundles them behind the
//! agent's [`ToolRegistry`] interface.

pub mod page;
pub mod search;
pub mod song_id;
pub mod vocabulary;

pub use page::{extract_lyrics_from_html, PageContent, PageFetcher};
pub use search::{SearchHit, WebSearch};
pub use song_id::{fallback_song_id, generate_song_id, sanitize_song_id, FALLBACK_ID_PREFIX};
pub use vocabulary::{
    extract_fallback, placeholder_vocabulary, Part, VocabularyExtractor, VocabularyItem,
};

use crate::agent::{ToolCall, ToolOutput, ToolRegistry, DEFAULT_MAX_RESULTS};
use crate::config::{Prompts, Settings};
use crate::error::{Result, ShabdaError};
use crate::llm::LanguageModel;
use crate::storage::ArtifactStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Tool execution context backed by the web, the model and local storage.
pub struct ToolContext {
    pub search: WebSearch,
    pub pages: PageFetcher,
    pub extractor: VocabularyExtractor,
    pub store: ArtifactStore,
    max_results: usize,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(
        search: WebSearch,
        pages: PageFetcher,
        extractor: VocabularyExtractor,
        store: ArtifactStore,
    ) -> Self {
        Self {
            search,
            pages,
            extractor,
            store,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Cap on search results, whatever the model asks for.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Build every tool from settings, sharing `model` with the extractor.
    pub fn from_settings(
        settings: &Settings,
        prompts: Prompts,
        model: Arc<dyn LanguageModel>,
        store: ArtifactStore,
    ) -> Result<Self> {
        Ok(Self::new(
            WebSearch::from_settings(&settings.search)?,
            PageFetcher::new(Duration::from_secs(settings.search.timeout_secs.max(1)))?,
            VocabularyExtractor::new(model, prompts),
            store,
        )
        .with_max_results(settings.search.max_results))
    }
}

#[async_trait]
impl ToolRegistry for ToolContext {
    #[instrument(skip(self, call), fields(tool = %call.kind()))]
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        match call {
            ToolCall::SearchWeb { query, max_results } => {
                let limit = (*max_results).min(self.max_results);
                let hits = self.search.search(query, limit).await?;
                Ok(ToolOutput::SearchResults(hits))
            }
            ToolCall::GetPageContent { url } => {
                let page = self.pages.fetch(url).await?;
                Ok(ToolOutput::Page(page))
            }
            ToolCall::ExtractVocabulary { text } => {
                let items = self.extractor.extract(text).await?;
                Ok(ToolOutput::Vocabulary(items))
            }
            ToolCall::GenerateSongId { title, artist } => {
                let song_id = generate_song_id(title, artist.as_deref());
                info!("Generated song ID {}", song_id);
                Ok(ToolOutput::SongId { song_id })
            }
            ToolCall::SaveResults {
                song_id,
                lyrics,
                vocabulary,
            } => {
                let saved = self
                    .store
                    .save(song_id, lyrics, vocabulary.as_deref())
                    .map_err(|e| ShabdaError::ToolExecution {
                        tool: call.kind().to_string(),
                        message: e.to_string(),
                    })?;
                Ok(ToolOutput::Saved(saved))
            }
        }
    }
}
