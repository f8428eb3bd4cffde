//! Typed tool commands for the agent system.
//!
//! The parser produces loose [`ToolInvocation`]s. Binding turns them into a
//! [`ToolCall`] with a fixed argument schema, filling gaps from session memory.

use super::memory::SessionMemory;
use crate::error::{Result, ShabdaError};
use crate::tools::{sanitize_song_id, PageContent, SearchHit, VocabularyItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Number of search results when the model does not ask for a count.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// The tools the model may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    SearchWeb,
    GetPageContent,
    ExtractVocabulary,
    GenerateSongId,
    SaveResults,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::SearchWeb,
        ToolKind::GetPageContent,
        ToolKind::ExtractVocabulary,
        ToolKind::GenerateSongId,
        ToolKind::SaveResults,
    ];

    /// Name the model uses for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::SearchWeb => "search_web",
            ToolKind::GetPageContent => "get_page_content",
            ToolKind::ExtractVocabulary => "extract_vocabulary",
            ToolKind::GenerateSongId => "generate_song_id",
            ToolKind::SaveResults => "save_results",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Argument names in positional order. The first is the primary argument.
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            ToolKind::SearchWeb => &["query", "max_results"],
            ToolKind::GetPageContent => &["url"],
            ToolKind::ExtractVocabulary => &["text"],
            ToolKind::GenerateSongId => &["title", "artist"],
            ToolKind::SaveResults => &["song_id", "lyrics", "vocabulary"],
        }
    }

    pub fn primary_argument(&self) -> &'static str {
        self.arguments()[0]
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A tool call as read from a model reply, before any checking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, key: &str, value: impl Into<String>) -> Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }

    /// Argument value, treating blank values as absent.
    fn argument(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// A checked tool command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolCall {
    /// Search the web for lyrics pages.
    SearchWeb { query: String, max_results: usize },

    /// Fetch a page and extract lyrics from it.
    GetPageContent { url: String },

    /// Extract vocabulary from lyrics text.
    ExtractVocabulary { text: String },

    /// Derive a song ID from title and artist.
    GenerateSongId {
        title: String,
        artist: Option<String>,
    },

    /// Persist lyrics and vocabulary under a song ID.
    SaveResults {
        song_id: String,
        lyrics: String,
        vocabulary: Option<Vec<VocabularyItem>>,
    },
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::SearchWeb { .. } => ToolKind::SearchWeb,
            ToolCall::GetPageContent { .. } => ToolKind::GetPageContent,
            ToolCall::ExtractVocabulary { .. } => ToolKind::ExtractVocabulary,
            ToolCall::GenerateSongId { .. } => ToolKind::GenerateSongId,
            ToolCall::SaveResults { .. } => ToolKind::SaveResults,
        }
    }

    /// Bind a parsed invocation to a typed call.
    ///
    /// Missing `song_id`, `lyrics` and `vocabulary` for `save_results`, and
    /// `text` for `extract_vocabulary`, are taken from `memory`. A `song_id`
    /// that is not file-safe is replaced by its slug.
    pub fn bind(invocation: &ToolInvocation, memory: &SessionMemory) -> Result<Self> {
        let kind = ToolKind::from_name(&invocation.name)
            .ok_or_else(|| ShabdaError::UnknownTool(invocation.name.clone()))?;

        let require = |argument: &str, value: Option<String>| {
            value.ok_or_else(|| ShabdaError::MissingArgument {
                tool: kind.to_string(),
                argument: argument.to_string(),
            })
        };

        let call = match kind {
            ToolKind::SearchWeb => ToolCall::SearchWeb {
                query: require("query", invocation.argument("query"))?,
                max_results: invocation
                    .argument("max_results")
                    .and_then(|v| v.trim().parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_MAX_RESULTS),
            },
            ToolKind::GetPageContent => ToolCall::GetPageContent {
                url: require("url", invocation.argument("url"))?,
            },
            ToolKind::ExtractVocabulary => ToolCall::ExtractVocabulary {
                text: require(
                    "text",
                    invocation
                        .argument("text")
                        .or_else(|| memory.pending_primary_artifact.clone()),
                )?,
            },
            ToolKind::GenerateSongId => ToolCall::GenerateSongId {
                title: require("title", invocation.argument("title"))?,
                artist: invocation.argument("artist"),
            },
            ToolKind::SaveResults => ToolCall::SaveResults {
                song_id: require(
                    "song_id",
                    invocation
                        .argument("song_id")
                        .or_else(|| memory.pending_identifier.clone()),
                )
                .map(|id| {
                    let safe = sanitize_song_id(&id);
                    if safe != id {
                        warn!("Song ID {:?} is not file-safe, using {}", id, safe);
                    }
                    safe
                })?,
                lyrics: require(
                    "lyrics",
                    invocation
                        .argument("lyrics")
                        .or_else(|| memory.pending_primary_artifact.clone()),
                )?,
                vocabulary: invocation
                    .argument("vocabulary")
                    .and_then(|raw| parse_vocabulary_argument(&raw))
                    .or_else(|| memory.pending_derived_artifact.clone()),
            },
        };

        Ok(call)
    }

    /// Arguments as a JSON object, for records and logs.
    pub fn arguments_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn parse_vocabulary_argument(raw: &str) -> Option<Vec<VocabularyItem>> {
    match serde_json::from_str(raw) {
        Ok(items) => Some(items),
        Err(e) => {
            warn!("Ignoring vocabulary argument that is not a JSON list: {}", e);
            None
        }
    }
}

/// Result of a tool execution, serialized into the conversation as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    SearchResults(Vec<SearchHit>),
    Page(PageContent),
    Vocabulary(Vec<VocabularyItem>),
    SongId { song_id: String },
    Saved(String),
}

impl ToolOutput {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

/// Executes typed tool calls.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Whether this registry can run `kind`.
    fn provides(&self, kind: ToolKind) -> bool {
        let _ = kind;
        true
    }

    /// Run a tool.
    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("search"), None);
    }

    #[test]
    fn test_bind_search_with_defaults() {
        let invocation = ToolInvocation::new("search_web").with_argument("query", "zingaat lyrics");
        let call = ToolCall::bind(&invocation, &SessionMemory::default()).unwrap();
        assert_eq!(
            call,
            ToolCall::SearchWeb {
                query: "zingaat lyrics".to_string(),
                max_results: DEFAULT_MAX_RESULTS,
            }
        );

        let invocation = invocation.with_argument("max_results", "3");
        match ToolCall::bind(&invocation, &SessionMemory::default()).unwrap() {
            ToolCall::SearchWeb { max_results, .. } => assert_eq!(max_results, 3),
            other => panic!("Expected SearchWeb, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_unknown_tool() {
        let err = ToolCall::bind(&ToolInvocation::new("fly"), &SessionMemory::default()).unwrap_err();
        assert!(matches!(err, ShabdaError::UnknownTool(name) if name == "fly"));
    }

    #[test]
    fn test_bind_missing_argument() {
        let err = ToolCall::bind(
            &ToolInvocation::new("get_page_content").with_argument("url", "  "),
            &SessionMemory::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ShabdaError::MissingArgument { ref tool, ref argument }
                if tool == "get_page_content" && argument == "url"
        ));
    }

    #[test]
    fn test_bind_save_backfills_from_memory() {
        let vocabulary = vec![VocabularyItem::simple("नाच", "nāca", "dance")];
        let memory = SessionMemory {
            pending_identifier: Some("zingaat".to_string()),
            pending_primary_artifact: Some("झिंग झिंग झिंगाट".to_string()),
            pending_derived_artifact: Some(vocabulary.clone()),
        };

        let call = ToolCall::bind(&ToolInvocation::new("save_results"), &memory).unwrap();
        assert_eq!(
            call,
            ToolCall::SaveResults {
                song_id: "zingaat".to_string(),
                lyrics: "झिंग झिंग झिंगाट".to_string(),
                vocabulary: Some(vocabulary),
            }
        );
    }

    #[test]
    fn test_bind_save_slugs_unsafe_song_id() {
        let invocation = ToolInvocation::new("save_results")
            .with_argument("song_id", "Ajay/Atul - Zingaat")
            .with_argument("lyrics", "झिंग झिंग झिंगाट");

        match ToolCall::bind(&invocation, &SessionMemory::default()).unwrap() {
            ToolCall::SaveResults { song_id, .. } => assert_eq!(song_id, "ajay-atul-zingaat"),
            other => panic!("Expected SaveResults, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_save_parses_vocabulary_json() {
        let invocation = ToolInvocation::new("save_results")
            .with_argument("song_id", "mann")
            .with_argument("lyrics", "मन")
            .with_argument(
                "vocabulary",
                r#"[{"marathi": "मन", "phonetic": "mana", "english": "mind"}]"#,
            );

        match ToolCall::bind(&invocation, &SessionMemory::default()).unwrap() {
            ToolCall::SaveResults { vocabulary, .. } => {
                assert_eq!(vocabulary.unwrap()[0].english, "mind");
            }
            other => panic!("Expected SaveResults, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_extract_uses_fetched_lyrics() {
        let memory = SessionMemory {
            pending_primary_artifact: Some("मन उधाण".to_string()),
            ..SessionMemory::default()
        };
        let call = ToolCall::bind(&ToolInvocation::new("extract_vocabulary"), &memory).unwrap();
        assert_eq!(
            call,
            ToolCall::ExtractVocabulary {
                text: "मन उधाण".to_string()
            }
        );
    }

    #[test]
    fn test_output_json_shapes() {
        let id = ToolOutput::SongId {
            song_id: "zingaat".to_string(),
        };
        assert_eq!(id.to_json(), r#"{"song_id":"zingaat"}"#);
        assert_eq!(ToolOutput::Saved("zingaat".to_string()).to_json(), r#""zingaat""#);
    }

    #[test]
    fn test_arguments_json() {
        let call = ToolCall::GetPageContent {
            url: "https://example.com".to_string(),
        };
        assert_eq!(call.arguments_json(), r#"{"url":"https://example.com"}"#);
    }
}
