//! File storage for song lyrics and vocabulary.
//!
//! Each song is stored as `<lyrics_dir>/<song_id>.txt` and
//! `<vocabulary_dir>/<song_id>.json`. Saving the same ID again overwrites both.

use crate::config::Settings;
use crate::error::{Result, ShabdaError};
use crate::tools::{placeholder_vocabulary, VocabularyItem};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Lyrics and vocabulary stored for one song.
#[derive(Debug, Clone, Serialize)]
pub struct SavedSong {
    pub song_id: String,
    pub lyrics: String,
    pub vocabulary: Vec<VocabularyItem>,
}

/// Lyrics written when a song has to be saved without any.
pub fn placeholder_lyrics(song_id: &str) -> String {
    format!("Lyrics for song ID: {} (not found)", song_id)
}

/// Directory-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    lyrics_dir: PathBuf,
    vocabulary_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store, creating both directories.
    pub fn new(lyrics_dir: impl Into<PathBuf>, vocabulary_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            lyrics_dir: lyrics_dir.into(),
            vocabulary_dir: vocabulary_dir.into(),
        };
        std::fs::create_dir_all(&store.lyrics_dir)?;
        std::fs::create_dir_all(&store.vocabulary_dir)?;
        Ok(store)
    }

    /// Create a store at the configured locations.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.lyrics_dir(), settings.vocabulary_dir())
    }

    pub fn lyrics_dir(&self) -> &Path {
        &self.lyrics_dir
    }

    pub fn vocabulary_dir(&self) -> &Path {
        &self.vocabulary_dir
    }

    /// Save lyrics and vocabulary under `song_id`, returning the ID.
    ///
    /// Missing or empty vocabulary is replaced by a placeholder item.
    #[instrument(skip(self, lyrics, vocabulary))]
    pub fn save(
        &self,
        song_id: &str,
        lyrics: &str,
        vocabulary: Option<&[VocabularyItem]>,
    ) -> Result<String> {
        validate_song_id(song_id)?;

        let vocabulary = match vocabulary {
            Some(items) if !items.is_empty() => items.to_vec(),
            _ => {
                warn!("No vocabulary provided, creating a placeholder");
                placeholder_vocabulary()
            }
        };

        let lyrics_file = self.lyrics_path(song_id);
        std::fs::write(&lyrics_file, lyrics)?;
        info!("Saved lyrics to {}", lyrics_file.display());

        let vocab_file = self.vocabulary_path(song_id);
        std::fs::write(&vocab_file, serde_json::to_string_pretty(&vocabulary)?)?;
        info!("Saved {} vocabulary items to {}", vocabulary.len(), vocab_file.display());

        Ok(song_id.to_string())
    }

    /// Load a stored song. Returns `None` unless both files exist.
    pub fn load(&self, song_id: &str) -> Result<Option<SavedSong>> {
        validate_song_id(song_id)?;

        let lyrics_file = self.lyrics_path(song_id);
        let vocab_file = self.vocabulary_path(song_id);
        if !lyrics_file.exists() || !vocab_file.exists() {
            return Ok(None);
        }

        let lyrics = std::fs::read_to_string(&lyrics_file)?;
        let vocabulary = serde_json::from_str(&std::fs::read_to_string(&vocab_file)?)?;

        Ok(Some(SavedSong {
            song_id: song_id.to_string(),
            lyrics,
            vocabulary,
        }))
    }

    /// Load a song, writing placeholder files first if either is missing.
    ///
    /// `fallback_lyrics` is used for the lyrics file when none is stored.
    pub fn load_or_placeholder(
        &self,
        song_id: &str,
        fallback_lyrics: Option<&str>,
    ) -> Result<SavedSong> {
        if let Some(song) = self.load(song_id)? {
            return Ok(song);
        }

        warn!("Stored files for {} are incomplete, writing placeholders", song_id);
        let lyrics = match fallback_lyrics {
            Some(lyrics) if !lyrics.is_empty() => lyrics.to_string(),
            _ => placeholder_lyrics(song_id),
        };
        self.save(song_id, &lyrics, None)?;

        self.load(song_id)?
            .ok_or_else(|| ShabdaError::Storage(format!("Song {} missing after save", song_id)))
    }

    /// IDs of all stored songs, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = std::fs::read_dir(&self.vocabulary_dir)?
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem().map(|s| s.to_string_lossy().to_string())
                } else {
                    None
                }
            })
            .filter(|id| self.lyrics_path(id).exists())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn lyrics_path(&self, song_id: &str) -> PathBuf {
        self.lyrics_dir.join(format!("{}.txt", song_id))
    }

    fn vocabulary_path(&self, song_id: &str) -> PathBuf {
        self.vocabulary_dir.join(format!("{}.json", song_id))
    }
}

/// Reject IDs that could escape the storage directories.
fn validate_song_id(song_id: &str) -> Result<()> {
    if song_id.trim().is_empty()
        || song_id.contains(['/', '\\'])
        || song_id.contains("..")
    {
        return Err(ShabdaError::InvalidInput(format!(
            "Invalid song ID: {:?}",
            song_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("lyrics"), dir.path().join("vocabulary")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_and_load() {
        let (_dir, store) = store();
        let vocabulary = vec![VocabularyItem::simple("नाच", "nāca", "dance")];

        let id = store.save("zingaat", "झिंग झिंग झिंगाट", Some(&vocabulary)).unwrap();
        assert_eq!(id, "zingaat");

        let song = store.load("zingaat").unwrap().unwrap();
        assert_eq!(song.lyrics, "झिंग झिंग झिंगाट");
        assert_eq!(song.vocabulary, vocabulary);
    }

    #[test]
    fn test_save_twice_overwrites_identically() {
        let (_dir, store) = store();
        let vocabulary = vec![VocabularyItem::simple("मन", "mana", "mind")];

        store.save("mann", "मन", Some(&vocabulary)).unwrap();
        let first_lyrics = std::fs::read(store.lyrics_path("mann")).unwrap();
        let first_vocab = std::fs::read(store.vocabulary_path("mann")).unwrap();

        store.save("mann", "मन", Some(&vocabulary)).unwrap();
        assert_eq!(std::fs::read(store.lyrics_path("mann")).unwrap(), first_lyrics);
        assert_eq!(std::fs::read(store.vocabulary_path("mann")).unwrap(), first_vocab);
        assert_eq!(store.list().unwrap(), vec!["mann".to_string()]);
    }

    #[test]
    fn test_vocabulary_json_keeps_devanagari() {
        let (_dir, store) = store();
        store
            .save("mann", "मन", Some(&[VocabularyItem::simple("मन", "mana", "mind")]))
            .unwrap();

        let raw = std::fs::read_to_string(store.vocabulary_path("mann")).unwrap();
        assert!(raw.contains("\"marathi\": \"मन\""));
    }

    #[test]
    fn test_missing_vocabulary_gets_placeholder() {
        let (_dir, store) = store();
        store.save("empty", "lyrics", Some(&[])).unwrap();

        let song = store.load("empty").unwrap().unwrap();
        assert_eq!(song.vocabulary, placeholder_vocabulary());
    }

    #[test]
    fn test_load_missing_song() {
        let (_dir, store) = store();
        assert!(store.load("nothing").unwrap().is_none());
    }

    #[test]
    fn test_load_or_placeholder_writes_files() {
        let (_dir, store) = store();

        let song = store.load_or_placeholder("song_1", None).unwrap();
        assert_eq!(song.lyrics, placeholder_lyrics("song_1"));
        assert_eq!(song.vocabulary.len(), 1);

        let song = store.load_or_placeholder("song_2", Some("नाच")).unwrap();
        assert_eq!(song.lyrics, "नाच");
    }

    #[test]
    fn test_rejects_path_traversal() {
        let (_dir, store) = store();
        assert!(matches!(
            store.save("../escape", "x", None),
            Err(ShabdaError::InvalidInput(_))
        ));
        assert!(store.load("a/b").is_err());
    }
}
