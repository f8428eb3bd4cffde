//! Vocabulary extraction from Marathi text.
//!
//! The extractor asks the language model for a JSON array of vocabulary items
//! and falls back to a local Devanagari word scan when the reply is unusable.

use crate::agent::{Role, Turn};
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::LanguageModel;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument, warn};

/// Maximum number of items the local fallback returns.
const FALLBACK_LIMIT: usize = 50;

static DEVANAGARI_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{0900}-\u{097F}]+").expect("valid regex"));

static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.+\}\s*\]").expect("valid regex"));

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*|\s*```").expect("valid regex"));

/// One component of a (possibly compound) vocabulary word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub marathi: String,
    pub phonetic: Vec<String>,
}

/// A vocabulary entry as stored in the vocabulary JSON files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub marathi: String,
    pub phonetic: String,
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl VocabularyItem {
    /// Single-part item with no translation.
    pub fn simple(marathi: &str, phonetic: &str, english: &str) -> Self {
        Self {
            marathi: marathi.to_string(),
            phonetic: phonetic.to_string(),
            english: english.to_string(),
            parts: vec![Part {
                marathi: marathi.to_string(),
                phonetic: vec![phonetic.to_string()],
            }],
        }
    }
}

/// Vocabulary written when nothing could be extracted.
pub fn placeholder_vocabulary() -> Vec<VocabularyItem> {
    vec![VocabularyItem::simple(
        "placeholder",
        "placeholder",
        "This is a placeholder vocabulary item",
    )]
}

/// Extracts vocabulary with a language model.
pub struct VocabularyExtractor {
    model: Arc<dyn LanguageModel>,
    prompts: Prompts,
}

impl VocabularyExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Prompts) -> Self {
        Self { model, prompts }
    }

    /// Extract vocabulary items from `text`.
    ///
    /// Model transport errors are returned; an unusable reply falls back to
    /// [`extract_fallback`].
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn extract(&self, text: &str) -> Result<Vec<VocabularyItem>> {
        info!("Starting vocabulary extraction with {}", self.model.name());

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), text.to_string());
        let user = self
            .prompts
            .render_with_custom(&self.prompts.extraction.user, &vars);

        let reply = self
            .model
            .send(&[
                Turn::new(Role::System, self.prompts.extraction.system.clone()),
                Turn::new(Role::User, user),
            ])
            .await?;

        match parse_vocabulary_reply(&reply) {
            Some(items) if !items.is_empty() => {
                info!("Extracted {} vocabulary items", items.len());
                Ok(items)
            }
            _ => {
                warn!("Model reply held no usable vocabulary, using local extraction");
                Ok(extract_fallback(text))
            }
        }
    }
}

/// Pull a vocabulary array out of a model reply.
pub fn parse_vocabulary_reply(reply: &str) -> Option<Vec<VocabularyItem>> {
    if let Some(m) = JSON_ARRAY.find(reply) {
        match serde_json::from_str::<Vec<VocabularyItem>>(m.as_str()) {
            Ok(items) => return Some(items),
            Err(e) => debug!("Vocabulary array did not parse: {}", e),
        }
    }

    // Strip code fences and close the array if the model left it open
    let mut cleaned = CODE_FENCE.replace_all(reply, "").trim().to_string();
    if !cleaned.starts_with('[') {
        cleaned.insert(0, '[');
    }
    if !cleaned.ends_with(']') {
        cleaned.push(']');
    }
    serde_json::from_str(&cleaned).ok()
}

/// Local vocabulary extraction that needs no model.
///
/// Collects unique Devanagari words of at least two characters in order of
/// first appearance, with a rough phonetic transliteration and no meaning.
pub fn extract_fallback(text: &str) -> Vec<VocabularyItem> {
    info!("Using fallback vocabulary extraction");

    let mut seen = HashSet::new();
    let items: Vec<VocabularyItem> = DEVANAGARI_WORD
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|word| word.chars().count() >= 2)
        .filter(|word| seen.insert(*word))
        .take(FALLBACK_LIMIT)
        .map(|word| VocabularyItem::simple(word, &transliterate(word), ""))
        .collect();

    info!("Found {} unique Marathi words", items.len());
    items
}

/// Crude Devanagari to Latin transliteration, one character at a time.
///
/// A consonant's inherent "a" is dropped before a vowel sign or virama.
pub fn transliterate(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();

    while let Some(c) = chars.next() {
        let Some(p) = phonetic(c) else {
            out.push(c);
            continue;
        };
        if is_consonant(c) && chars.peek().is_some_and(|&next| is_vowel_sign(next)) {
            out.push_str(p.strip_suffix('a').unwrap_or(p));
        } else {
            out.push_str(p);
        }
    }
    out
}

fn is_consonant(c: char) -> bool {
    ('क'..='ह').contains(&c)
}

/// Dependent vowel signs (matras) and the virama.
fn is_vowel_sign(c: char) -> bool {
    ('\u{093E}'..='\u{094D}').contains(&c)
}

fn phonetic(c: char) -> Option<&'static str> {
    let p = match c {
        'अ' => "a",
        'आ' => "ā",
        'इ' => "i",
        'ई' => "ī",
        'उ' => "u",
        'ऊ' => "ū",
        'ए' => "e",
        'ऐ' => "ai",
        'ओ' => "o",
        'औ' => "au",
        'क' => "ka",
        'ख' => "kha",
        'ग' => "ga",
        'घ' => "gha",
        'ङ' => "ṅa",
        'च' => "ca",
        'छ' => "cha",
        'ज' => "ja",
        'झ' => "jha",
        'ञ' => "ña",
        'ट' => "ṭa",
        'ठ' => "ṭha",
        'ड' => "ḍa",
        'ढ' => "ḍha",
        'ण' => "ṇa",
        'त' => "ta",
        'थ' => "tha",
        'द' => "da",
        'ध' => "dha",
        'न' => "na",
        'प' => "pa",
        'फ' => "pha",
        'ब' => "ba",
        'भ' => "bha",
        'म' => "ma",
        'य' => "ya",
        'र' => "ra",
        'ल' => "la",
        'व' => "va",
        'श' => "śa",
        'ष' => "ṣa",
        'स' => "sa",
        'ह' => "ha",
        'ळ' => "ḷa",
        '्' => "",
        'ा' => "ā",
        'ि' => "i",
        'ी' => "ī",
        'ु' => "u",
        'ू' => "ū",
        'े' => "e",
        'ै' => "ai",
        'ो' => "o",
        'ौ' => "au",
        'ं' => "ṃ",
        'ः' => "ḥ",
        _ => return None,
    };
    Some(p)
}
