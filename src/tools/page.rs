//! Lyrics extraction from web pages.

use crate::error::{Result, ShabdaError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Elements whose text never counts as lyrics.
const NOISE_TAGS: &[&str] = &["script", "style", "header", "footer", "nav", "noscript"];

/// Lyrics containers, most specific first.
const LYRICS_SELECTORS: &[&str] = &[
    "[class*=lyric i]",
    "[class*=marathi i]",
    "[class*=devanagari i]",
    "[class*=phonetic i]",
    "[class*=song-content i]",
    "[class*=song-text i]",
    "[class*=track-text i]",
    "[id*=lyric i]",
    "[id*=marathi i]",
    "[id*=devanagari i]",
    "[id*=phonetic i]",
];

static HTML_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[a-zA-Z]+;").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Lyrics found on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub marathi_lyrics: Option<String>,
    pub phonetic_lyrics: Option<String>,
    pub metadata: String,
}

impl PageContent {
    fn failed(message: String) -> Self {
        Self {
            marathi_lyrics: None,
            phonetic_lyrics: None,
            metadata: message,
        }
    }

    /// The best lyrics text on the page, Devanagari preferred.
    pub fn primary_lyrics(&self) -> Option<&str> {
        self.marathi_lyrics
            .as_deref()
            .or(self.phonetic_lyrics.as_deref())
            .filter(|l| !l.trim().is_empty())
    }
}

/// Fetches pages and extracts lyrics.
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch `url` and extract lyrics from it.
    ///
    /// Non-success HTTP statuses are reported in `metadata` rather than as errors.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<PageContent> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ShabdaError::InvalidInput(format!("Invalid URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShabdaError::InvalidInput(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        info!("Fetching content from {}", url);
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Page request failed with HTTP {}", status.as_u16());
            return Ok(PageContent::failed(format!("Error: HTTP {}", status.as_u16())));
        }

        let html = response.text().await?;
        info!("Fetched page content ({} bytes)", html.len());
        Ok(extract_lyrics_from_html(&html))
    }
}

/// Find Devanagari and phonetic lyrics in an HTML document.
pub fn extract_lyrics_from_html(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let mut marathi_lyrics: Option<String> = None;
    let mut phonetic_lyrics: Option<String> = None;

    for selector in LYRICS_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&sel) {
            let text = visible_text(element);
            debug!("{} matched {} chars", selector, text.chars().count());

            if marathi_lyrics.is_none() && is_primarily_marathi(&text) {
                info!("Found Marathi lyrics");
                marathi_lyrics = Some(text);
            } else if phonetic_lyrics.is_none() && is_primarily_phonetic(&text) {
                info!("Found phonetic lyrics");
                phonetic_lyrics = Some(text);
            }
        }
    }

    if marathi_lyrics.is_none() && phonetic_lyrics.is_none() {
        info!("No lyrics containers found, trying the largest paragraph");
        if let Ok(p) = Selector::parse("p") {
            let largest = document
                .select(&p)
                .map(visible_text)
                .max_by_key(|t| t.chars().count());

            if let Some(block) = largest {
                if is_primarily_marathi(&block) {
                    marathi_lyrics = Some(block);
                } else if is_primarily_phonetic(&block) {
                    phonetic_lyrics = Some(block);
                }
            }
        }
    }

    PageContent {
        marathi_lyrics,
        phonetic_lyrics,
        metadata: "Lyrics extracted successfully".to_string(),
    }
}

/// Text of an element, skipping script, style and page chrome.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| NOISE_TAGS.contains(&e.name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    clean_text(&text)
}

/// Drop HTML entities and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let text = HTML_ENTITY.replace_all(text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
        || ('\u{1DC0}'..='\u{1DFF}').contains(&c)
        || ('\u{20D0}'..='\u{20FF}').contains(&c)
}

/// More than 30% of the characters are Devanagari.
pub fn is_primarily_marathi(text: &str) -> bool {
    let total = text.trim().chars().count();
    if total == 0 {
        return false;
    }
    let marathi = text.chars().filter(|c| is_devanagari(*c)).count();
    marathi > 0 && marathi as f64 / total as f64 > 0.3
}

/// Mostly Latin letters (or carries combining diacritics), as in a transliteration.
pub fn is_primarily_phonetic(text: &str) -> bool {
    let total = text.trim().chars().count();
    if total == 0 {
        return false;
    }
    let phonetic = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || is_combining_diacritic(*c) || is_devanagari(*c))
        .count();
    let has_diacritics = text.chars().any(is_combining_diacritic);
    phonetic > 0 && (phonetic as f64 / total as f64 > 0.3 || has_diacritics)
}
