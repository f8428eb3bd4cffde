//! Song identifiers.

use super::vocabulary::transliterate;
use chrono::Utc;

/// Prefix of identifiers made up when no better one is available.
pub const FALLBACK_ID_PREFIX: &str = "song_";

/// Longest slug kept before truncation.
const MAX_SLUG_LEN: usize = 80;

/// Build a stable, filesystem-safe ID from the song's artist and title.
///
/// Devanagari is transliterated and diacritics folded to ASCII. Falls back to
/// [`fallback_song_id`] when nothing usable is left.
pub fn generate_song_id(title: &str, artist: Option<&str>) -> String {
    let source = match artist {
        Some(artist) if !artist.trim().is_empty() => format!("{} {}", artist, title),
        _ => title.to_string(),
    };

    let slug = slugify(&source);
    if slug.is_empty() {
        fallback_song_id()
    } else {
        slug
    }
}

/// Identifier of the form `song_<UTC timestamp with milliseconds>`.
pub fn fallback_song_id() -> String {
    format!("{}{}", FALLBACK_ID_PREFIX, Utc::now().format("%Y%m%d%H%M%S%3f"))
}

/// `song_id` if it is safe to use as a file name, otherwise its slug.
///
/// Never returns an empty ID.
pub fn sanitize_song_id(song_id: &str) -> String {
    let trimmed = song_id.trim();
    if !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return trimmed.to_string();
    }

    let slug = slugify(trimmed);
    if slug.is_empty() {
        fallback_song_id()
    } else {
        slug
    }
}

/// Lowercase ASCII slug with `-` separators.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for c in transliterate(text).chars().flat_map(char::to_lowercase) {
        match fold_diacritic(c) {
            Some(a) if a.is_ascii_alphanumeric() => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(a);
            }
            _ => pending_dash = true,
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

fn fold_diacritic(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'ā' | 'á' | 'à' | 'â' | 'ä' => 'a',
        'ī' | 'í' | 'ì' | 'î' | 'ï' => 'i',
        'ū' | 'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ē' | 'é' | 'è' | 'ê' | 'ë' => 'e',
        'ō' | 'ó' | 'ò' | 'ô' | 'ö' => 'o',
        'ṃ' | 'ṁ' => 'm',
        'ṇ' | 'ṅ' | 'ñ' => 'n',
        'ṭ' => 't',
        'ḍ' => 'd',
        'ś' | 'ṣ' => 's',
        'ḥ' => 'h',
        'ḷ' => 'l',
        'ṛ' => 'r',
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_from_artist_and_title() {
        assert_eq!(
            generate_song_id("Zingaat", Some("Ajay-Atul")),
            "ajay-atul-zingaat"
        );
        assert_eq!(generate_song_id("  Mann Mein Shiva! ", None), "mann-mein-shiva");
    }

    #[test]
    fn test_generate_transliterates_devanagari() {
        assert_eq!(generate_song_id("नाच", None), "naca");
    }

    #[test]
    fn test_generate_falls_back_when_nothing_left() {
        let id = generate_song_id("!!!", Some("  "));
        assert!(id.starts_with(FALLBACK_ID_PREFIX));
    }

    #[test]
    fn test_fallback_id_shape() {
        let id = fallback_song_id();
        let suffix = id.strip_prefix(FALLBACK_ID_PREFIX).unwrap();
        assert_eq!(suffix.len(), 17);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_sanitize_song_id() {
        assert_eq!(sanitize_song_id("ajay-atul-zingaat"), "ajay-atul-zingaat");
        assert_eq!(sanitize_song_id("song_20261019143005123"), "song_20261019143005123");
        assert_eq!(sanitize_song_id("Ajay/Atul - Zingaat"), "ajay-atul-zingaat");
        assert_eq!(sanitize_song_id("../../etc/passwd"), "etc-passwd");
        assert!(sanitize_song_id("..").starts_with(FALLBACK_ID_PREFIX));
    }

    #[test]
    fn test_slug_is_bounded() {
        let slug = slugify(&"abc ".repeat(100));
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }
}
