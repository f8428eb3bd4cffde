//! Tool-call parsing from free-form model replies.
//!
//! Models asked to answer with `Tool: name(key="value")` drift from the format
//! in predictable ways. Parsing runs through a cascade, stopping at the first
//! tier that yields an invocation:
//!
//! 1. strict single-line syntax
//! 2. values whose closing quote is missing or sits on a later line
//! 3. long text arguments of `extract_vocabulary` and `save_results`
//! 4. calls without the `Tool:` prefix, for known tool names only
//! 5. an implicit `save_results` when the model says `FINISHED`

use super::memory::SessionMemory;
use super::tools::{ToolInvocation, ToolKind};
use crate::storage::placeholder_lyrics;
use regex::{Match, Regex};
use std::sync::LazyLock;
use tracing::debug;

/// Upper bound on a value recovered without its closing quote.
pub const MAX_RECOVERED_CHARS: usize = 8000;

/// Completion sentinel.
pub const FINISHED: &str = "FINISHED";

static TOOL_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tool:\s*([A-Za-z_]\w*)\s*\(").expect("valid regex"));

static LEADING_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_]\w*)\s*=\s*(?:"((?:[^"\\\n]|\\.)*)"|([^\s,)"]+))"#)
        .expect("valid regex")
});

static ARG_OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([A-Za-z_]\w*)\s*=\s*""#).expect("valid regex"));

static NEXT_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""\s*,\s*[A-Za-z_]\w*\s*=\s*""#).expect("valid regex"));

static CALL_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""\s*\)"#).expect("valid regex"));

static SONG_ID_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"song_id\s*=\s*["']?([A-Za-z0-9_-]+)"#).expect("valid regex")
});

/// Read a tool invocation out of `reply`, if there is one.
pub fn parse_tool_call(reply: &str, memory: &SessionMemory) -> Option<ToolInvocation> {
    let invocation = parse_strict(reply)
        .or_else(|| recover_partial_quotes(reply))
        .or_else(|| recover_tool_text(reply, memory))
        .or_else(|| parse_loose(reply))
        .or_else(|| implicit_completion_call(reply, memory));

    if let Some(invocation) = &invocation {
        debug!(
            "Parsed tool call {} with arguments {:?}",
            invocation.name,
            invocation.arguments.keys().collect::<Vec<_>>()
        );
    }
    invocation
}

/// `Tool: name(k="v", ...)` closed on the header line.
pub fn parse_strict(reply: &str) -> Option<ToolInvocation> {
    let header = TOOL_HEADER.captures(reply)?;
    let mut invocation = ToolInvocation::new(&header[1]);

    let after_paren = header.get(0)?.end();
    let mut rest = reply[after_paren..].split('\n').next().unwrap_or_default();

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.starts_with(')') {
            return Some(invocation);
        }

        let arg = LEADING_ARG.captures(rest)?;
        let value = match (arg.get(2), arg.get(3)) {
            (Some(quoted), _) => unescape(quoted.as_str()),
            (None, Some(bare)) => bare.as_str().to_string(),
            (None, None) => String::new(),
        };
        invocation.arguments.insert(arg[1].to_string(), value);
        rest = &rest[arg.get(0)?.end()..];
    }
}

/// `Tool: name(` followed by quoted values that may span lines or never close.
///
/// A value ends at the next `", key="` or at `")`; failing both it runs to the
/// end of the text, capped at [`MAX_RECOVERED_CHARS`].
pub fn recover_partial_quotes(reply: &str) -> Option<ToolInvocation> {
    let header = TOOL_HEADER.captures(reply)?;
    let mut invocation = ToolInvocation::new(&header[1]);
    let body = &reply[header.get(0)?.end()..];

    let mut pos = 0;
    while let Some(opening) = ARG_OPENING.captures(&body[pos..]) {
        let key = opening[1].to_string();
        let value_start = pos + opening.get(0)?.end();
        let rest = &body[value_start..];

        let next = find_unescaped(&NEXT_ARG, rest);
        let close = find_unescaped(&CALL_CLOSE, rest);
        match (next, close) {
            (Some(n), Some(c)) if c.start() < n.start() => {
                invocation.arguments.insert(key, unescape(&rest[..c.start()]));
                break;
            }
            (Some(n), _) => {
                invocation.arguments.insert(key, unescape(&rest[..n.start()]));
                // Resume just past the closing quote so the next key is found
                pos = value_start + n.start() + 1;
            }
            (None, Some(c)) => {
                invocation.arguments.insert(key, unescape(&rest[..c.start()]));
                break;
            }
            (None, None) => {
                invocation.arguments.insert(key, unescape(&unterminated_value(rest)));
                break;
            }
        }
    }

    if invocation.arguments.is_empty() {
        None
    } else {
        Some(invocation)
    }
}

/// Long text arguments that the model often leaves unterminated.
///
/// Looks for `extract_vocabulary` with `text="` and `save_results` with
/// `lyrics="`, capturing up to the first unescaped quote or the end of text.
pub fn recover_tool_text(reply: &str, memory: &SessionMemory) -> Option<ToolInvocation> {
    if reply.contains(ToolKind::ExtractVocabulary.name()) {
        if let Some(text) = quoted_text_after(reply, "text=\"") {
            return Some(
                ToolInvocation::new(ToolKind::ExtractVocabulary.name()).with_argument("text", text),
            );
        }
    }

    if reply.contains(ToolKind::SaveResults.name()) {
        if let Some(lyrics) = quoted_text_after(reply, "lyrics=\"") {
            let mut invocation =
                ToolInvocation::new(ToolKind::SaveResults.name()).with_argument("lyrics", lyrics);
            let song_id = SONG_ID_ARG
                .captures(reply)
                .map(|c| c[1].to_string())
                .or_else(|| memory.pending_identifier.clone());
            if let Some(song_id) = song_id {
                invocation = invocation.with_argument("song_id", song_id);
            }
            return Some(invocation);
        }
    }

    None
}

/// `name(args)` without the `Tool:` prefix, for known tool names.
///
/// Arguments are split on top-level commas and then on the first `=`. A lone
/// positional argument becomes the tool's primary argument.
pub fn parse_loose(reply: &str) -> Option<ToolInvocation> {
    let (kind, open) = ToolKind::ALL
        .into_iter()
        .filter_map(|kind| find_call_start(reply, kind.name()).map(|pos| (kind, pos)))
        .min_by_key(|(_, pos)| *pos)?;

    let inner = &reply[open + 1..];
    let close = matching_paren(inner)?;
    let args = &inner[..close];

    let mut invocation = ToolInvocation::new(kind.name());
    let mut positional = Vec::new();
    for piece in split_top_level(args) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match piece.split_once('=') {
            Some((key, value))
                if !key.trim().is_empty()
                    && key.trim().chars().all(|c| c.is_alphanumeric() || c == '_') =>
            {
                invocation
                    .arguments
                    .insert(key.trim().to_string(), strip_quotes(value));
            }
            _ => positional.push(strip_quotes(piece)),
        }
    }

    for (name, value) in kind.arguments().iter().zip(positional) {
        invocation.arguments.entry(name.to_string()).or_insert(value);
    }

    Some(invocation)
}

/// `save_results` built from memory when the model declares it is done.
pub fn implicit_completion_call(reply: &str, memory: &SessionMemory) -> Option<ToolInvocation> {
    if !reply.contains(FINISHED) {
        return None;
    }
    let song_id = memory.pending_identifier.as_deref()?;

    let lyrics = memory
        .pending_primary_artifact
        .clone()
        .unwrap_or_else(|| placeholder_lyrics(song_id));
    let mut invocation = ToolInvocation::new(ToolKind::SaveResults.name())
        .with_argument("song_id", song_id)
        .with_argument("lyrics", lyrics);

    if let Some(vocabulary) = &memory.pending_derived_artifact {
        if let Ok(json) = serde_json::to_string(vocabulary) {
            invocation = invocation.with_argument("vocabulary", json);
        }
    }

    Some(invocation)
}

fn unescape(value: &str) -> String {
    value.replace("\\\"", "\"")
}

fn find_unescaped<'t>(re: &Regex, text: &'t str) -> Option<Match<'t>> {
    re.find_iter(text)
        .find(|m| m.start() == 0 || text.as_bytes()[m.start() - 1] != b'\\')
}

fn unterminated_value(rest: &str) -> String {
    let capped: String = rest.chars().take(MAX_RECOVERED_CHARS).collect();
    capped
        .trim_end_matches(|c: char| c == ')' || c == '"' || c.is_whitespace())
        .to_string()
}

fn quoted_text_after(reply: &str, opening: &str) -> Option<String> {
    let start = reply.find(opening)? + opening.len();
    let rest = &reply[start..];

    let mut end = rest.len();
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => {
                end = i;
                break;
            }
            _ => escaped = false,
        }
    }

    let text: String = rest[..end].chars().take(MAX_RECOVERED_CHARS).collect();
    let text = unescape(text.trim_end());
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Byte offset of the `(` in `name(` where `name` is not part of a longer word.
fn find_call_start(reply: &str, name: &str) -> Option<usize> {
    let pattern = format!("{}(", name);
    reply.match_indices(&pattern).find_map(|(pos, _)| {
        let boundary = reply[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        boundary.then_some(pos + name.len())
    })
}

/// Offset of the `)` closing a call, ignoring parentheses inside quotes.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') if depth == 0 => return Some(i),
            (None, ')') => depth -= 1,
            _ => {}
        }
    }
    None
}

fn split_top_level(args: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, ',') => {
                pieces.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&args[start..]);
    pieces
}

fn strip_quotes(value: &str) -> String {
    let value = value.trim();
    let inner = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value);
    unescape(inner)
}
