//! Lenient JSON recovery for model replies.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));
static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F-\x9F]").expect("valid regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));
static BARE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,]\s*)(\w+):").expect("valid regex"));

/// Remove a surrounding markdown code fence (```json or bare ```).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };
    inner.trim().trim_end_matches("```").trim()
}

/// The widest `{ ... }` span in `text`, if any.
pub fn object_span(text: &str) -> Option<&str> {
    OBJECT_SPAN.find(text).map(|m| m.as_str())
}

/// Patch the usual model mistakes: control characters, trailing commas and
/// unquoted keys.
pub fn repair(text: &str) -> String {
    let cleaned = CONTROL_CHARS.replace_all(text, "");
    let cleaned = TRAILING_COMMA.replace_all(&cleaned, "$1");
    let cleaned = BARE_KEY.replace_all(&cleaned, "$1\"$2\":");
    cleaned.trim().to_string()
}

/// The string items of a JSON array; anything else yields an empty list.
pub fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a model reply as JSON, trying progressively looser readings.
///
/// Repairs are only attempted on the object span and only after a strict
/// parse failed, since the key-quoting rewrite can touch string contents.
pub fn parse_lenient(text: &str) -> Option<Value> {
    let unfenced = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str(unfenced) {
        return Some(value);
    }

    let span = object_span(unfenced)?;
    if let Ok(value) = serde_json::from_str(span) {
        return Some(value);
    }

    serde_json::from_str(&repair(span)).ok()
}
