//! Structured extraction from raw page HTML.

use serde_json::Value;
use tracing::{debug, warn};

use super::json::strip_code_fence;
use crate::error::GatewayError;
use crate::providers::{ChatMessage, ChatOptions, Provider};

/// Only this many characters of the page are sent to the model.
pub const MAX_HTML_CHARS: usize = 10_000;

const EXTRACTION_TEMPERATURE: f32 = 0.1;
const EXTRACTION_MAX_TOKENS: u32 = 2000;

const EXTRACTOR_PROMPT: &str =
    "You are an expert at extracting structured data from HTML. Return valid JSON only.";

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Ask the model to pull `purpose` out of `html`.
///
/// Returns `Ok(None)` when the reply is not valid JSON.
pub async fn extract_from_html(
    provider: &Provider,
    html: &str,
    purpose: &str,
    model: Option<&str>,
) -> Result<Option<Value>, GatewayError> {
    let page = truncate_chars(html, MAX_HTML_CHARS);
    debug!(
        html_chars = page.chars().count(),
        truncated = page.len() < html.len(),
        "Extracting from HTML"
    );

    let messages = [
        ChatMessage::system(EXTRACTOR_PROMPT),
        ChatMessage::user(format!("{}\n\nHTML:\n{}", purpose, page)),
    ];
    let mut options = ChatOptions::default()
        .with_temperature(EXTRACTION_TEMPERATURE)
        .with_max_tokens(EXTRACTION_MAX_TOKENS);
    if let Some(model) = model {
        options = options.with_model(model);
    }

    let response = provider.chat(&messages, &options).await?;
    match serde_json::from_str(strip_code_fence(&response.content)) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(error = %e, "Failed to parse JSON from extraction reply");
            Ok(None)
        }
    }
}
