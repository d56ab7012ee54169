//! OpenAI-compatible API provider.
//!
//! Both supported vendors (OpenAI and Blackbox) expose the OpenAI chat
//! completions format, so a single adapter parameterized by a
//! [`VendorProfile`] covers them. Requests go straight through `reqwest`.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::base::{ChatProvider, ToolCapableProvider};
use super::types::{
    validate_conversation, ChatMessage, ChatOptions, ChatResponse, FinishReason, ToolCall, Usage,
};
use crate::error::GatewayError;

/// Sampling temperature used when the caller does not pick one.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Output token cap used when the caller does not pick one.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Static facts about one vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorProfile {
    pub name: &'static str,
    pub default_base_url: &'static str,
    pub default_model: &'static str,
    /// Environment variable holding the credential.
    pub key_var: &'static str,
}

pub const OPENAI: VendorProfile = VendorProfile {
    name: "openai",
    default_base_url: "https://api.openai.com/v1",
    default_model: "gpt-4o",
    key_var: "OPENAI_API_KEY",
};

pub const BLACKBOX: VendorProfile = VendorProfile {
    name: "blackbox",
    default_base_url: "https://api.blackbox.ai/v1",
    default_model: "google/gemini-2.0-flash-001",
    key_var: "BLACKBOX_API_KEY",
};

static COMPLETIONS_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/chat/completions\b").expect("valid regex"));
static MODELS_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/models(/.*)?$").expect("valid regex"));
static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/v\d+$").expect("valid regex"));

/// Turn whatever the user configured into an API root ending in `/vN`.
///
/// Strips an accidental `/chat/completions` or `/models` suffix and appends
/// `/v1` when no version segment is present.
pub fn normalize_base_url(raw: &str) -> Result<String, GatewayError> {
    let mut base = raw.trim().to_string();

    if let Some(m) = COMPLETIONS_SUFFIX.find(&base) {
        base.truncate(m.start());
        warn!(base_url = %base, "Base URL included /chat/completions, stripping it");
    }

    if let Some(m) = MODELS_SUFFIX.find(&base) {
        base.truncate(m.start());
        warn!(base_url = %base, "Base URL included /models, stripping it");
    }

    let mut base = base.trim_end_matches('/').to_string();
    if !VERSION_SUFFIX.is_match(&base) {
        base.push_str("/v1");
    }

    let parsed = Url::parse(&base)
        .map_err(|e| GatewayError::Configuration(format!("invalid base URL '{}': {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(GatewayError::Configuration(format!(
                "base URL must use http or https, got '{}'",
                other
            )))
        }
    }
    if parsed.host_str().is_none() {
        return Err(GatewayError::Configuration(format!(
            "base URL '{}' has no host",
            raw
        )));
    }

    Ok(base)
}

/// An LLM provider that talks to an OpenAI-compatible chat completions endpoint.
pub struct OpenAICompatProvider {
    vendor: String,
    api_key: String,
    api_base: String,
    default_model: String,
    extra_header: Option<(HeaderName, HeaderValue)>,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a provider for `profile`.
    ///
    /// `api_base` and `default_model` fall back to the profile defaults; the
    /// base URL is normalized either way.
    pub fn new(
        profile: &VendorProfile,
        api_key: &str,
        api_base: Option<&str>,
        default_model: Option<&str>,
    ) -> Result<Self, GatewayError> {
        let api_base = normalize_base_url(api_base.unwrap_or(profile.default_base_url))?;
        let default_model = default_model.unwrap_or(profile.default_model).to_string();

        debug!(
            provider = profile.name,
            base_url = %api_base,
            model = %default_model,
            "Initialized LLM provider"
        );

        Ok(Self {
            vendor: profile.name.to_string(),
            api_key: api_key.to_string(),
            api_base,
            default_model,
            extra_header: None,
            client: Client::new(),
        })
    }

    /// Send a fixed extra header with every request.
    pub fn with_extra_header(mut self, name: &str, value: &str) -> Result<Self, GatewayError> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            GatewayError::Configuration(format!("invalid extra header name '{}': {}", name, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            GatewayError::Configuration(format!("invalid value for header '{}': {}", name, e))
        })?;
        self.extra_header = Some((header_name, header_value));
        Ok(self)
    }

    /// Use a shared HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &'a ChatOptions,
    ) -> CompletionRequest<'a> {
        let temperature = match options.temperature {
            None => DEFAULT_TEMPERATURE,
            Some(t) if t.is_nan() => DEFAULT_TEMPERATURE,
            Some(t) if !(0.0..=2.0).contains(&t) => {
                warn!(temperature = t, "Temperature outside 0..=2, clamping");
                t.clamp(0.0, 2.0)
            }
            Some(t) => t,
        };

        // Vendors reject tool_choice and parallel_tool_calls without tools.
        let (tools, tool_choice, parallel_tool_calls) = if options.tools.is_empty() {
            (None, None, None)
        } else {
            let defs = options.tools.iter().map(|t| t.to_schema()).collect();
            let choice = options
                .tool_choice
                .as_ref()
                .map(|c| c.to_value())
                .unwrap_or_else(|| serde_json::json!("auto"));
            (Some(defs), Some(choice), options.parallel_tool_calls)
        };

        CompletionRequest {
            model: options.model.as_deref().unwrap_or(&self.default_model),
            messages: messages.iter().map(WireMessage::from_canonical).collect(),
            temperature,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            tools,
            tool_choice,
            parallel_tool_calls,
        }
    }
}

// ── OpenAI API request/response types ───────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> WireMessage<'a> {
    fn from_canonical(msg: &'a ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|c| WireToolCall {
                        id: &c.id,
                        call_type: "function",
                        function: WireFunction {
                            name: &c.name,
                            arguments: &c.arguments,
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageResponse>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<MessageResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Option<serde_json::Value>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallResponse>>,
}

#[derive(Deserialize)]
struct ToolCallResponse {
    #[serde(default)]
    id: String,
    function: FunctionCallResponse,
}

#[derive(Deserialize)]
struct FunctionCallResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct UsageResponse {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// Flatten a message `content` that may be a string, null, or a list of
/// text parts.
fn content_text(content: Option<serde_json::Value>) -> String {
    match content {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

/// Arguments usually arrive as a JSON string; some vendors send an object.
fn arguments_text(arguments: Option<serde_json::Value>) -> String {
    match arguments {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => "{}".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Parse the OpenAI-compatible JSON body into a `ChatResponse`.
fn parse_response(body: &str) -> Result<ChatResponse, GatewayError> {
    let completion: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::ResponseShape(format!("invalid completion body: {}", e)))?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::ResponseShape("no completion choices returned".to_string()))?;

    let (content, tool_calls) = match choice.message {
        Some(message) => {
            let calls = message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: arguments_text(tc.function.arguments),
                })
                .collect();
            (content_text(message.content), calls)
        }
        None => (String::new(), Vec::new()),
    };

    let usage = completion.usage.map_or(Usage::default(), |u| Usage {
        prompt_tokens: u.prompt_tokens.unwrap_or(0),
        completion_tokens: u.completion_tokens.unwrap_or(0),
    });

    Ok(ChatResponse {
        content,
        tool_calls,
        finish_reason: FinishReason::parse(choice.finish_reason.as_deref().unwrap_or("stop")),
        usage,
    })
}

#[async_trait]
impl ChatProvider for OpenAICompatProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, GatewayError> {
        validate_conversation(messages)?;
        for tool in &options.tools {
            tool.validate()?;
        }

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(messages, options);

        debug!(
            provider = %self.vendor,
            model = body.model,
            msg_count = messages.len(),
            tools = options.tools.len(),
            "Sending chat completion request"
        );

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some((name, value)) = &self.extra_header {
            request = request.header(name.clone(), value.clone());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(provider = %self.vendor, status = %status, "LLM API returned an error");
            return Err(GatewayError::Provider {
                vendor: self.vendor.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed = parse_response(&text)?;

        debug!(
            provider = %self.vendor,
            finish_reason = %parsed.finish_reason,
            tool_calls = parsed.tool_calls.len(),
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "Received LLM response"
        );

        Ok(parsed)
    }

    fn name(&self) -> &str {
        &self.vendor
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

impl ToolCapableProvider for OpenAICompatProvider {}
