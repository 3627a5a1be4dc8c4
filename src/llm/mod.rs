use std::{env, fmt};

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use serde::Deserialize;

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const POE_ENDPOINT: &str = "https://api.poe.com/v1/chat/completions";

/// Enumerates the supported LLM backends behind the shared utility.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LlmProvider {
    OpenAi,
    OpenRouter,
    Poe,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAi => write!(f, "openai"),
            LlmProvider::OpenRouter => write!(f, "openrouter"),
            LlmProvider::Poe => write!(f, "poe"),
        }
    }
}

/// Defines the shape of a chat-style interaction with an LLM.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }
}

/// Individual chat message, compatible with OpenAI compliant providers.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

/// Captures basic token usage metrics associated with a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub response_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub token_usage: TokenUsage,
    pub provider: LlmProvider,
    pub model: String,
}

/// Main entry point for invoking providers.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

#[derive(Clone, Default)]
struct LlmConfig {
    openai_api_key: Option<String>,
    openrouter_api_key: Option<String>,
    poe_api_key: Option<String>,
    openrouter_referer: Option<String>,
    openrouter_title: Option<String>,
}

impl LlmClient {
    /// Build a client using environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            config: LlmConfig {
                openai_api_key: env::var("OPENAI_API_KEY").ok(),
                openrouter_api_key: env::var("OPENROUTER_API_KEY").ok(),
                poe_api_key: env::var("POE_API_KEY").ok(),
                openrouter_referer: env::var("OPENROUTER_HTTP_REFERER").ok(),
                openrouter_title: env::var("OPENROUTER_X_TITLE").ok(),
            },
        })
    }

    /// Execute a request against the provider encoded in the model name.
    pub async fn execute(&self, request: LlmRequest) -> Result<LlmResponse> {
        let (provider, provider_model) = parse_model_provider(&request.model)?;

        let (endpoint, api_key) = match provider {
            LlmProvider::OpenAi => (OPENAI_ENDPOINT, self.config.openai_api_key.as_ref()),
            LlmProvider::OpenRouter => (OPENROUTER_ENDPOINT, self.config.openrouter_api_key.as_ref()),
            LlmProvider::Poe => (POE_ENDPOINT, self.config.poe_api_key.as_ref()),
        };
        let Some(api_key) = api_key else {
            bail!("no API key configured for provider {provider}");
        };

        let messages = request
            .messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role.as_str(),
                    "content": msg.text,
                })
            })
            .collect::<Vec<_>>();

        let payload = serde_json::json!({
            "model": provider_model,
            "messages": messages,
        });

        let mut req_builder = self.http.post(endpoint).bearer_auth(api_key).json(&payload);

        if provider == LlmProvider::OpenRouter {
            if let Some(referer) = &self.config.openrouter_referer {
                req_builder = req_builder.header("HTTP-Referer", referer);
            }
            if let Some(title) = &self.config.openrouter_title {
                req_builder = req_builder.header("X-Title", title);
            }
        }

        let response = req_builder
            .send()
            .await
            .with_context(|| format!("{provider} request failed"))?;
        let status = response.status();
        let response_text = response.text().await.context("failed to read response body")?;
        let body: serde_json::Value = serde_json::from_str(&response_text).with_context(|| {
            format!(
                "failed to parse {provider} response as JSON. Response body: {}",
                preview(&response_text)
            )
        })?;
        if !status.is_success() {
            bail!("{provider} call failed with status {status}: {body}");
        }

        let (text, usage) = extract_text_and_usage(&body)
            .ok_or_else(|| anyhow!("unexpected {provider} response payload: {body}"))?;

        let prompt_tokens = approximate_token_count(
            &request
                .messages
                .iter()
                .map(|m| m.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        let mut token_usage = usage.unwrap_or_default();
        if token_usage.prompt_tokens == 0 {
            token_usage.prompt_tokens = prompt_tokens;
        }
        if token_usage.response_tokens == 0 {
            token_usage.response_tokens = approximate_token_count(&text);
        }
        token_usage.total_tokens = token_usage.prompt_tokens + token_usage.response_tokens;

        Ok(LlmResponse {
            text,
            token_usage,
            provider,
            model: provider_model.to_string(),
        })
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(500) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Extract assistant text and optional usage metrics from either Responses or Chat Completions payloads.
fn extract_text_and_usage(value: &serde_json::Value) -> Option<(String, Option<TokenUsage>)> {
    if let Ok(resp) = serde_json::from_value::<ResponsesPayload>(value.clone()) {
        let text = resp
            .output
            .into_iter()
            .filter(|item| item.item_type == "message")
            .flat_map(|item| item.content)
            .find_map(|content| match content.content_type.as_str() {
                "output_text" | "text" => Some(content.text.unwrap_or_default()),
                _ => None,
            })
            .unwrap_or_default();

        return Some((text, resp.usage.map(TokenUsage::from)));
    }

    if let Ok(chat) = serde_json::from_value::<ChatCompletionPayload>(value.clone()) {
        let text = chat
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();

        return Some((text, chat.usage.map(TokenUsage::from)));
    }

    None
}

fn parse_model_provider(model: &str) -> Result<(LlmProvider, &str)> {
    let (provider, name) = model.split_once('/').ok_or_else(|| {
        anyhow!("model must be prefixed with provider, e.g. 'openai/gpt-4o-mini'")
    })?;

    if name.trim().is_empty() {
        bail!("model name is required after provider prefix");
    }

    match provider {
        "openai" => Ok((LlmProvider::OpenAi, name)),
        "openrouter" => Ok((LlmProvider::OpenRouter, name)),
        "poe" => Ok((LlmProvider::Poe, name)),
        other => bail!("unsupported provider prefix: {other}"),
    }
}

fn approximate_token_count(input: &str) -> usize {
    input.split_whitespace().count()
}

#[derive(Debug, Deserialize)]
struct ResponsesPayload {
    output: Vec<ResponsesOutputItem>,
    #[serde(default)]
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutputItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Vec<ResponsesOutputContent>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutputContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPayload {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    #[serde(default, alias = "input_tokens")]
    prompt_tokens: Option<usize>,
    #[serde(default, alias = "output_tokens")]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}

impl From<UsagePayload> for TokenUsage {
    fn from(usage: UsagePayload) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens.unwrap_or_default(),
            response_tokens: usage.completion_tokens.unwrap_or_default(),
            total_tokens: usage.total_tokens.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn provider_prefix_is_required() {
        assert_eq!(
            parse_model_provider("openai/gpt-4o-mini").unwrap(),
            (LlmProvider::OpenAi, "gpt-4o-mini")
        );
        assert_eq!(
            parse_model_provider("openrouter/anthropic/claude-3.5-sonnet").unwrap(),
            (LlmProvider::OpenRouter, "anthropic/claude-3.5-sonnet")
        );
        assert!(parse_model_provider("gpt-4o").is_err());
        assert!(parse_model_provider("poe/ ").is_err());
        assert!(parse_model_provider("acme/model").is_err());
    }

    #[test]
    fn extracts_chat_completion_text() {
        let body = json!({
            "choices": [{ "message": { "content": "Be gentle with yourself." } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
        });
        let (text, usage) = extract_text_and_usage(&body).expect("parsed");
        assert_eq!(text, "Be gentle with yourself.");
        assert_eq!(
            usage,
            Some(TokenUsage {
                prompt_tokens: 12,
                response_tokens: 4,
                total_tokens: 16
            })
        );
    }

    #[test]
    fn extracts_responses_text() {
        let body = json!({
            "output": [
                { "type": "reasoning", "content": [] },
                { "type": "message", "content": [{ "type": "output_text", "text": "Reflect." }] }
            ],
            "usage": { "input_tokens": 3, "output_tokens": 1 }
        });
        let (text, usage) = extract_text_and_usage(&body).expect("parsed");
        assert_eq!(text, "Reflect.");
        assert_eq!(usage.map(|u| u.response_tokens), Some(1));
    }

    #[test]
    fn rejects_unknown_payload() {
        assert!(extract_text_and_usage(&json!({ "error": "nope" })).is_none());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(600);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), 503);
        assert_eq!(approximate_token_count("  one two\nthree "), 3);
    }
}
