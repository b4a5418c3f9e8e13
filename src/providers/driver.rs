use serde_json::Value;
use std::collections::HashMap;

use crate::error::ProviderError;
use crate::prompt::RenderedPrompt;
use crate::types::Provider;

/// Parsed completion from a provider response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverResponse {
    /// Extracted text content.
    pub content: Option<String>,
    /// Model the provider reports having used.
    pub model: Option<String>,
    pub usage: Option<UsageInfo>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Wire format of one provider's text-generation API.
///
/// Drivers are pure transformations: they never perform I/O. The object-safe
/// trait lets [`HttpAdapter`](super::HttpAdapter) hold any of them as
/// `Box<dyn ProviderDriver>`.
pub trait ProviderDriver: Send + Sync + std::fmt::Debug {
    fn provider(&self) -> Provider;

    /// Model used when configuration does not name one.
    fn default_model(&self) -> &str;

    /// Base URL used when configuration does not name one.
    fn default_base_url(&self) -> Option<&str>;

    /// Path (relative to the base URL) of the completion endpoint.
    fn completion_path(&self, model: &str) -> String;

    /// Path of a cheap authenticated GET used for health pings.
    fn health_path(&self) -> String;

    fn auth_headers(&self, api_key: &str) -> HashMap<String, String>;

    fn build_body(
        &self,
        prompt: &RenderedPrompt,
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Value;

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, ProviderError>;
}

/// Shared parser for chat-completions style bodies (OpenAI and Azure OpenAI).
pub(crate) fn parse_chat_completion(
    provider: Provider,
    body: &Value,
) -> Result<DriverResponse, ProviderError> {
    if body.get("choices").and_then(|c| c.as_array()).is_none() {
        return Err(ProviderError::invalid_response(
            provider,
            "response has no choices array",
        ));
    }
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(String::from);
    let model = body.get("model").and_then(|v| v.as_str()).map(String::from);
    let usage = body.get("usage").map(|u| UsageInfo {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: u["total_tokens"].as_u64().unwrap_or(0),
    });
    Ok(DriverResponse {
        content,
        model,
        usage,
    })
}

pub(crate) fn chat_messages(prompt: &RenderedPrompt) -> Value {
    serde_json::json!([
        { "role": "system", "content": prompt.system },
        { "role": "user", "content": prompt.user },
    ])
}
