//! Anthropic Messages API driver. Differs from chat completions in a few places:
//! - The system prompt is a top-level `system` parameter, not part of `messages`.
//! - Content uses typed blocks: `[{"type": "text", "text": "..."}]`.
//! - The response carries `content[0].text` instead of `choices[0].message.content`.
//! - `max_tokens` is required.

use serde_json::Value;
use std::collections::HashMap;

use super::driver::{DriverResponse, ProviderDriver, UsageInfo};
use crate::error::ProviderError;
use crate::prompt::RenderedPrompt;
use crate::types::Provider;

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Default)]
pub struct AnthropicDriver;

impl AnthropicDriver {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderDriver for AnthropicDriver {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn default_base_url(&self) -> Option<&str> {
        Some(DEFAULT_BASE_URL)
    }

    fn completion_path(&self, _model: &str) -> String {
        "/v1/messages".into()
    }

    fn health_path(&self) -> String {
        "/v1/models".into()
    }

    fn auth_headers(&self, api_key: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-api-key".into(), api_key.to_string());
        headers.insert("anthropic-version".into(), API_VERSION.into());
        headers
    }

    fn build_body(
        &self,
        prompt: &RenderedPrompt,
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Value {
        serde_json::json!({
            "model": model,
            "system": prompt.system,
            "messages": [{
                "role": "user",
                "content": [{ "type": "text", "text": prompt.user }],
            }],
            "max_tokens": max_tokens,
            "temperature": temperature,
        })
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, ProviderError> {
        let blocks = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                ProviderError::invalid_response(Provider::Anthropic, "response has no content array")
            })?;

        // Concatenate all text blocks; anything else is ignored.
        let text: String = blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("");
        let content = if text.is_empty() { None } else { Some(text) };

        let model = body.get("model").and_then(|v| v.as_str()).map(String::from);
        let usage = body.get("usage").map(|u| {
            let input = u["input_tokens"].as_u64().unwrap_or(0);
            let output = u["output_tokens"].as_u64().unwrap_or(0);
            UsageInfo {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input + output,
            }
        });

        Ok(DriverResponse {
            content,
            model,
            usage,
        })
    }
}
