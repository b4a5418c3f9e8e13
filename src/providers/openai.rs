//! OpenAI Chat Completions driver.

use serde_json::Value;
use std::collections::HashMap;

use super::driver::{chat_messages, parse_chat_completion, DriverResponse, ProviderDriver};
use crate::error::ProviderError;
use crate::prompt::RenderedPrompt;
use crate::types::Provider;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Default)]
pub struct OpenAiDriver;

impl OpenAiDriver {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderDriver for OpenAiDriver {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn default_base_url(&self) -> Option<&str> {
        Some(DEFAULT_BASE_URL)
    }

    fn completion_path(&self, _model: &str) -> String {
        "/v1/chat/completions".into()
    }

    fn health_path(&self) -> String {
        "/v1/models".into()
    }

    fn auth_headers(&self, api_key: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".into(), format!("Bearer {}", api_key));
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
            "messages": chat_messages(prompt),
            "max_tokens": max_tokens,
            "temperature": temperature,
        })
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, ProviderError> {
        parse_chat_completion(Provider::OpenAi, body)
    }
}
