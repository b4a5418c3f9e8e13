//! Azure OpenAI driver: chat-completions bodies addressed by deployment name.

use serde_json::Value;
use std::collections::HashMap;

use super::driver::{chat_messages, parse_chat_completion, DriverResponse, ProviderDriver};
use crate::error::ProviderError;
use crate::prompt::RenderedPrompt;
use crate::types::Provider;

pub const DEFAULT_DEPLOYMENT: &str = "gpt-35-turbo";
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

#[derive(Debug, Clone)]
pub struct AzureOpenAiDriver {
    deployment: String,
    api_version: String,
}

impl Default for AzureOpenAiDriver {
    fn default() -> Self {
        Self::new(DEFAULT_DEPLOYMENT, DEFAULT_API_VERSION)
    }
}

impl AzureOpenAiDriver {
    pub fn new(deployment: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            api_version: api_version.into(),
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

impl ProviderDriver for AzureOpenAiDriver {
    fn provider(&self) -> Provider {
        Provider::AzureOpenAi
    }

    fn default_model(&self) -> &str {
        &self.deployment
    }

    /// Azure endpoints are per-resource; there is no public default.
    fn default_base_url(&self) -> Option<&str> {
        None
    }

    fn completion_path(&self, _model: &str) -> String {
        format!(
            "/openai/deployments/{}/chat/completions?api-version={}",
            self.deployment, self.api_version
        )
    }

    fn health_path(&self) -> String {
        format!("/openai/models?api-version={}", self.api_version)
    }

    fn auth_headers(&self, api_key: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("api-key".into(), api_key.to_string());
        headers
    }

    fn build_body(
        &self,
        prompt: &RenderedPrompt,
        _model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Value {
        serde_json::json!({
            "messages": chat_messages(prompt),
            "max_tokens": max_tokens,
            "temperature": temperature,
        })
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, ProviderError> {
        parse_chat_completion(Provider::AzureOpenAi, body)
    }
}
