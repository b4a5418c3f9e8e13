use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use super::driver::ProviderDriver;
use super::pricing::{estimate_tokens, Pricing};
use super::retry::RetryPolicy;
use super::{ProviderAdapter, ProviderOutput};
use crate::error::ProviderError;
use crate::prompt::{PromptTemplate, RenderedPrompt};
use crate::transport::HttpTransport;
use crate::types::{GenerationRequest, Provider};

/// A [`ProviderAdapter`] speaking HTTP through a wire-format driver.
pub struct HttpAdapter {
    driver: Box<dyn ProviderDriver>,
    transport: HttpTransport,
    headers: HashMap<String, String>,
    model: String,
    pricing: Pricing,
    retry: RetryPolicy,
    template: PromptTemplate,
}

impl HttpAdapter {
    pub fn new(driver: Box<dyn ProviderDriver>, transport: HttpTransport, api_key: &str) -> Self {
        let headers = driver.auth_headers(api_key);
        let model = driver.default_model().to_string();
        let pricing = Pricing::for_provider(driver.provider());
        Self {
            driver,
            transport,
            headers,
            model,
            pricing,
            retry: RetryPolicy::default(),
            template: PromptTemplate::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    async fn call_once(
        &self,
        prompt: &RenderedPrompt,
        request: &GenerationRequest,
    ) -> Result<(String, String, u32), ProviderError> {
        let provider = self.driver.provider();
        let body = self
            .driver
            .build_body(prompt, &self.model, request.max_tokens, request.temperature);
        let path = self.driver.completion_path(&self.model);

        let response = self.transport.post_json(&path, &self.headers, &body).await?;
        let parsed = self.driver.parse_response(&response)?;

        let text = parsed
            .content
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(provider, "response contains no text"))?;

        let tokens = match parsed.usage {
            Some(u) if u.total_tokens > 0 => u32::try_from(u.total_tokens).unwrap_or(u32::MAX),
            _ => estimate_tokens(&[&prompt.system, &prompt.user, &text]),
        };
        let model = parsed.model.unwrap_or_else(|| self.model.clone());
        Ok((text, model, tokens))
    }
}

#[async_trait]
impl ProviderAdapter for HttpAdapter {
    fn provider(&self) -> Provider {
        self.driver.provider()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderOutput, ProviderError> {
        let prompt = self.template.render(request);
        let started = Instant::now();
        let (text, model, tokens_used) = self
            .retry
            .execute(|| self.call_once(&prompt, request))
            .await?;
        let latency = started.elapsed();
        debug!(
            provider = %self.provider(),
            model = %model,
            tokens = tokens_used,
            latency_ms = latency.as_millis() as u64,
            "provider call completed"
        );

        Ok(ProviderOutput {
            text,
            model,
            tokens_used,
            cost: self.pricing.cost(tokens_used),
            latency,
        })
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        self.transport
            .get(&self.driver.health_path(), &self.headers)
            .await
    }
}
