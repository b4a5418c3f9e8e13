//! Provider adapters: the polymorphic boundary between the orchestrator and remote APIs.
//!
//! An adapter turns a [`GenerationRequest`] into a [`ProviderOutput`] or a typed
//! [`ProviderError`]. Retry with exponential backoff happens inside the adapter;
//! fallback between providers is the orchestrator's job.
//!
//! The HTTP implementation ([`HttpAdapter`]) pairs a [`ProviderDriver`] (wire
//! format, no I/O) with an [`HttpTransport`](crate::transport::HttpTransport).
//! Tests and embedders may implement [`ProviderAdapter`] directly.

pub mod anthropic;
pub mod azure;
mod driver;
mod http;
pub mod openai;
mod pricing;
mod retry;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ProviderError;
use crate::types::{GenerationRequest, Provider};

pub use anthropic::AnthropicDriver;
pub use azure::AzureOpenAiDriver;
pub use driver::{DriverResponse, ProviderDriver, UsageInfo};
pub use http::HttpAdapter;
pub use openai::OpenAiDriver;
pub use pricing::{estimate_tokens, Pricing};
pub use retry::RetryPolicy;

/// What a provider produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutput {
    pub text: String,
    pub model: String,
    pub tokens_used: u32,
    /// USD.
    pub cost: f64,
    /// Wall time including any retries.
    pub latency: Duration,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderOutput, ProviderError>;

    /// Cheap liveness check. Must not count against usage.
    async fn ping(&self) -> Result<(), ProviderError>;
}

/// Default wire-format driver for a provider.
pub fn driver_for(provider: Provider) -> Box<dyn ProviderDriver> {
    match provider {
        Provider::OpenAi => Box::new(OpenAiDriver::new()),
        Provider::Anthropic => Box::new(AnthropicDriver::new()),
        Provider::AzureOpenAi => Box::new(AzureOpenAiDriver::default()),
    }
}
