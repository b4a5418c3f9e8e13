use crate::error::{ProviderError, ProviderErrorKind};
use crate::types::Provider;
use crate::Result;
use keyring::Entry;
use reqwest::Proxy;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Connection settings for one provider's HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: env::var("QUOTE_AI_PROXY_URL").ok(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    provider: Provider,
}

impl HttpTransport {
    pub fn new(provider: Provider, base_url: &str, cfg: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .pool_max_idle_per_host(cfg.pool_max_idle_per_host)
            .pool_idle_timeout(Some(cfg.pool_idle_timeout));

        if let Some(proxy_url) = &cfg.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|source| TransportError::InvalidProxy {
                url: proxy_url.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(TransportError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an API key: explicit value, then OS keyring, then the provider's env var.
    pub fn resolve_api_key(provider: Provider, explicit: Option<&str>) -> Option<String> {
        if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }

        if let Ok(entry) = Entry::new("quote-ai", provider.as_str()) {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        env::var(provider.api_key_env()).ok().filter(|k| !k.is_empty())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::timeout(self.provider, e.to_string())
        } else if e.is_decode() {
            ProviderError::invalid_response(self.provider, e.to_string())
        } else {
            ProviderError::network(self.provider, e.to_string())
        }
    }

    /// POST a JSON body and decode a JSON response. Non-2xx statuses are classified.
    pub async fn post_json(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
        body: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ProviderError> {
        let mut req = self.client.post(self.url(path)).json(body);
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let resp = req.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(self.provider, status.as_u16(), &text));
        }

        let text = resp.text().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(
                self.provider,
                ProviderErrorKind::InvalidResponse,
                format!("response is not valid JSON: {}", e),
            )
        })
    }

    /// GET used for lightweight liveness pings; the body is discarded.
    pub async fn get(
        &self,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> std::result::Result<(), ProviderError> {
        let mut req = self.client.get(self.url(path));
        for (k, v) in headers {
            req = req.header(k, v);
        }

        let resp = req.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(ProviderError::from_status(self.provider, status.as_u16(), &text))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid proxy URL {url}: {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
