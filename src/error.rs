use crate::transport::TransportError;
use crate::types::Provider;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.prompt", "cache.redis_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "request_validator", "config_loader")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure taxonomy at the provider-adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Timeout,
    /// Connection failures and 5xx responses.
    Network,
    AuthError,
    QuotaExceeded,
    InvalidResponse,
}

impl ProviderErrorKind {
    /// Only transient failures are retried inside an adapter.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderErrorKind::Timeout | ProviderErrorKind::Network)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Network => "network",
            ProviderErrorKind::AuthError => "auth_error",
            ProviderErrorKind::QuotaExceeded => "quota_exceeded",
            ProviderErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure from one provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub provider: Provider,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: Provider, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout, message)
    }

    pub fn network(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Network, message)
    }

    pub fn invalid_response(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::InvalidResponse, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(provider: Provider, status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::AuthError,
            429 => ProviderErrorKind::QuotaExceeded,
            408 | 504 => ProviderErrorKind::Timeout,
            500..=599 => ProviderErrorKind::Network,
            _ => ProviderErrorKind::InvalidResponse,
        };
        let snippet: String = body.chars().take(200).collect();
        Self::new(provider, kind, format!("HTTP {}: {}", status, snippet))
    }
}

/// Failure kinds at the orchestrator boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    AllProvidersUnavailable,
    InvalidRequest,
}

impl ServiceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceErrorKind::AllProvidersUnavailable => "all_providers_unavailable",
            ServiceErrorKind::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the quote-ai runtime.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("AI service error ({kind}): {message}{}", format_context(.context))]
    Service {
        kind: ServiceErrorKind,
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn invalid_request(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Service {
            kind: ServiceErrorKind::InvalidRequest,
            message: msg.into(),
            context,
        }
    }

    /// The single aggregated error callers see when fallback is exhausted.
    pub fn all_providers_unavailable() -> Self {
        Error::Service {
            kind: ServiceErrorKind::AllProvidersUnavailable,
            message: "all AI providers are currently unavailable".into(),
            context: ErrorContext::new().with_source("orchestrator"),
        }
    }

    /// Rebuild an error from a shared outcome kind.
    pub fn from_service_kind(kind: ServiceErrorKind) -> Self {
        match kind {
            ServiceErrorKind::AllProvidersUnavailable => Self::all_providers_unavailable(),
            ServiceErrorKind::InvalidRequest => Self::invalid_request(
                "invalid request",
                ErrorContext::new().with_source("orchestrator"),
            ),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            Error::Service { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Service { context, .. } | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
