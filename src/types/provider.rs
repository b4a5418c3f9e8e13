//! Provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A remote text-generation provider.
///
/// Declaration order is the default priority order (best quality/cost first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "azure_openai", alias = "azure")]
    AzureOpenAi,
}

impl Provider {
    /// All providers in default priority order.
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::AzureOpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::AzureOpenAi => "azure_openai",
        }
    }

    /// Default requests-per-window quota for the sliding-window limiter.
    pub fn default_quota(&self) -> u32 {
        match self {
            Provider::OpenAi => 60,
            Provider::Anthropic => 50,
            Provider::AzureOpenAi => 40,
        }
    }

    /// Environment variable consulted for the API key when none is configured.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::AzureOpenAi => "AZURE_OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider '{}'", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            "azure_openai" | "azure-openai" | "azure" => Ok(Provider::AzureOpenAi),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert_eq!(Provider::ALL[0], Provider::OpenAi);
        assert!(Provider::OpenAi < Provider::Anthropic);
        assert!(Provider::Anthropic < Provider::AzureOpenAi);
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("azure".parse::<Provider>().unwrap(), Provider::AzureOpenAi);
        assert_eq!("azure-openai".parse::<Provider>().unwrap(), Provider::AzureOpenAi);
        assert!("cohere".parse::<Provider>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Provider::AzureOpenAi).unwrap();
        assert_eq!(json, "\"azure_openai\"");
        let p: Provider = serde_json::from_str("\"azure\"").unwrap();
        assert_eq!(p, Provider::AzureOpenAi);
    }

    #[test]
    fn test_default_quotas() {
        assert_eq!(Provider::OpenAi.default_quota(), 60);
        assert_eq!(Provider::Anthropic.default_quota(), 50);
        assert_eq!(Provider::AzureOpenAi.default_quota(), 40);
    }
}
