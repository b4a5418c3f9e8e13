//! Cache key generation.

use crate::types::GenerationRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Derives a deterministic key from the normalised request fields.
///
/// `user_id` never participates: identical requests from different callers share an entry.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self { salt: None }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn generate(&self, request: &GenerationRequest) -> CacheKey {
        let mut parts: BTreeMap<&str, String> = BTreeMap::new();
        parts.insert("prompt", request.prompt.trim().to_string());
        parts.insert(
            "context",
            request.trimmed_context().unwrap_or_default().to_string(),
        );
        parts.insert("category", request.category.as_str().to_string());
        parts.insert("tone", request.tone.trim().to_lowercase());
        parts.insert("max_tokens", request.max_tokens.to_string());
        parts.insert("temperature", format!("{:.2}", request.temperature));
        if let Some(ref s) = self.salt {
            parts.insert("salt", s.clone());
        }

        let canonical = serde_json::to_string(&parts).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        CacheKey::new(hash)
    }
}
