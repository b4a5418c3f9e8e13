//! Generation request and quote categories.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_PROMPT_CHARS: usize = 2000;
pub const MAX_CONTEXT_CHARS: usize = 2000;
pub const MAX_TONE_CHARS: usize = 50;
pub const MAX_TOKENS_LIMIT: u32 = 2000;

/// Closed set of quote categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteCategory {
    #[default]
    Motivational,
    Inspirational,
    Success,
    Leadership,
    Wisdom,
    Life,
    Love,
    Happiness,
    Friendship,
    Business,
    Humor,
}

impl QuoteCategory {
    pub const ALL: [QuoteCategory; 11] = [
        QuoteCategory::Motivational,
        QuoteCategory::Inspirational,
        QuoteCategory::Success,
        QuoteCategory::Leadership,
        QuoteCategory::Wisdom,
        QuoteCategory::Life,
        QuoteCategory::Love,
        QuoteCategory::Happiness,
        QuoteCategory::Friendship,
        QuoteCategory::Business,
        QuoteCategory::Humor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteCategory::Motivational => "motivational",
            QuoteCategory::Inspirational => "inspirational",
            QuoteCategory::Success => "success",
            QuoteCategory::Leadership => "leadership",
            QuoteCategory::Wisdom => "wisdom",
            QuoteCategory::Life => "life",
            QuoteCategory::Love => "love",
            QuoteCategory::Happiness => "happiness",
            QuoteCategory::Friendship => "friendship",
            QuoteCategory::Business => "business",
            QuoteCategory::Humor => "humor",
        }
    }

    /// Phrase used by the prompt template.
    pub fn description(&self) -> &'static str {
        match self {
            QuoteCategory::Motivational => "a motivational quote that pushes the reader to act",
            QuoteCategory::Inspirational => "an inspirational quote that uplifts the reader",
            QuoteCategory::Success => "a quote about achieving success",
            QuoteCategory::Leadership => "a quote about leading and guiding others",
            QuoteCategory::Wisdom => "a wise, reflective quote",
            QuoteCategory::Life => "a quote about life and living well",
            QuoteCategory::Love => "a quote about love",
            QuoteCategory::Happiness => "a quote about happiness and joy",
            QuoteCategory::Friendship => "a quote about friendship",
            QuoteCategory::Business => "a quote about business and entrepreneurship",
            QuoteCategory::Humor => "a light, humorous quote",
        }
    }

    /// Keywords the quality scorer looks for.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            QuoteCategory::Motivational => &[
                "action", "achieve", "goal", "strive", "push", "effort", "never", "start",
                "drive", "keep", "persist", "rise",
            ],
            QuoteCategory::Inspirational => &[
                "dream", "believe", "hope", "light", "inspire", "possible", "heart", "soar",
                "spirit", "shine",
            ],
            QuoteCategory::Success => &[
                "success", "achieve", "win", "goal", "effort", "work", "result", "victory",
                "accomplish", "persevere",
            ],
            QuoteCategory::Leadership => &[
                "lead", "leader", "vision", "team", "guide", "serve", "inspire", "influence",
                "courage", "example",
            ],
            QuoteCategory::Wisdom => &[
                "wise", "wisdom", "know", "learn", "truth", "understand", "patience", "mind",
                "silence", "time",
            ],
            QuoteCategory::Life => &[
                "life", "live", "journey", "moment", "time", "path", "world", "day", "change",
                "grow",
            ],
            QuoteCategory::Love => &[
                "love", "heart", "care", "together", "soul", "kind", "tender", "embrace",
                "devotion", "affection",
            ],
            QuoteCategory::Happiness => &[
                "happy", "happiness", "joy", "smile", "laugh", "content", "peace", "grateful",
                "delight", "cheer",
            ],
            QuoteCategory::Friendship => &[
                "friend", "friendship", "together", "trust", "loyal", "share", "companion",
                "support", "bond", "side",
            ],
            QuoteCategory::Business => &[
                "business", "customer", "market", "value", "profit", "growth", "innovate",
                "risk", "invest", "build",
            ],
            QuoteCategory::Humor => &[
                "laugh", "funny", "joke", "smile", "coffee", "monday", "silly", "grin",
                "chuckle", "wit",
            ],
        }
    }
}

impl fmt::Display for QuoteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_tone() -> String {
    "inspiring".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f64 {
    0.7
}

/// A request to generate one quote.
///
/// The orchestrator only borrows requests; once built a request is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub category: QuoteCategory,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Opaque caller id, used for attribution only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
            category: QuoteCategory::default(),
            tone: default_tone(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            user_id: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_category(mut self, category: QuoteCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Context with surrounding whitespace removed; `None` when blank.
    pub fn trimmed_context(&self) -> Option<&str> {
        self.context
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Check every field against its bounds.
    pub fn validate(&self) -> Result<()> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(invalid("prompt must not be empty", "request.prompt"));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(invalid(
                format!("prompt exceeds {} characters", MAX_PROMPT_CHARS),
                "request.prompt",
            ));
        }
        if let Some(ctx) = &self.context {
            if ctx.chars().count() > MAX_CONTEXT_CHARS {
                return Err(invalid(
                    format!("context exceeds {} characters", MAX_CONTEXT_CHARS),
                    "request.context",
                ));
            }
        }
        let tone = self.tone.trim();
        if tone.is_empty() || tone.chars().count() > MAX_TONE_CHARS {
            return Err(invalid(
                format!("tone must be 1..={} characters", MAX_TONE_CHARS),
                "request.tone",
            ));
        }
        if self.max_tokens == 0 || self.max_tokens > MAX_TOKENS_LIMIT {
            return Err(invalid(
                format!("max_tokens must be in 1..={}", MAX_TOKENS_LIMIT),
                "request.max_tokens",
            ));
        }
        if !self.temperature.is_finite() || !(0.0..=1.0).contains(&self.temperature) {
            return Err(invalid(
                "temperature must be within [0.0, 1.0]",
                "request.temperature",
            ));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>, field: &str) -> Error {
    Error::invalid_request(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("request_validator"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceErrorKind;

    #[test]
    fn test_defaults() {
        let req = GenerationRequest::new("inspiration for success");
        assert_eq!(req.category, QuoteCategory::Motivational);
        assert_eq!(req.tone, "inspiring");
        assert_eq!(req.max_tokens, 150);
        assert_eq!(req.temperature, 0.7);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"prompt":"hello","category":"leadership"}"#).unwrap();
        assert_eq!(req.category, QuoteCategory::Leadership);
        assert_eq!(req.max_tokens, 150);
        assert!(req.context.is_none());
    }

    #[test]
    fn test_rejects_empty_prompt() {
        let err = GenerationRequest::new("   ").validate().unwrap_err();
        assert_eq!(err.service_kind(), Some(ServiceErrorKind::InvalidRequest));
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.prompt")
        );
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        for t in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
            let req = GenerationRequest::new("x").with_temperature(t);
            assert!(req.validate().is_err(), "temperature {} accepted", t);
        }
        assert!(GenerationRequest::new("x").with_temperature(0.0).validate().is_ok());
        assert!(GenerationRequest::new("x").with_temperature(1.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_max_tokens_bounds() {
        assert!(GenerationRequest::new("x").with_max_tokens(0).validate().is_err());
        assert!(GenerationRequest::new("x")
            .with_max_tokens(MAX_TOKENS_LIMIT + 1)
            .validate()
            .is_err());
        assert!(GenerationRequest::new("x")
            .with_max_tokens(MAX_TOKENS_LIMIT)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_long_context_and_blank_tone() {
        let long = "a".repeat(MAX_CONTEXT_CHARS + 1);
        assert!(GenerationRequest::new("x").with_context(long).validate().is_err());
        assert!(GenerationRequest::new("x").with_tone("  ").validate().is_err());
    }

    #[test]
    fn test_trimmed_context() {
        let req = GenerationRequest::new("x").with_context("  ");
        assert!(req.trimmed_context().is_none());
        let req = GenerationRequest::new("x").with_context(" team ");
        assert_eq!(req.trimmed_context(), Some("team"));
    }

    #[test]
    fn test_every_category_has_keywords() {
        for c in QuoteCategory::ALL {
            assert!(!c.keywords().is_empty(), "{} has no keywords", c);
        }
    }
}
