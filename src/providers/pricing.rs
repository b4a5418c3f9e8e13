//! Provider pricing and cost estimation.

use serde::{Deserialize, Serialize};

use crate::types::Provider;

/// Flat per-provider rate in USD per 1K tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub cost_per_1k_tokens: f64,
}

impl Pricing {
    pub fn new(cost_per_1k_tokens: f64) -> Self {
        let rate = if cost_per_1k_tokens.is_finite() {
            cost_per_1k_tokens.max(0.0)
        } else {
            0.0
        };
        Self {
            cost_per_1k_tokens: rate,
        }
    }

    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::OpenAi => Self::new(0.002),
            Provider::Anthropic => Self::new(0.003),
            Provider::AzureOpenAi => Self::new(0.002),
        }
    }

    pub fn cost(&self, tokens_used: u32) -> f64 {
        (tokens_used as f64 / 1000.0) * self.cost_per_1k_tokens
    }
}

/// Rough token count (~4 characters per token) for providers that omit usage.
pub fn estimate_tokens(texts: &[&str]) -> u32 {
    let chars: usize = texts.iter().map(|t| t.chars().count()).sum();
    let tokens = (chars + 3) / 4;
    u32::try_from(tokens).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        assert_eq!(Pricing::for_provider(Provider::OpenAi).cost_per_1k_tokens, 0.002);
        assert_eq!(Pricing::for_provider(Provider::Anthropic).cost_per_1k_tokens, 0.003);
        assert_eq!(Pricing::for_provider(Provider::AzureOpenAi).cost_per_1k_tokens, 0.002);
    }

    #[test]
    fn test_cost() {
        let p = Pricing::for_provider(Provider::Anthropic);
        assert!((p.cost(1500) - 0.0045).abs() < 1e-12);
        assert_eq!(p.cost(0), 0.0);
    }

    #[test]
    fn test_negative_rate_clamped() {
        assert_eq!(Pricing::new(-1.0).cost(1000), 0.0);
        assert_eq!(Pricing::new(f64::NAN).cost(1000), 0.0);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(&[]), 0);
        assert_eq!(estimate_tokens(&["abcd"]), 1);
        assert_eq!(estimate_tokens(&["abcde", "fgh"]), 2);
    }
}
