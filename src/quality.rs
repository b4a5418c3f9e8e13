//! Heuristic quality scoring for generated quotes.
//!
//! Scores are deterministic, perform no I/O and always land in `[0, 1]`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::types::GenerationRequest;

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "because", "been", "before", "being", "both",
    "could", "does", "doing", "each", "from", "further", "have", "having", "here", "into",
    "just", "more", "most", "much", "only", "other", "over", "same", "should", "some", "such",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "under", "until", "very", "want", "were", "what", "when", "where", "which",
    "while", "with", "would", "your", "quote", "quotes", "please", "write",
];

/// Relative weight of each component. Normalised to sum to 1 before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub length: f64,
    pub content: f64,
    pub context: f64,
    pub category: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            length: 0.20,
            content: 0.40,
            context: 0.25,
            category: 0.15,
        }
    }
}

impl ScoringWeights {
    /// Weights scaled to sum to 1. Negative or non-finite entries count as 0;
    /// an all-zero set falls back to the defaults.
    pub fn normalized(&self) -> Self {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let (l, c, x, k) = (
            clean(self.length),
            clean(self.content),
            clean(self.context),
            clean(self.category),
        );
        let sum = l + c + x + k;
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            length: l / sum,
            content: c / sum,
            context: x / sum,
            category: k / sum,
        }
    }
}

/// Per-component breakdown, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub length: f64,
    pub content: f64,
    pub context: f64,
    pub category: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct QualityScorer {
    weights: ScoringWeights,
    target_chars: RangeInclusive<usize>,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

impl QualityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights: weights.normalized(),
            target_chars: 40..=280,
        }
    }

    pub fn with_target_chars(mut self, range: RangeInclusive<usize>) -> Self {
        let (lo, hi) = (*range.start(), *range.end());
        self.target_chars = lo.max(1)..=hi.max(lo.max(1));
        self
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn score(&self, text: &str, request: &GenerationRequest) -> f64 {
        self.breakdown(text, request).total
    }

    pub fn breakdown(&self, text: &str, request: &GenerationRequest) -> ScoreBreakdown {
        let text = text.trim();
        if text.is_empty() {
            return ScoreBreakdown {
                length: 0.0,
                content: 0.0,
                context: 0.0,
                category: 0.0,
                total: 0.0,
            };
        }
        let lower = text.to_lowercase();

        let length = self.length_score(text);
        let content = content_score(text);
        let context = context_score(&lower, request);
        let category = category_score(&lower, request);

        let w = &self.weights;
        let total = w.length * length
            + w.content * content
            + w.context * context
            + w.category * category;
        ScoreBreakdown {
            length,
            content,
            context,
            category,
            total: clamp_unit(total),
        }
    }

    fn length_score(&self, text: &str) -> f64 {
        let n = text.chars().count();
        let (min, max) = (*self.target_chars.start(), *self.target_chars.end());
        if n < min {
            n as f64 / min as f64
        } else if n <= max {
            1.0
        } else {
            clamp_unit(1.0 - (n - max) as f64 / max as f64)
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn is_quote_mark(c: char) -> bool {
    matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}')
}

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'\p{L}+)?").expect("word pattern is valid"));

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD.find_iter(text).map(|m| m.as_str().to_lowercase())
}

fn content_score(text: &str) -> f64 {
    let core = text.trim_matches(|c: char| is_quote_mark(c) || c.is_whitespace());

    let non_empty = if core.is_empty() { 0.0 } else { 1.0 };
    let capital = match core.chars().next() {
        Some(c) if c.is_uppercase() => 1.0,
        _ => 0.0,
    };
    let terminal = match core.chars().last() {
        Some('.') | Some('!') | Some('?') | Some('\u{2026}') => 1.0,
        _ => 0.0,
    };

    let sentences = core
        .split(|c| matches!(c, '.' | '!' | '?'))
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count();
    let sentence_fit = if (1..=3).contains(&sentences) { 1.0 } else { 0.0 };

    let all: Vec<String> = words(core).collect();
    let distinct = if all.is_empty() {
        0.0
    } else {
        let unique: HashSet<&String> = all.iter().collect();
        unique.len() as f64 / all.len() as f64
    };

    (non_empty + capital + terminal + sentence_fit + distinct) / 5.0
}

fn significant_keywords(source: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    words(source)
        .filter(|w| w.chars().count() >= 4 && !STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

fn context_score(lower_text: &str, request: &GenerationRequest) -> f64 {
    let source = request.trimmed_context().unwrap_or(request.prompt.as_str());
    let keywords = significant_keywords(source);
    if keywords.is_empty() {
        return 0.5;
    }
    let hits = keywords
        .iter()
        .filter(|k| lower_text.contains(k.as_str()))
        .count();
    hits as f64 / keywords.len() as f64
}

fn category_score(lower_text: &str, request: &GenerationRequest) -> f64 {
    let hits = request
        .category
        .keywords()
        .iter()
        .filter(|k| lower_text.contains(*k))
        .count();
    (hits as f64 / 2.0).min(1.0)
}
