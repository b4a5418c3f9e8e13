//! Prompt rendering for quote generation.

use crate::types::GenerationRequest;

const DEFAULT_SYSTEM: &str = "You are an expert quote writer. You write original, memorable quotes \
that are concise and meaningful. Reply with the quote only: no attribution, no quotation marks, \
no commentary.";

/// The two messages sent to every provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Builds provider-neutral prompts from a request. Rendering is deterministic.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn render(&self, request: &GenerationRequest) -> RenderedPrompt {
        let mut user = format!(
            "Write {}.\nTone: {}",
            request.category.description(),
            request.tone.trim()
        );
        if let Some(ctx) = request.trimmed_context() {
            user.push_str("\nContext: ");
            user.push_str(ctx);
        }
        user.push_str("\nTopic: ");
        user.push_str(request.prompt.trim());
        user.push_str("\nRespond with a single quote of one to three sentences.");

        RenderedPrompt {
            system: self.system.clone(),
            user,
        }
    }
}
