//! Prompt dispatch and decision-JSON extraction
//!
//! Agents describe the decision schema in the system prompt and expect the
//! reply to contain a JSON object, possibly fenced in a markdown code
//! block or embedded in prose. Anything that cannot be parsed is treated
//! as a provider failure, which the calling agent recovers from with a
//! synthetic decision.

use crate::error::DecisionError;
use crate::llm::provider::{CompletionRequest, LlmError, LlmProvider};
use crate::observability::metrics::metrics;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("static regex is valid"));

/// Extract a JSON object from free-form reply text
///
/// Tries, in order: a fenced code block, the raw text, and the widest
/// `{...}` span found in the text.
pub fn parse_decision_json(text: &str) -> Option<serde_json::Value> {
    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Some(inner) = captures.get(1) {
            if let Ok(value) = serde_json::from_str(inner.as_str().trim()) {
                return Some(value);
            }
        }
    }

    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Some(value);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Shared reasoning façade handed to every agent
///
/// Holds the optional provider plus the model parameters from config.
/// With no provider configured (`provider = "synthetic"`), every call
/// reports `NotConfigured` and agents run on their synthetic strategies.
pub struct Reasoner {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl Reasoner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider: Some(provider),
            model,
            temperature,
            max_tokens,
        }
    }

    /// A reasoner with no remote backend; all decisions fall back to the
    /// agents' synthetic strategies
    pub fn synthetic() -> Self {
        Self {
            provider: None,
            model: String::new(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Consult the provider and extract a decision JSON object
    pub async fn decide_json(
        &self,
        system: &str,
        user: &str,
    ) -> Result<serde_json::Value, DecisionError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            DecisionError::Provider(LlmError::NotConfigured(
                "no reasoning provider configured".to_string(),
            ))
        })?;

        metrics().llm_call();
        let request = CompletionRequest::from_instructions(
            &self.model,
            system,
            user,
            Some(self.max_tokens),
            Some(self.temperature),
        );
        let response = provider.complete(request).await?;

        debug!(model = %response.model, tokens = response.usage.total_tokens, "Reply received");

        parse_decision_json(&response.content)
            .ok_or_else(|| DecisionError::UnparsableReply(truncate(&response.content, 200)))
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
