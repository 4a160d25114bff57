//! Error taxonomy for the agent market platform
//!
//! Failures are values here: agent-level errors are captured inside
//! execution records and never abort a stage or a cycle. Only registry
//! lookups and configuration problems surface to callers directly.

use thiserror::Error;

/// Client-visible platform errors (registry lookups, configuration)
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Unknown stage type: {0}")]
    UnknownStageType(String),

    #[error("Agent not found: {stage}/{id}")]
    AgentNotFound { stage: String, id: String },

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Errors produced while an agent forms a decision
///
/// Provider failures are normally recovered inside `decide` by substituting
/// a synthetic decision; the variants that do escape describe inputs the
/// agent cannot work with at all.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("Reasoning provider failed: {0}")]
    Provider(#[from] crate::llm::provider::LlmError),

    #[error("Reply could not be parsed as a decision: {0}")]
    UnparsableReply(String),

    #[error("Work item missing required input: {0}")]
    MissingInput(String),
}

/// Errors produced while an agent applies a decision to its private state
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Decision cannot be applied: {0}")]
    InvalidDecision(String),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;
