//! Reasoning-service abstraction layer
//!
//! Provider-agnostic interface for the remote text-generation calls agents
//! make while forming decisions, with OpenAI-compatible and Anthropic
//! backends.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
