//! Concrete reasoning-provider implementations

pub mod anthropic;
pub mod openai;

pub use anthropic::*;
pub use openai::*;
