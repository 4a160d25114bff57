//! agentmarket - agent-driven prediction market pipeline
//!
//! A multi-agent platform that discovers real-world events, turns them
//! into prediction markets, audits them, provides liquidity, trades and
//! votes on governance matters. Six stages run in fixed order; within
//! each stage every agent processes every eligible work item
//! concurrently, and stage outputs propagate through a typed event queue
//! and a shared market registry.
//!
//! # Quick Start
//!
//! ```rust
//! use agentmarket::agent::{AgentRegistry, Reasoner};
//! use agentmarket::config::AgentSpec;
//! use agentmarket::events::EventQueue;
//! use agentmarket::market::MarketRegistry;
//! use agentmarket::pipeline::Orchestrator;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let orchestrator = Orchestrator::new(
//!     Arc::new(AgentRegistry::new()),
//!     Arc::new(MarketRegistry::new()),
//!     Arc::new(EventQueue::new()),
//! );
//!
//! let reasoner = Arc::new(Reasoner::synthetic());
//! orchestrator
//!     .agents()
//!     .create(
//!         &AgentSpec {
//!             stage: "discovery".to_string(),
//!             name: "Crypto Scout".to_string(),
//!             specialty: Some("crypto".to_string()),
//!             seed: Some(42),
//!             ..AgentSpec::default()
//!         },
//!         reasoner,
//!     )
//!     .unwrap();
//!
//! let report = orchestrator.run_full_cycle().await;
//! assert_eq!(report.stages.len(), 6);
//! # }
//! ```

pub mod agent;
pub mod agents;
pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod market;
pub mod observability;
pub mod pipeline;
pub mod testing;

pub use error::{PlatformError, PlatformResult};
