//! Shared builders for the integration suite

#![allow(dead_code)]

use agentmarket::agent::{AgentRegistry, Reasoner};
use agentmarket::config::AgentSpec;
use agentmarket::events::EventQueue;
use agentmarket::market::MarketRegistry;
use agentmarket::pipeline::Orchestrator;
use std::sync::Arc;

/// An orchestrator over fresh registries and an empty queue
pub fn empty_orchestrator() -> Orchestrator {
    Orchestrator::new(
        Arc::new(AgentRegistry::new()),
        Arc::new(MarketRegistry::new()),
        Arc::new(EventQueue::new()),
    )
}

/// A seeded spec; callers fill strategy fields with struct update
pub fn seeded_spec(stage: &str, name: &str, seed: u64) -> AgentSpec {
    AgentSpec {
        stage: stage.to_string(),
        name: name.to_string(),
        seed: Some(seed),
        ..AgentSpec::default()
    }
}

/// Orchestrator staffed with one synthetic agent per stage
pub fn staffed_orchestrator() -> Orchestrator {
    let orch = empty_orchestrator();
    let reasoner = Arc::new(Reasoner::synthetic());

    let roster = vec![
        AgentSpec {
            specialty: Some("crypto".to_string()),
            ..seeded_spec("discovery", "Crypto Scout", 11)
        },
        AgentSpec {
            strategy: Some("aggressive".to_string()),
            ..seeded_spec("listing", "Aggressive Lister", 12)
        },
        AgentSpec {
            audit_focus: Some("compliance".to_string()),
            ..seeded_spec("audit", "Compliance Auditor", 13)
        },
        AgentSpec {
            strategy: Some("tight_spread".to_string()),
            ..seeded_spec("market_maker", "Tight Maker", 14)
        },
        AgentSpec {
            trading_strategy: Some("momentum".to_string()),
            ..seeded_spec("trading", "Momentum Trader", 15)
        },
        AgentSpec {
            governance_style: Some("pragmatic".to_string()),
            ..seeded_spec("governance", "Pragmatic Delegate", 16)
        },
    ];
    for spec in &roster {
        orch.agents().create(spec, reasoner.clone()).unwrap();
    }
    orch
}
