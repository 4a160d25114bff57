//! Agent registry: creation, lookup and status snapshots
//!
//! Agents are keyed by (stage, id) with ids assigned from a per-stage
//! monotonic counter. The registry only grows; there is no deletion for
//! the process lifetime.

use crate::agent::contract::{AgentSnapshot, StageAgent};
use crate::agent::reasoning::Reasoner;
use crate::agent::StageKind;
use crate::agents::build_agent;
use crate::config::AgentSpec;
use crate::error::{PlatformError, PlatformResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

/// Holds agent instances keyed by (stage, instance id)
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<StageKind, Vec<Arc<dyn StageAgent>>>>,
    counters: Mutex<HashMap<StageKind, u64>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the strategy-specific agent for the spec's stage type
    ///
    /// The stage string is the client boundary; unrecognized values fail
    /// with `UnknownStageType` before anything is built.
    pub fn create(&self, spec: &AgentSpec, reasoner: Arc<Reasoner>) -> PlatformResult<String> {
        let stage: StageKind = spec.stage.parse()?;
        let id = self.next_id(stage);
        let agent = build_agent(stage, id.clone(), spec, reasoner);
        info!(stage = %stage, id = %id, name = %spec.name, "Agent created");
        self.insert(stage, agent);
        Ok(id)
    }

    /// Register a pre-built agent (used by tests injecting custom agents)
    pub fn register(&self, agent: Arc<dyn StageAgent>) -> String {
        let stage = agent.core().stage();
        let id = agent.core().id().to_string();
        self.insert(stage, agent);
        id
    }

    fn insert(&self, stage: StageKind, agent: Arc<dyn StageAgent>) {
        let mut agents = self.agents.write().expect("agent registry poisoned");
        agents.entry(stage).or_default().push(agent);
    }

    fn next_id(&self, stage: StageKind) -> String {
        let mut counters = self.counters.lock().expect("agent registry poisoned");
        let counter = counters.entry(stage).or_insert(0);
        *counter += 1;
        format!("{stage}_{counter}")
    }

    pub fn get(&self, stage: StageKind, id: &str) -> PlatformResult<Arc<dyn StageAgent>> {
        let agents = self.agents.read().expect("agent registry poisoned");
        agents
            .get(&stage)
            .and_then(|list| list.iter().find(|a| a.core().id() == id))
            .cloned()
            .ok_or_else(|| PlatformError::AgentNotFound {
                stage: stage.to_string(),
                id: id.to_string(),
            })
    }

    /// All agents of one stage, in registration order
    pub fn agents_of(&self, stage: StageKind) -> Vec<Arc<dyn StageAgent>> {
        let agents = self.agents.read().expect("agent registry poisoned");
        agents.get(&stage).cloned().unwrap_or_default()
    }

    /// Status snapshots grouped by stage
    pub fn list_all(&self) -> HashMap<String, Vec<AgentSnapshot>> {
        let agents = self.agents.read().expect("agent registry poisoned");
        StageKind::ALL
            .iter()
            .map(|stage| {
                let snapshots = agents
                    .get(stage)
                    .map(|list| list.iter().map(|a| a.core().snapshot()).collect())
                    .unwrap_or_default();
                (stage.to_string(), snapshots)
            })
            .collect()
    }

    /// Agent counts per stage
    pub fn counts(&self) -> HashMap<String, usize> {
        let agents = self.agents.read().expect("agent registry poisoned");
        StageKind::ALL
            .iter()
            .map(|stage| {
                (
                    stage.to_string(),
                    agents.get(stage).map(Vec::len).unwrap_or(0),
                )
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        let agents = self.agents.read().expect("agent registry poisoned");
        agents.values().map(Vec::len).sum()
    }
}
