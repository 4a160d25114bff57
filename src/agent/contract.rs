//! The uniform decide → act → record state machine
//!
//! `run_cycle` is the only entry point the stage executor uses. It drives
//! the status transitions `Idle → Running → Idle | Error`, appends the
//! action-log entry, updates the performance counters and converts every
//! failure into an error-tagged execution record. Failures never cross the
//! agent boundary as errors; stage execution must not abort because one
//! agent failed.

use crate::agent::types::{Decision, Outcome, WorkItem};
use crate::agent::StageKind;
use crate::error::{ActionError, DecisionError};
use crate::observability::metrics::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Retention bound for the per-agent action log
pub const ACTION_LOG_LIMIT: usize = 100;

/// Agent lifecycle status
///
/// `Error` is not terminal; the next run cycle transitions back through
/// `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Running,
    Error,
}

/// One entry in an agent's append-only action log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub detail: serde_json::Value,
    pub success: bool,
}

/// Aggregate performance counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PerformanceCounters {
    pub total_actions: u64,
    pub successful_actions: u64,
    pub failed_actions: u64,
}

/// Read-only view of an agent exposed to the registry surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub name: String,
    pub stage: StageKind,
    pub description: String,
    pub status: AgentStatus,
    pub performance: PerformanceCounters,
    pub recent_actions: Vec<ActionLogEntry>,
}

struct CoreState {
    status: AgentStatus,
    actions: VecDeque<ActionLogEntry>,
    performance: PerformanceCounters,
}

/// Identity and shared mutable core state common to every agent
///
/// Strategy-private state (positions, portfolios, histories) lives inside
/// each concrete agent and is never touched from outside its own `act`.
pub struct AgentCore {
    stage: StageKind,
    id: String,
    name: String,
    description: String,
    state: Mutex<CoreState>,
}

impl AgentCore {
    pub fn new(stage: StageKind, id: String, name: String, description: String) -> Self {
        Self {
            stage,
            id,
            name,
            description,
            state: Mutex::new(CoreState {
                status: AgentStatus::Idle,
                actions: VecDeque::new(),
                performance: PerformanceCounters::default(),
            }),
        }
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().expect("agent core poisoned").status
    }

    pub fn set_status(&self, status: AgentStatus) {
        self.state.lock().expect("agent core poisoned").status = status;
    }

    /// Append an action-log entry and bump the counters
    ///
    /// The log is a ring bounded at [`ACTION_LOG_LIMIT`] entries.
    pub fn log_action(&self, action: &str, detail: serde_json::Value, success: bool) {
        let mut state = self.state.lock().expect("agent core poisoned");
        state.actions.push_back(ActionLogEntry {
            timestamp: Utc::now(),
            action: action.to_string(),
            detail,
            success,
        });
        while state.actions.len() > ACTION_LOG_LIMIT {
            state.actions.pop_front();
        }
        state.performance.total_actions += 1;
        if success {
            state.performance.successful_actions += 1;
        } else {
            state.performance.failed_actions += 1;
        }
    }

    pub fn action_log_len(&self) -> usize {
        self.state.lock().expect("agent core poisoned").actions.len()
    }

    pub fn performance(&self) -> PerformanceCounters {
        self.state.lock().expect("agent core poisoned").performance
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        let state = self.state.lock().expect("agent core poisoned");
        let recent_actions = state
            .actions
            .iter()
            .rev()
            .take(5)
            .rev()
            .cloned()
            .collect();
        AgentSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            stage: self.stage,
            description: self.description.clone(),
            status: state.status,
            performance: state.performance,
            recent_actions,
        }
    }
}

/// Result of one (agent, work-item) execution
///
/// Errors are carried as values in the stage report, never propagated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub agent_id: String,
    pub agent_name: String,
    pub stage: StageKind,
    pub decision: Option<Decision>,
    pub outcome: Option<Outcome>,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The uniform contract every stage agent implements
#[async_trait]
pub trait StageAgent: Send + Sync {
    /// Shared identity and core state
    fn core(&self) -> &AgentCore;

    /// Form a decision for the work item
    ///
    /// Pure with respect to shared registries; the only external resource
    /// is the optional reasoning-service call, and provider failures are
    /// recovered internally by substituting a synthetic decision.
    async fn decide(&self, item: &WorkItem) -> Result<Decision, DecisionError>;

    /// Apply the decision to agent-private state and report the outcome
    async fn act(&self, decision: &Decision) -> Result<Outcome, ActionError>;

    /// Drive one decide → act → record cycle, isolating failures
    async fn run_cycle(&self, item: WorkItem) -> ExecutionRecord {
        let core = self.core();
        core.set_status(AgentStatus::Running);
        debug!(agent = core.id(), stage = %core.stage(), "Run cycle started");

        let decision = match self.decide(&item).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(agent = core.id(), error = %e, "Decide step failed");
                core.set_status(AgentStatus::Error);
                core.log_action(
                    "decide",
                    serde_json::to_value(&item).unwrap_or(serde_json::Value::Null),
                    false,
                );
                metrics().execution_failed();
                return self.error_record(None, format!("decide failed: {e}"));
            }
        };

        match self.act(&decision).await {
            Ok(outcome) => {
                core.log_action(
                    "act",
                    serde_json::to_value(&decision).unwrap_or(serde_json::Value::Null),
                    true,
                );
                core.set_status(AgentStatus::Idle);
                metrics().execution_succeeded();
                ExecutionRecord {
                    id: Uuid::new_v4(),
                    agent_id: core.id().to_string(),
                    agent_name: core.name().to_string(),
                    stage: core.stage(),
                    decision: Some(decision),
                    outcome: Some(outcome),
                    error: None,
                    completed_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(agent = core.id(), error = %e, "Act step failed");
                core.set_status(AgentStatus::Error);
                core.log_action(
                    "act",
                    serde_json::to_value(&decision).unwrap_or(serde_json::Value::Null),
                    false,
                );
                metrics().execution_failed();
                self.error_record(Some(decision), format!("act failed: {e}"))
            }
        }
    }

    /// Build an error-tagged record for a failed cycle
    fn error_record(&self, decision: Option<Decision>, error: String) -> ExecutionRecord {
        let core = self.core();
        ExecutionRecord {
            id: Uuid::new_v4(),
            agent_id: core.id().to_string(),
            agent_name: core.name().to_string(),
            stage: core.stage(),
            decision,
            outcome: None,
            error: Some(error),
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::{DiscoveryDecision, WorkItem};
    use crate::events::{next_event_id, DiscoveredEvent};

    struct ScriptedAgent {
        core: AgentCore,
        fail_decide: bool,
        fail_act: bool,
    }

    impl ScriptedAgent {
        fn new(fail_decide: bool, fail_act: bool) -> Self {
            Self {
                core: AgentCore::new(
                    StageKind::Discovery,
                    "discovery_1".to_string(),
                    "Scout".to_string(),
                    "test agent".to_string(),
                ),
                fail_decide,
                fail_act,
            }
        }
    }

    #[async_trait]
    impl StageAgent for ScriptedAgent {
        fn core(&self) -> &AgentCore {
            &self.core
        }

        async fn decide(&self, _item: &WorkItem) -> Result<Decision, DecisionError> {
            if self.fail_decide {
                return Err(DecisionError::MissingInput("no data".to_string()));
            }
            Ok(Decision::Discovery(DiscoveryDecision {
                event_title: "test event".to_string(),
                category: "crypto".to_string(),
                confidence: 0.9,
                market_potential: "high".to_string(),
                recommended_topics: vec![],
                description: String::new(),
                sources: vec![],
            }))
        }

        async fn act(&self, _decision: &Decision) -> Result<Outcome, ActionError> {
            if self.fail_act {
                return Err(ActionError::InvalidDecision("cannot apply".to_string()));
            }
            Ok(Outcome::EventDiscovered {
                event: DiscoveredEvent {
                    id: next_event_id(),
                    title: "test event".to_string(),
                    category: "crypto".to_string(),
                    confidence: 0.9,
                    market_potential: "high".to_string(),
                    description: String::new(),
                    sources: vec![],
                    discoverer: "Scout".to_string(),
                    discovered_at: Utc::now(),
                },
            })
        }
    }

    fn kickoff() -> WorkItem {
        WorkItem::Kickoff { at: Utc::now() }
    }

    #[tokio::test]
    async fn test_successful_cycle_returns_to_idle() {
        let agent = ScriptedAgent::new(false, false);
        let record = agent.run_cycle(kickoff()).await;

        assert!(record.is_success());
        assert!(record.outcome.is_some());
        assert_eq!(agent.core().status(), AgentStatus::Idle);

        let perf = agent.core().performance();
        assert_eq!(perf.total_actions, 1);
        assert_eq!(perf.successful_actions, 1);
    }

    #[tokio::test]
    async fn test_decide_failure_is_captured_not_propagated() {
        let agent = ScriptedAgent::new(true, false);
        let record = agent.run_cycle(kickoff()).await;

        assert!(!record.is_success());
        assert!(record.error.as_deref().unwrap().contains("decide failed"));
        assert!(record.outcome.is_none());
        assert_eq!(agent.core().status(), AgentStatus::Error);
        assert_eq!(agent.core().performance().failed_actions, 1);
    }

    #[tokio::test]
    async fn test_act_failure_keeps_decision_in_record() {
        let agent = ScriptedAgent::new(false, true);
        let record = agent.run_cycle(kickoff()).await;

        assert!(!record.is_success());
        assert!(record.decision.is_some());
        assert!(record.error.as_deref().unwrap().contains("act failed"));
        assert_eq!(agent.core().status(), AgentStatus::Error);
    }

    #[tokio::test]
    async fn test_error_status_recovers_on_next_cycle() {
        let agent = ScriptedAgent::new(false, false);
        agent.core().set_status(AgentStatus::Error);

        let record = agent.run_cycle(kickoff()).await;
        assert!(record.is_success());
        assert_eq!(agent.core().status(), AgentStatus::Idle);
    }

    #[test]
    fn test_action_log_is_bounded() {
        let core = AgentCore::new(
            StageKind::Trading,
            "trading_1".to_string(),
            "Trader".to_string(),
            String::new(),
        );

        for i in 0..(ACTION_LOG_LIMIT + 40) {
            core.log_action("act", serde_json::json!({ "n": i }), true);
        }

        assert_eq!(core.action_log_len(), ACTION_LOG_LIMIT);
        assert_eq!(core.performance().total_actions, (ACTION_LOG_LIMIT + 40) as u64);

        // The ring keeps the newest entries.
        let snapshot = core.snapshot();
        let last = snapshot.recent_actions.last().unwrap();
        assert_eq!(last.detail["n"], (ACTION_LOG_LIMIT + 39) as u64);
    }

    #[test]
    fn test_snapshot_caps_recent_actions() {
        let core = AgentCore::new(
            StageKind::Audit,
            "audit_1".to_string(),
            "Auditor".to_string(),
            String::new(),
        );
        for _ in 0..12 {
            core.log_action("act", serde_json::Value::Null, true);
        }
        assert_eq!(core.snapshot().recent_actions.len(), 5);
    }
}
