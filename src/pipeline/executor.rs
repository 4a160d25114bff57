//! Single-stage execution: select, fan out, join, propagate

use crate::agent::{
    AgentRegistry, ExecutionRecord, GovernanceItem, Outcome, StageAgent, StageKind, WorkItem,
};
use crate::events::{EventBody, EventKind, EventQueue};
use crate::market::MarketRegistry;
use crate::observability::metrics::metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::AuditVerdict;

/// Simulated mid price handed to quoting and trading work items
///
/// There is no live order book in this engine; every market is quoted
/// from the neutral prior.
const SIMULATED_MID_PRICE: f64 = 0.5;

/// Result of running one stage once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub records: Vec<ExecutionRecord>,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl StageReport {
    pub fn executions(&self) -> usize {
        self.records.len()
    }
}

/// Runs one stage against the shared registries and event queue
pub struct StageExecutor {
    agents: Arc<AgentRegistry>,
    markets: Arc<MarketRegistry>,
    events: Arc<EventQueue>,
}

impl StageExecutor {
    pub fn new(
        agents: Arc<AgentRegistry>,
        markets: Arc<MarketRegistry>,
        events: Arc<EventQueue>,
    ) -> Self {
        Self {
            agents,
            markets,
            events,
        }
    }

    /// Work items a stage would process right now
    ///
    /// Selection is a read-only snapshot; an empty selection makes the
    /// stage a no-op rather than an error.
    pub fn select_work_items(&self, stage: StageKind, docket: &[GovernanceItem]) -> Vec<WorkItem> {
        match stage {
            StageKind::Discovery => vec![WorkItem::Kickoff { at: Utc::now() }],
            StageKind::Listing => self
                .events
                .pending_events()
                .into_iter()
                .map(WorkItem::Event)
                .collect(),
            StageKind::Audit => self
                .events
                .pending_markets()
                .into_iter()
                .map(WorkItem::MarketReview)
                .collect(),
            StageKind::MarketMaker => self
                .markets
                .list_all()
                .into_iter()
                .map(|market| WorkItem::Quote {
                    market,
                    mid_price: SIMULATED_MID_PRICE,
                    bids: vec![],
                    asks: vec![],
                })
                .collect(),
            StageKind::Trading => self
                .markets
                .list_all()
                .into_iter()
                .map(|market| WorkItem::TradeContext {
                    market,
                    mid_price: SIMULATED_MID_PRICE,
                    price_history: vec![],
                    signals: serde_json::json!({}),
                })
                .collect(),
            StageKind::Governance => docket
                .iter()
                .cloned()
                .map(WorkItem::Governance)
                .collect(),
        }
    }

    /// Run every registered agent of `stage` against every selected work
    /// item, then apply the stage's propagation rule
    pub async fn run_stage(&self, stage: StageKind, docket: &[GovernanceItem]) -> StageReport {
        let started_at = Utc::now();
        let agents = self.agents.agents_of(stage);
        let items = self.select_work_items(stage, docket);
        debug!(
            stage = %stage,
            agents = agents.len(),
            items = items.len(),
            "Stage selection complete"
        );

        // Fan out the (agent × item) grid; join in spawn order so the
        // report and the propagation sweep are deterministic for a fixed
        // task set.
        let mut handles = Vec::with_capacity(agents.len() * items.len());
        for agent in &agents {
            for item in &items {
                let agent: Arc<dyn StageAgent> = Arc::clone(agent);
                let item = item.clone();
                handles.push(tokio::spawn(async move { agent.run_cycle(item).await }));
            }
        }

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(stage = %stage, error = %e, "Execution task aborted");
                    records.push(ExecutionRecord {
                        id: uuid::Uuid::new_v4(),
                        agent_id: String::new(),
                        agent_name: String::new(),
                        stage,
                        decision: None,
                        outcome: None,
                        error: Some(format!("task aborted: {e}")),
                        completed_at: Utc::now(),
                    });
                }
            }
        }

        // Single-writer propagation: registry and queue writes happen here
        // and only here, in record order.
        for record in &records {
            if let Some(outcome) = &record.outcome {
                self.propagate(outcome);
            }
        }

        let succeeded = records.iter().filter(|r| r.is_success()).count();
        let failed = records.len() - succeeded;
        metrics().stage_run();
        info!(
            stage = %stage,
            executions = records.len(),
            succeeded,
            failed,
            "Stage complete"
        );

        StageReport {
            stage,
            records,
            succeeded,
            failed,
            started_at,
            completed_at: Utc::now(),
        }
    }

    fn propagate(&self, outcome: &Outcome) {
        match outcome {
            Outcome::EventDiscovered { event } => {
                self.events
                    .append(EventKind::NewEvent, EventBody::Discovered(event.clone()));
                metrics().event_appended();
            }
            Outcome::MarketCreated { market, .. } => {
                self.markets.put(market.clone());
                self.events
                    .append(EventKind::NewMarket, EventBody::Market(market.clone()));
                metrics().market_created();
                metrics().event_appended();
            }
            Outcome::MarketAudited {
                market_id, verdict, ..
            } if *verdict == AuditVerdict::Approve => {
                // Re-read from the registry so the approval envelope
                // carries the current record, not the reviewed copy.
                match self.markets.get(market_id) {
                    Some(market) => {
                        self.events
                            .append(EventKind::MarketApproved, EventBody::Market(market));
                        metrics().event_appended();
                    }
                    None => {
                        warn!(market_id = %market_id, "Approved market missing from registry")
                    }
                }
            }
            // Rejections, revisions, quotes, trades and votes stay in the
            // stage report and agent-private state.
            _ => {}
        }
    }
}
