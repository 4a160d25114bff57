//! Governance agent: votes on proposals, disputes and resolutions

use crate::agent::{
    AgentCore, Decision, GovernanceDecision, GovernanceItem, GovernanceItemKind, Outcome,
    Reasoner, StageAgent, StageKind, Vote, WorkItem,
};
use crate::config::AgentSpec;
use crate::error::{ActionError, DecisionError};
use crate::observability::metrics::metrics;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Casts votes on docket items according to a governance style
pub struct GovernanceAgent {
    core: AgentCore,
    reasoner: Arc<Reasoner>,
    style: String,
    rng: Mutex<StdRng>,
    votes: Mutex<Vec<(Uuid, Vote)>>,
}

impl GovernanceAgent {
    pub fn new(id: String, spec: &AgentSpec, reasoner: Arc<Reasoner>) -> Self {
        let style = spec
            .governance_style
            .clone()
            .unwrap_or_else(|| "pragmatic".to_string());
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            core: AgentCore::new(
                StageKind::Governance,
                id,
                spec.name.clone(),
                format!("governance delegate ({style})"),
            ),
            reasoner,
            style,
            rng: Mutex::new(rng),
            votes: Mutex::new(Vec::new()),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {name}, a {style} governance delegate for a prediction-market platform.\n\
             Review the docket item and cast a vote.\n\
             Reply with a JSON object:\n\
             {{\"decision\": \"for|against|abstain\", \"confidence\": 0.85, \"reasoning\": \"...\"}}",
            name = self.core.name(),
            style = self.style,
        )
    }

    fn user_prompt(&self, item: &GovernanceItem) -> String {
        let item_json = serde_json::to_string_pretty(item).unwrap_or_default();
        format!("Vote on this docket item:\n{item_json}\n\nOutput the vote as JSON.")
    }

    /// Style-driven default: progressives back proposals, conservatives lean
    /// against them, everyone abstains on disputes without detail
    fn synthetic_decision(&self, item: &GovernanceItem) -> Decision {
        let vote = match (self.style.as_str(), item.kind) {
            ("progressive", GovernanceItemKind::Proposal) => Vote::For,
            ("conservative", GovernanceItemKind::Proposal) => Vote::Against,
            (_, GovernanceItemKind::Dispute) if item.detail.is_null() => Vote::Abstain,
            (_, GovernanceItemKind::Resolution) => Vote::For,
            _ => Vote::For,
        };

        let confidence = {
            let mut rng = self.rng.lock().expect("rng poisoned");
            rng.gen_range(0.65..0.9)
        };

        Decision::Governance(GovernanceDecision {
            item_id: Some(item.id),
            vote,
            confidence,
            reasoning: format!("{} position on {:?} {}", self.style, item.kind, item.id),
        })
    }
}

#[async_trait]
impl StageAgent for GovernanceAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn decide(&self, item: &WorkItem) -> Result<Decision, DecisionError> {
        let docket_item = match item {
            WorkItem::Governance(docket_item) => docket_item,
            other => {
                return Err(DecisionError::MissingInput(format!(
                    "governance expects a docket item, got {other:?}"
                )))
            }
        };

        let value = match self
            .reasoner
            .decide_json(&self.system_prompt(), &self.user_prompt(docket_item))
            .await
        {
            Ok(value) => value,
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Falling back to synthetic decision");
                metrics().llm_fallback();
                return Ok(self.synthetic_decision(docket_item));
            }
        };

        match serde_json::from_value::<GovernanceDecision>(value) {
            Ok(mut decision) => {
                decision.item_id = Some(docket_item.id);
                Ok(Decision::Governance(decision))
            }
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Reply did not match schema");
                metrics().llm_fallback();
                Ok(self.synthetic_decision(docket_item))
            }
        }
    }

    async fn act(&self, decision: &Decision) -> Result<Outcome, ActionError> {
        let decision = match decision {
            Decision::Governance(d) => d,
            other => {
                return Err(ActionError::InvalidDecision(format!(
                    "governance agent cannot apply {other:?}"
                )))
            }
        };

        let item_id = decision.item_id.ok_or_else(|| {
            ActionError::InvalidDecision("governance decision lacks a docket item id".to_string())
        })?;

        let mut votes = self.votes.lock().expect("governance state poisoned");
        votes.push((item_id, decision.vote));
        if votes.len() > crate::agent::ACTION_LOG_LIMIT {
            votes.remove(0);
        }

        Ok(Outcome::VoteCast {
            item_id,
            vote: decision.vote,
            confidence: decision.confidence,
        })
    }
}
