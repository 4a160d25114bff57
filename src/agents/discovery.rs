//! Discovery agent: information gathering and hot-event identification

use crate::agent::{
    AgentCore, Decision, DiscoveryDecision, Outcome, Reasoner, StageAgent, StageKind, WorkItem,
};
use crate::config::AgentSpec;
use crate::error::{ActionError, DecisionError};
use crate::events::{next_event_id, DiscoveredEvent};
use crate::observability::metrics::metrics;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Candidate events the synthetic strategy draws from, by specialty
const CANDIDATES: &[(&str, &str, f64, &str)] = &[
    ("politics", "Presidential election outcome flips key swing state", 0.92, "high"),
    ("politics", "Prime minister survives no-confidence vote", 0.78, "medium"),
    ("crypto", "Bitcoin breaks 70,000 USD before quarter end", 0.82, "high"),
    ("crypto", "Spot ETH ETF approved within two months", 0.75, "high"),
    ("crypto", "New all-time high within 90 days of the halving", 0.85, "high"),
    ("tech", "Next-generation flagship model ships this year", 0.80, "high"),
    ("tech", "Chipmaker market cap overtakes largest rival", 0.68, "medium"),
    ("sports", "League finals decided in game seven", 0.85, "high"),
    ("sports", "Title holder repeats as champion", 0.78, "medium"),
    ("finance", "Index closes the year above 5500", 0.82, "high"),
    ("finance", "Central bank cuts rates at the next meeting", 0.88, "high"),
];

/// Identifies hot events worth turning into prediction markets
pub struct DiscoveryAgent {
    core: AgentCore,
    reasoner: Arc<Reasoner>,
    specialty: String,
    rng: Mutex<StdRng>,
    discovered: Mutex<Vec<DiscoveredEvent>>,
}

impl DiscoveryAgent {
    pub fn new(id: String, spec: &AgentSpec, reasoner: Arc<Reasoner>) -> Self {
        let specialty = spec.specialty.clone().unwrap_or_else(|| "general".to_string());
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            core: AgentCore::new(
                StageKind::Discovery,
                id,
                spec.name.clone(),
                format!("event discovery specialist ({specialty})"),
            ),
            reasoner,
            specialty,
            rng: Mutex::new(rng),
            discovered: Mutex::new(Vec::new()),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {name}, a market-discovery analyst focused on the {specialty} domain.\n\
             Analyze the provided signals, identify one hot event with prediction-market \
             potential, and reply with a JSON object:\n\
             {{\"event_title\": \"...\", \"category\": \"politics|crypto|sports|tech|finance\", \
             \"confidence\": 0.85, \"market_potential\": \"high|medium|low\", \
             \"recommended_topics\": [\"...\"], \"description\": \"...\", \"sources\": [\"...\"]}}",
            name = self.core.name(),
            specialty = self.specialty,
        )
    }

    fn user_prompt(&self) -> String {
        format!(
            "Scan current {} signals (news feeds, social sentiment, on-chain and market data) \
             and report the single most market-worthy event as JSON.",
            self.specialty
        )
    }

    /// Deterministic-for-tests fallback decision
    fn synthetic_decision(&self) -> Decision {
        let pool: Vec<_> = CANDIDATES
            .iter()
            .filter(|(cat, ..)| *cat == self.specialty)
            .collect();
        let pool = if pool.is_empty() {
            CANDIDATES.iter().collect()
        } else {
            pool
        };

        let mut rng = self.rng.lock().expect("rng poisoned");
        let (category, title, confidence, potential) = pool[rng.gen_range(0..pool.len())];

        Decision::Discovery(DiscoveryDecision {
            event_title: title.to_string(),
            category: category.to_string(),
            confidence: *confidence,
            market_potential: potential.to_string(),
            recommended_topics: vec![self.specialty.clone()],
            description: format!("notable {category} development"),
            sources: vec!["synthetic".to_string()],
        })
    }
}

#[async_trait]
impl StageAgent for DiscoveryAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn decide(&self, item: &WorkItem) -> Result<Decision, DecisionError> {
        match item {
            WorkItem::Kickoff { .. } => {}
            other => {
                return Err(DecisionError::MissingInput(format!(
                    "discovery expects a kickoff item, got {other:?}"
                )))
            }
        }

        let value = match self
            .reasoner
            .decide_json(&self.system_prompt(), &self.user_prompt())
            .await
        {
            Ok(value) => value,
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Falling back to synthetic decision");
                metrics().llm_fallback();
                return Ok(self.synthetic_decision());
            }
        };

        match serde_json::from_value::<DiscoveryDecision>(value) {
            Ok(decision) => Ok(Decision::Discovery(decision)),
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Reply did not match schema");
                metrics().llm_fallback();
                Ok(self.synthetic_decision())
            }
        }
    }

    async fn act(&self, decision: &Decision) -> Result<Outcome, ActionError> {
        let decision = match decision {
            Decision::Discovery(d) => d,
            other => {
                return Err(ActionError::InvalidDecision(format!(
                    "discovery agent cannot apply {other:?}"
                )))
            }
        };

        let event = DiscoveredEvent {
            id: next_event_id(),
            title: decision.event_title.clone(),
            category: decision.category.clone(),
            confidence: decision.confidence,
            market_potential: decision.market_potential.clone(),
            description: decision.description.clone(),
            sources: decision.sources.clone(),
            discoverer: self.core.name().to_string(),
            discovered_at: Utc::now(),
        };

        let mut discovered = self.discovered.lock().expect("discovery state poisoned");
        discovered.push(event.clone());
        if discovered.len() > crate::agent::ACTION_LOG_LIMIT {
            discovered.remove(0);
        }

        Ok(Outcome::EventDiscovered { event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(seed: u64) -> DiscoveryAgent {
        let spec = AgentSpec {
            stage: "discovery".to_string(),
            name: "Scout".to_string(),
            strategy: None,
            specialty: Some("crypto".to_string()),
            audit_focus: None,
            governance_style: None,
            trading_strategy: None,
            seed: Some(seed),
        };
        DiscoveryAgent::new("discovery_1".to_string(), &spec, Arc::new(Reasoner::synthetic()))
    }

    #[tokio::test]
    async fn test_synthetic_path_yields_specialty_event() {
        let agent = agent(42);
        let decision = agent
            .decide(&WorkItem::Kickoff { at: Utc::now() })
            .await
            .unwrap();

        match decision {
            Decision::Discovery(d) => {
                assert_eq!(d.category, "crypto");
                assert!(d.confidence > 0.0);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_seeded_agents_are_deterministic() {
        let a = agent(7);
        let b = agent(7);
        let item = WorkItem::Kickoff { at: Utc::now() };

        let da = a.decide(&item).await.unwrap();
        let db = b.decide(&item).await.unwrap();
        assert_eq!(
            serde_json::to_value(&da).unwrap(),
            serde_json::to_value(&db).unwrap()
        );
    }

    #[tokio::test]
    async fn test_wrong_work_item_is_missing_input() {
        let agent = agent(1);
        let market = crate::market::Market {
            id: "mkt_x".to_string(),
            title: "t".to_string(),
            category: "c".to_string(),
            description: String::new(),
            outcomes: vec![],
            initial_probability: 0.5,
            liquidity: 0.0,
            fee: 0.0,
            resolution_source: String::new(),
            resolution_time: Utc::now(),
            status: crate::market::MarketStatus::Active,
            creator: String::new(),
            created_at: Utc::now(),
        };
        let result = agent.decide(&WorkItem::MarketReview(market)).await;
        assert!(matches!(result, Err(DecisionError::MissingInput(_))));
    }

    #[tokio::test]
    async fn test_act_produces_event_with_fresh_id() {
        let agent = agent(3);
        let decision = agent
            .decide(&WorkItem::Kickoff { at: Utc::now() })
            .await
            .unwrap();
        let outcome = agent.act(&decision).await.unwrap();

        match outcome {
            Outcome::EventDiscovered { event } => {
                assert!(event.id.starts_with("evt_"));
                assert_eq!(event.discoverer, "Scout");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(agent.discovered.lock().unwrap().len(), 1);
    }
}
