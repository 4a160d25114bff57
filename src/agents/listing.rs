//! Listing agent: market evaluation, pricing and liquidity configuration

use crate::agent::{
    AgentCore, Decision, ListingDecision, ListingVerdict, Outcome, Reasoner, StageAgent,
    StageKind, WorkItem,
};
use crate::config::AgentSpec;
use crate::error::{ActionError, DecisionError};
use crate::events::DiscoveredEvent;
use crate::market::{next_market_id, Market, MarketStatus};
use crate::observability::metrics::metrics;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Pricing parameters per listing strategy
#[derive(Debug, Clone, Copy)]
struct PricingModel {
    initial_liquidity: f64,
    trading_fee: f64,
}

fn pricing_model(strategy: &str) -> PricingModel {
    match strategy {
        "aggressive" => PricingModel {
            initial_liquidity: 50_000.0,
            trading_fee: 0.02,
        },
        "conservative" => PricingModel {
            initial_liquidity: 5_000.0,
            trading_fee: 0.05,
        },
        _ => PricingModel {
            initial_liquidity: 20_000.0,
            trading_fee: 0.02,
        },
    }
}

/// Evaluates discovered events and creates prediction markets
pub struct ListingAgent {
    core: AgentCore,
    reasoner: Arc<Reasoner>,
    strategy: String,
    rng: Mutex<StdRng>,
    created: Mutex<Vec<String>>,
}

impl ListingAgent {
    pub fn new(id: String, spec: &AgentSpec, reasoner: Arc<Reasoner>) -> Self {
        let strategy = spec.strategy.clone().unwrap_or_else(|| "balanced".to_string());
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            core: AgentCore::new(
                StageKind::Listing,
                id,
                spec.name.clone(),
                format!("market listing strategist ({strategy})"),
            ),
            reasoner,
            strategy,
            rng: Mutex::new(rng),
            created: Mutex::new(Vec::new()),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {name}, a prediction-market listing strategist using a {strategy} strategy.\n\
             Evaluate whether the event should become a market and design its parameters.\n\
             Reply with a JSON object:\n\
             {{\"decision\": \"create|reject\", \"market_title\": \"...\", \"category\": \"...\", \
             \"description\": \"...\", \"outcomes\": [\"yes\", \"no\"], \
             \"initial_probability\": 0.5, \"initial_liquidity\": 20000, \"trading_fee\": 0.02, \
             \"resolution_source\": \"...\", \"resolution_time\": \"RFC3339 timestamp\", \
             \"confidence\": 0.85, \"expected_volume\": \"high|medium|low\", \"reasoning\": \"...\"}}",
            name = self.core.name(),
            strategy = self.strategy,
        )
    }

    fn user_prompt(&self, event: &DiscoveredEvent) -> String {
        let event_json = serde_json::to_string_pretty(event).unwrap_or_default();
        let model = pricing_model(&self.strategy);
        format!(
            "Evaluate this discovered event for listing:\n{event_json}\n\n\
             Strategy parameters: initial_liquidity={}, trading_fee={}.\n\
             Output the listing decision as JSON.",
            model.initial_liquidity, model.trading_fee,
        )
    }

    /// Deterministic verdict from the event's own quality signals; only the
    /// numeric jitter comes from the RNG
    fn synthetic_decision(&self, event: &DiscoveredEvent) -> Decision {
        let model = pricing_model(&self.strategy);
        let verdict = if event.confidence >= 0.55 && event.market_potential != "low" {
            ListingVerdict::Create
        } else {
            ListingVerdict::Reject
        };

        let confidence = {
            let mut rng = self.rng.lock().expect("rng poisoned");
            rng.gen_range(0.7..0.95)
        };

        Decision::Listing(ListingDecision {
            verdict,
            market_title: format!("{}?", event.title),
            category: event.category.clone(),
            description: event.description.clone(),
            outcomes: vec!["yes".to_string(), "no".to_string()],
            initial_probability: 0.5,
            initial_liquidity: model.initial_liquidity,
            trading_fee: model.trading_fee,
            resolution_source: "official data".to_string(),
            resolution_time: Some(Utc::now() + Duration::days(30)),
            confidence,
            expected_volume: event.market_potential.clone(),
            reasoning: format!("{} strategy evaluation of {}", self.strategy, event.id),
        })
    }
}

#[async_trait]
impl StageAgent for ListingAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn decide(&self, item: &WorkItem) -> Result<Decision, DecisionError> {
        let event = match item {
            WorkItem::Event(event) => event,
            other => {
                return Err(DecisionError::MissingInput(format!(
                    "listing expects a discovered event, got {other:?}"
                )))
            }
        };

        let value = match self
            .reasoner
            .decide_json(&self.system_prompt(), &self.user_prompt(event))
            .await
        {
            Ok(value) => value,
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Falling back to synthetic decision");
                metrics().llm_fallback();
                return Ok(self.synthetic_decision(event));
            }
        };

        match serde_json::from_value::<ListingDecision>(value) {
            Ok(decision) => Ok(Decision::Listing(decision)),
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Reply did not match schema");
                metrics().llm_fallback();
                Ok(self.synthetic_decision(event))
            }
        }
    }

    async fn act(&self, decision: &Decision) -> Result<Outcome, ActionError> {
        let decision = match decision {
            Decision::Listing(d) => d,
            other => {
                return Err(ActionError::InvalidDecision(format!(
                    "listing agent cannot apply {other:?}"
                )))
            }
        };

        if decision.verdict == ListingVerdict::Reject {
            return Ok(Outcome::MarketRejected {
                reason: if decision.reasoning.is_empty() {
                    "event below listing bar".to_string()
                } else {
                    decision.reasoning.clone()
                },
            });
        }

        let market = Market {
            id: next_market_id(),
            title: decision.market_title.clone(),
            category: decision.category.clone(),
            description: decision.description.clone(),
            outcomes: decision.outcomes.clone(),
            initial_probability: decision.initial_probability,
            liquidity: decision.initial_liquidity,
            fee: decision.trading_fee,
            resolution_source: decision.resolution_source.clone(),
            resolution_time: decision
                .resolution_time
                .unwrap_or_else(|| Utc::now() + Duration::days(30)),
            status: MarketStatus::Active,
            creator: self.core.name().to_string(),
            created_at: Utc::now(),
        };

        let mut created = self.created.lock().expect("listing state poisoned");
        created.push(market.id.clone());
        if created.len() > crate::agent::ACTION_LOG_LIMIT {
            created.remove(0);
        }

        Ok(Outcome::MarketCreated {
            liquidity_provided: market.liquidity,
            market,
        })
    }
}
