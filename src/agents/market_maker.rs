//! Market-maker agent: two-sided quoting around the mid price

use crate::agent::{
    AgentCore, Decision, MarketMakingDecision, Outcome, QuoteAction, Reasoner, StageAgent,
    StageKind, WorkItem,
};
use crate::config::AgentSpec;
use crate::error::{ActionError, DecisionError};
use crate::market::Market;
use crate::observability::metrics::metrics;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Quoting parameters per strategy
#[derive(Debug, Clone, Copy)]
struct QuoteModel {
    half_spread: f64,
    size: f64,
}

fn quote_model(strategy: &str) -> QuoteModel {
    match strategy {
        "tight_spread" => QuoteModel {
            half_spread: 0.01,
            size: 2_000.0,
        },
        "wide_spread" => QuoteModel {
            half_spread: 0.05,
            size: 500.0,
        },
        _ => QuoteModel {
            half_spread: 0.025,
            size: 1_000.0,
        },
    }
}

/// Provides liquidity by posting symmetric bid/ask quotes
pub struct MarketMakerAgent {
    core: AgentCore,
    reasoner: Arc<Reasoner>,
    strategy: String,
    rng: Mutex<StdRng>,
    /// Open quote per market id (bid, ask)
    quotes: Mutex<HashMap<String, (f64, f64)>>,
}

impl MarketMakerAgent {
    pub fn new(id: String, spec: &AgentSpec, reasoner: Arc<Reasoner>) -> Self {
        let strategy = spec
            .strategy
            .clone()
            .unwrap_or_else(|| "adaptive".to_string());
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            core: AgentCore::new(
                StageKind::MarketMaker,
                id,
                spec.name.clone(),
                format!("liquidity provider ({strategy})"),
            ),
            reasoner,
            strategy,
            rng: Mutex::new(rng),
            quotes: Mutex::new(HashMap::new()),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {name}, a market maker running a {strategy} quoting strategy.\n\
             Given a market and its current order book, decide how to quote.\n\
             Reply with a JSON object:\n\
             {{\"action\": \"provide_liquidity|adjust_position|withdraw\", \
             \"bid_price\": 0.48, \"bid_size\": 1000, \"ask_price\": 0.52, \"ask_size\": 1000, \
             \"target_inventory\": 0, \"expected_profit\": 0.02, \
             \"risk_level\": \"low|medium|high\", \"confidence\": 0.85, \"reasoning\": \"...\"}}",
            name = self.core.name(),
            strategy = self.strategy,
        )
    }

    fn user_prompt(&self, item: &WorkItem) -> String {
        let item_json = serde_json::to_string_pretty(item).unwrap_or_default();
        format!("Quote this market:\n{item_json}\n\nOutput the quoting decision as JSON.")
    }

    /// Symmetric quote around the mid at the strategy's half spread
    fn synthetic_decision(&self, market: &Market, mid_price: f64) -> Decision {
        let model = quote_model(&self.strategy);
        let bid_price = (mid_price - model.half_spread).max(0.01);
        let ask_price = (mid_price + model.half_spread).min(0.99);

        let confidence = {
            let mut rng = self.rng.lock().expect("rng poisoned");
            rng.gen_range(0.7..0.9)
        };

        Decision::MarketMaking(MarketMakingDecision {
            market_id: Some(market.id.clone()),
            action: QuoteAction::ProvideLiquidity,
            bid_price,
            bid_size: model.size,
            ask_price,
            ask_size: model.size,
            target_inventory: 0.0,
            expected_profit: ask_price - bid_price,
            risk_level: "low".to_string(),
            confidence,
            reasoning: format!("{} quote around mid {mid_price}", self.strategy),
        })
    }
}

#[async_trait]
impl StageAgent for MarketMakerAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn decide(&self, item: &WorkItem) -> Result<Decision, DecisionError> {
        let (market, mid_price) = match item {
            WorkItem::Quote {
                market, mid_price, ..
            } => (market, *mid_price),
            other => {
                return Err(DecisionError::MissingInput(format!(
                    "market making expects a quote item, got {other:?}"
                )))
            }
        };

        let value = match self
            .reasoner
            .decide_json(&self.system_prompt(), &self.user_prompt(item))
            .await
        {
            Ok(value) => value,
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Falling back to synthetic decision");
                metrics().llm_fallback();
                return Ok(self.synthetic_decision(market, mid_price));
            }
        };

        match serde_json::from_value::<MarketMakingDecision>(value) {
            Ok(mut decision) => {
                decision.market_id = Some(market.id.clone());
                Ok(Decision::MarketMaking(decision))
            }
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Reply did not match schema");
                metrics().llm_fallback();
                Ok(self.synthetic_decision(market, mid_price))
            }
        }
    }

    async fn act(&self, decision: &Decision) -> Result<Outcome, ActionError> {
        let decision = match decision {
            Decision::MarketMaking(d) => d,
            other => {
                return Err(ActionError::InvalidDecision(format!(
                    "market maker cannot apply {other:?}"
                )))
            }
        };

        let market_id = decision.market_id.clone().ok_or_else(|| {
            ActionError::InvalidDecision("quoting decision lacks a market id".to_string())
        })?;

        let mut quotes = self.quotes.lock().expect("quote state poisoned");
        match decision.action {
            QuoteAction::Withdraw => {
                quotes.remove(&market_id);
                Ok(Outcome::LiquidityWithdrawn {
                    market_id,
                    reason: if decision.reasoning.is_empty() {
                        "risk limits reached".to_string()
                    } else {
                        decision.reasoning.clone()
                    },
                })
            }
            QuoteAction::ProvideLiquidity | QuoteAction::AdjustPosition => {
                if decision.bid_price >= decision.ask_price {
                    return Err(ActionError::InvalidDecision(format!(
                        "crossed quote: bid {} >= ask {}",
                        decision.bid_price, decision.ask_price
                    )));
                }
                quotes.insert(market_id.clone(), (decision.bid_price, decision.ask_price));
                Ok(Outcome::LiquidityQuoted {
                    market_id,
                    bid_price: decision.bid_price,
                    bid_size: decision.bid_size,
                    ask_price: decision.ask_price,
                    ask_size: decision.ask_size,
                    spread: decision.ask_price - decision.bid_price,
                })
            }
        }
    }
}
