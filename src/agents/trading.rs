//! Trading agent: signal-driven order placement with a simulated balance

use crate::agent::{
    AgentCore, Decision, Outcome, Reasoner, Side, StageAgent, StageKind, TradeAction,
    TradingDecision, WorkItem,
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

/// Simulated starting balance per trading agent
const STARTING_BALANCE: f64 = 10_000.0;

/// Places simulated trades against registered markets
pub struct TradingAgent {
    core: AgentCore,
    reasoner: Arc<Reasoner>,
    strategy: String,
    rng: Mutex<StdRng>,
    balance: Mutex<f64>,
    /// Net position per market id, in shares
    positions: Mutex<HashMap<String, f64>>,
}

impl TradingAgent {
    pub fn new(id: String, spec: &AgentSpec, reasoner: Arc<Reasoner>) -> Self {
        let strategy = spec
            .trading_strategy
            .clone()
            .or_else(|| spec.strategy.clone())
            .unwrap_or_else(|| "momentum".to_string());
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            core: AgentCore::new(
                StageKind::Trading,
                id,
                spec.name.clone(),
                format!("trading strategist ({strategy})"),
            ),
            reasoner,
            strategy,
            rng: Mutex::new(rng),
            balance: Mutex::new(STARTING_BALANCE),
            positions: Mutex::new(HashMap::new()),
        }
    }

    pub fn balance(&self) -> f64 {
        *self.balance.lock().expect("trading state poisoned")
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {name}, a prediction-market trader running a {strategy} strategy.\n\
             Given a market, its price history and signals, decide whether to trade.\n\
             Reply with a JSON object:\n\
             {{\"action\": \"buy|sell|hold\", \"direction\": \"yes|no\", \"size\": 100, \
             \"price\": 0.5, \"stop_loss\": 0.4, \"take_profit\": 0.7, \
             \"confidence\": 0.8, \"risk_level\": \"low|medium|high\", \
             \"expected_return\": 0.1, \"reasoning\": \"...\"}}",
            name = self.core.name(),
            strategy = self.strategy,
        )
    }

    fn user_prompt(&self, item: &WorkItem) -> String {
        let item_json = serde_json::to_string_pretty(item).unwrap_or_default();
        format!("Evaluate this trading opportunity:\n{item_json}\n\nOutput the trade as JSON.")
    }

    /// Momentum buys into a rising history, contrarian fades it; without
    /// history there is no signal and the agent holds.
    fn synthetic_decision(&self, market: &Market, mid_price: f64, history: &[f64]) -> Decision {
        let drift = match (history.first(), history.last()) {
            (Some(first), Some(last)) if history.len() >= 2 => last - first,
            _ => 0.0,
        };

        let (action, direction) = if drift.abs() < 1e-9 {
            (TradeAction::Hold, Side::Yes)
        } else {
            let rising = drift > 0.0;
            let follow = self.strategy != "contrarian";
            if rising == follow {
                (TradeAction::Buy, Side::Yes)
            } else {
                (TradeAction::Buy, Side::No)
            }
        };

        let (size, confidence) = {
            let mut rng = self.rng.lock().expect("rng poisoned");
            (
                (50.0 + rng.gen_range(0.0..150.0_f64)).round(),
                rng.gen_range(0.6..0.9),
            )
        };

        Decision::Trading(TradingDecision {
            market_id: Some(market.id.clone()),
            action,
            direction,
            size: if action == TradeAction::Hold { 0.0 } else { size },
            price: mid_price,
            stop_loss: (mid_price - 0.1).max(0.01),
            take_profit: (mid_price + 0.2).min(0.99),
            confidence,
            risk_level: "medium".to_string(),
            expected_return: drift.abs(),
            reasoning: format!("{} read on drift {drift:+.3}", self.strategy),
        })
    }
}

#[async_trait]
impl StageAgent for TradingAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn decide(&self, item: &WorkItem) -> Result<Decision, DecisionError> {
        let (market, mid_price, history) = match item {
            WorkItem::TradeContext {
                market,
                mid_price,
                price_history,
                ..
            } => (market, *mid_price, price_history.as_slice()),
            other => {
                return Err(DecisionError::MissingInput(format!(
                    "trading expects a trade context, got {other:?}"
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
                return Ok(self.synthetic_decision(market, mid_price, history));
            }
        };

        match serde_json::from_value::<TradingDecision>(value) {
            Ok(mut decision) => {
                decision.market_id = Some(market.id.clone());
                Ok(Decision::Trading(decision))
            }
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Reply did not match schema");
                metrics().llm_fallback();
                Ok(self.synthetic_decision(market, mid_price, history))
            }
        }
    }

    async fn act(&self, decision: &Decision) -> Result<Outcome, ActionError> {
        let decision = match decision {
            Decision::Trading(d) => d,
            other => {
                return Err(ActionError::InvalidDecision(format!(
                    "trading agent cannot apply {other:?}"
                )))
            }
        };

        let market_id = decision.market_id.clone().ok_or_else(|| {
            ActionError::InvalidDecision("trading decision lacks a market id".to_string())
        })?;

        match decision.action {
            TradeAction::Hold => Ok(Outcome::TradeHeld {
                market_id,
                reason: if decision.reasoning.is_empty() {
                    "no actionable signal".to_string()
                } else {
                    decision.reasoning.clone()
                },
            }),
            TradeAction::Buy => {
                let cost = decision.size * decision.price;
                let mut balance = self.balance.lock().expect("trading state poisoned");
                if cost > *balance {
                    return Err(ActionError::InsufficientFunds {
                        needed: cost,
                        available: *balance,
                    });
                }
                *balance -= cost;
                drop(balance);

                let mut positions = self.positions.lock().expect("trading state poisoned");
                *positions.entry(market_id.clone()).or_insert(0.0) += decision.size;

                Ok(Outcome::TradePlaced {
                    market_id,
                    action: TradeAction::Buy,
                    direction: decision.direction,
                    size: decision.size,
                    price: decision.price,
                })
            }
            TradeAction::Sell => {
                let mut positions = self.positions.lock().expect("trading state poisoned");
                let held = positions.get(&market_id).copied().unwrap_or(0.0);
                if held <= 0.0 {
                    return Ok(Outcome::TradeHeld {
                        market_id,
                        reason: "nothing to sell".to_string(),
                    });
                }
                let size = decision.size.min(held);
                *positions.get_mut(&market_id).expect("position exists") -= size;
                drop(positions);

                let mut balance = self.balance.lock().expect("trading state poisoned");
                *balance += size * decision.price;

                Ok(Outcome::TradePlaced {
                    market_id,
                    action: TradeAction::Sell,
                    direction: decision.direction,
                    size,
                    price: decision.price,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketStatus;
    use chrono::Utc;

    fn agent(strategy: &str) -> TradingAgent {
        let spec = AgentSpec {
            stage: "trading".to_string(),
            name: "Trader".to_string(),
            strategy: Some(strategy.to_string()),
            specialty: None,
            audit_focus: None,
            governance_style: None,
            trading_strategy: None,
            seed: Some(13),
        };
        TradingAgent::new("trading_1".to_string(), &spec, Arc::new(Reasoner::synthetic()))
    }

    fn context(history: Vec<f64>) -> WorkItem {
        WorkItem::TradeContext {
            market: Market {
                id: "mkt_5".to_string(),
                title: "Index above 5500?".to_string(),
                category: "finance".to_string(),
                description: String::new(),
                outcomes: vec!["yes".to_string(), "no".to_string()],
                initial_probability: 0.5,
                liquidity: 20_000.0,
                fee: 0.02,
                resolution_source: String::new(),
                resolution_time: Utc::now(),
                status: MarketStatus::Active,
                creator: "Lister".to_string(),
                created_at: Utc::now(),
            },
            mid_price: 0.5,
            price_history: history,
            signals: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_no_history_means_hold() {
        let agent = agent("momentum");
        let decision = agent.decide(&context(vec![])).await.unwrap();

        let outcome = agent.act(&decision).await.unwrap();
        assert!(matches!(outcome, Outcome::TradeHeld { .. }));
        assert_eq!(agent.balance(), STARTING_BALANCE);
    }

    #[tokio::test]
    async fn test_momentum_buys_yes_into_rising_prices() {
        let agent = agent("momentum");
        let decision = agent
            .decide(&context(vec![0.40, 0.45, 0.52]))
            .await
            .unwrap();

        let Decision::Trading(ref d) = decision else {
            panic!("expected trading decision");
        };
        assert_eq!(d.action, TradeAction::Buy);
        assert_eq!(d.direction, Side::Yes);

        let outcome = agent.act(&decision).await.unwrap();
        assert!(matches!(outcome, Outcome::TradePlaced { .. }));
        assert!(agent.balance() < STARTING_BALANCE);
    }

    #[tokio::test]
    async fn test_contrarian_fades_rising_prices() {
        let agent = agent("contrarian");
        let decision = agent
            .decide(&context(vec![0.40, 0.45, 0.52]))
            .await
            .unwrap();

        let Decision::Trading(d) = decision else {
            panic!("expected trading decision");
        };
        assert_eq!(d.action, TradeAction::Buy);
        assert_eq!(d.direction, Side::No);
    }

    #[tokio::test]
    async fn test_oversized_order_is_insufficient_funds() {
        let agent = agent("momentum");
        let decision = Decision::Trading(TradingDecision {
            market_id: Some("mkt_5".to_string()),
            action: TradeAction::Buy,
            direction: Side::Yes,
            size: 1_000_000.0,
            price: 0.5,
            stop_loss: 0.4,
            take_profit: 0.7,
            confidence: 0.9,
            risk_level: "high".to_string(),
            expected_return: 0.1,
            reasoning: String::new(),
        });

        let result = agent.act(&decision).await;
        assert!(matches!(
            result,
            Err(ActionError::InsufficientFunds { .. })
        ));
        assert_eq!(agent.balance(), STARTING_BALANCE);
    }

    #[tokio::test]
    async fn test_sell_without_position_holds() {
        let agent = agent("momentum");
        let decision = Decision::Trading(TradingDecision {
            market_id: Some("mkt_5".to_string()),
            action: TradeAction::Sell,
            direction: Side::Yes,
            size: 10.0,
            price: 0.5,
            stop_loss: 0.0,
            take_profit: 0.0,
            confidence: 0.5,
            risk_level: "low".to_string(),
            expected_return: 0.0,
            reasoning: String::new(),
        });

        let outcome = agent.act(&decision).await.unwrap();
        assert!(matches!(outcome, Outcome::TradeHeld { .. }));
    }
}
