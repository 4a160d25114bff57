//! Audit agent: compliance review of freshly created markets

use crate::agent::{
    AgentCore, AuditDecision, AuditIssue, AuditVerdict, Decision, Outcome, Reasoner, StageAgent,
    StageKind, WorkItem,
};
use crate::config::AgentSpec;
use crate::error::{ActionError, DecisionError};
use crate::market::Market;
use crate::observability::metrics::metrics;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Reviews market parameters and issues approve/reject/needs-revision verdicts
pub struct AuditAgent {
    core: AgentCore,
    reasoner: Arc<Reasoner>,
    focus: String,
    rng: Mutex<StdRng>,
    reviewed: Mutex<Vec<String>>,
}

impl AuditAgent {
    pub fn new(id: String, spec: &AgentSpec, reasoner: Arc<Reasoner>) -> Self {
        let focus = spec.audit_focus.clone().unwrap_or_else(|| "compliance".to_string());
        let rng = match spec.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            core: AgentCore::new(
                StageKind::Audit,
                id,
                spec.name.clone(),
                format!("market auditor ({focus})"),
            ),
            reasoner,
            focus,
            rng: Mutex::new(rng),
            reviewed: Mutex::new(Vec::new()),
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {name}, a prediction-market auditor focused on {focus}.\n\
             Review the market for clarity, fairness, manipulability and resolvability.\n\
             Reply with a JSON object:\n\
             {{\"decision\": \"approve|reject|needs_revision\", \"audit_score\": 85, \
             \"risk_level\": \"low|medium|high\", \
             \"issues\": [{{\"type\": \"...\", \"severity\": \"low|medium|high\", \
             \"description\": \"...\", \"suggestion\": \"...\"}}], \
             \"confidence\": 0.9, \"reasoning\": \"...\"}}",
            name = self.core.name(),
            focus = self.focus,
        )
    }

    fn user_prompt(&self, market: &Market) -> String {
        let market_json = serde_json::to_string_pretty(market).unwrap_or_default();
        format!("Audit this market:\n{market_json}\n\nOutput the audit verdict as JSON.")
    }

    /// Rule-based verdict from the market's own parameters
    fn synthetic_decision(&self, market: &Market) -> Decision {
        let mut issues = Vec::new();

        if market.title.trim().is_empty() {
            issues.push(AuditIssue {
                kind: "clarity".to_string(),
                severity: "high".to_string(),
                description: "market has no title".to_string(),
                suggestion: "state the predicted event and deadline in the title".to_string(),
            });
        }
        if market.outcomes.len() < 2 {
            issues.push(AuditIssue {
                kind: "structure".to_string(),
                severity: "high".to_string(),
                description: format!("only {} outcome(s) defined", market.outcomes.len()),
                suggestion: "a market needs at least two exclusive outcomes".to_string(),
            });
        }
        if market.fee <= 0.0 || market.fee > 0.1 {
            issues.push(AuditIssue {
                kind: "economics".to_string(),
                severity: "medium".to_string(),
                description: format!("trading fee {} is outside (0, 0.1]", market.fee),
                suggestion: "set the fee between 0.5% and 10%".to_string(),
            });
        }
        if market.liquidity <= 0.0 {
            issues.push(AuditIssue {
                kind: "economics".to_string(),
                severity: "high".to_string(),
                description: "no initial liquidity".to_string(),
                suggestion: "seed the book before opening".to_string(),
            });
        }
        if market.initial_probability <= 0.0 || market.initial_probability >= 1.0 {
            issues.push(AuditIssue {
                kind: "pricing".to_string(),
                severity: "medium".to_string(),
                description: format!(
                    "initial probability {} is not strictly inside (0, 1)",
                    market.initial_probability
                ),
                suggestion: "start the price inside the open unit interval".to_string(),
            });
        }

        let high_issues = issues.iter().filter(|i| i.severity == "high").count();
        let verdict = if high_issues > 0 {
            AuditVerdict::Reject
        } else if !issues.is_empty() {
            AuditVerdict::NeedsRevision
        } else {
            AuditVerdict::Approve
        };

        let (audit_score, risk_level) = match verdict {
            AuditVerdict::Approve => (85 + {
                let mut rng = self.rng.lock().expect("rng poisoned");
                rng.gen_range(0..10)
            }, "low"),
            AuditVerdict::NeedsRevision => (60, "medium"),
            AuditVerdict::Reject => (30, "high"),
        };

        Decision::Audit(AuditDecision {
            verdict,
            market_id: Some(market.id.clone()),
            audit_score,
            risk_level: risk_level.to_string(),
            issues,
            confidence: 0.9,
            reasoning: format!("{} review of {}", self.focus, market.id),
        })
    }
}

#[async_trait]
impl StageAgent for AuditAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn decide(&self, item: &WorkItem) -> Result<Decision, DecisionError> {
        let market = match item {
            WorkItem::MarketReview(market) => market,
            other => {
                return Err(DecisionError::MissingInput(format!(
                    "audit expects a market review item, got {other:?}"
                )))
            }
        };

        let value = match self
            .reasoner
            .decide_json(&self.system_prompt(), &self.user_prompt(market))
            .await
        {
            Ok(value) => value,
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Falling back to synthetic decision");
                metrics().llm_fallback();
                return Ok(self.synthetic_decision(market));
            }
        };

        match serde_json::from_value::<AuditDecision>(value) {
            Ok(mut decision) => {
                // The reply never carries the id; stamp it from the item so
                // approvals always reference a concrete market.
                decision.market_id = Some(market.id.clone());
                Ok(Decision::Audit(decision))
            }
            Err(e) => {
                debug!(agent = self.core.id(), error = %e, "Reply did not match schema");
                metrics().llm_fallback();
                Ok(self.synthetic_decision(market))
            }
        }
    }

    async fn act(&self, decision: &Decision) -> Result<Outcome, ActionError> {
        let decision = match decision {
            Decision::Audit(d) => d,
            other => {
                return Err(ActionError::InvalidDecision(format!(
                    "audit agent cannot apply {other:?}"
                )))
            }
        };

        let market_id = decision
            .market_id
            .clone()
            .ok_or_else(|| ActionError::InvalidDecision("audit decision lacks a market id".to_string()))?;

        let mut reviewed = self.reviewed.lock().expect("audit state poisoned");
        reviewed.push(market_id.clone());
        if reviewed.len() > crate::agent::ACTION_LOG_LIMIT {
            reviewed.remove(0);
        }

        Ok(Outcome::MarketAudited {
            market_id,
            verdict: decision.verdict,
            audit_score: decision.audit_score,
            risk_level: decision.risk_level.clone(),
            issues_found: decision.issues.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketStatus;
    use chrono::Utc;

    fn agent() -> AuditAgent {
        let spec = AgentSpec {
            stage: "audit".to_string(),
            name: "Auditor".to_string(),
            strategy: None,
            specialty: None,
            audit_focus: Some("compliance".to_string()),
            governance_style: None,
            trading_strategy: None,
            seed: Some(5),
        };
        AuditAgent::new("audit_1".to_string(), &spec, Arc::new(Reasoner::synthetic()))
    }

    fn market(fee: f64, liquidity: f64, outcomes: usize) -> Market {
        Market {
            id: "mkt_7".to_string(),
            title: "Rate cut at the next meeting?".to_string(),
            category: "finance".to_string(),
            description: "central bank policy".to_string(),
            outcomes: (0..outcomes).map(|i| format!("outcome_{i}")).collect(),
            initial_probability: 0.5,
            liquidity,
            fee,
            resolution_source: "official statement".to_string(),
            resolution_time: Utc::now(),
            status: MarketStatus::Active,
            creator: "Lister".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_well_formed_market_is_approved_with_id_stamped() {
        let agent = agent();
        let decision = agent
            .decide(&WorkItem::MarketReview(market(0.02, 20_000.0, 2)))
            .await
            .unwrap();

        let Decision::Audit(ref audit) = decision else {
            panic!("expected audit decision");
        };
        assert_eq!(audit.verdict, AuditVerdict::Approve);
        assert_eq!(audit.market_id.as_deref(), Some("mkt_7"));

        let outcome = agent.act(&decision).await.unwrap();
        match outcome {
            Outcome::MarketAudited {
                market_id, verdict, ..
            } => {
                assert_eq!(market_id, "mkt_7");
                assert_eq!(verdict, AuditVerdict::Approve);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_liquidity_market_is_rejected() {
        let agent = agent();
        let decision = agent
            .decide(&WorkItem::MarketReview(market(0.02, 0.0, 2)))
            .await
            .unwrap();

        let Decision::Audit(audit) = decision else {
            panic!("expected audit decision");
        };
        assert_eq!(audit.verdict, AuditVerdict::Reject);
        assert!(audit.issues.iter().any(|i| i.severity == "high"));
    }

    #[tokio::test]
    async fn test_out_of_band_fee_needs_revision() {
        let agent = agent();
        let decision = agent
            .decide(&WorkItem::MarketReview(market(0.5, 20_000.0, 2)))
            .await
            .unwrap();

        let Decision::Audit(audit) = decision else {
            panic!("expected audit decision");
        };
        assert_eq!(audit.verdict, AuditVerdict::NeedsRevision);
    }

    #[tokio::test]
    async fn test_scripted_reply_gets_market_id_stamped() {
        use crate::testing::MockProvider;

        let provider = Arc::new(MockProvider::scripted(vec![
            r#"{"decision": "approve", "audit_score": 91, "risk_level": "low", "confidence": 0.95}"#,
        ]));
        let reasoner = Arc::new(Reasoner::new(provider, "mock-model".to_string(), 0.2, 256));
        let spec = AgentSpec {
            stage: "audit".to_string(),
            name: "Auditor".to_string(),
            audit_focus: Some("compliance".to_string()),
            seed: Some(5),
            ..AgentSpec::default()
        };
        let agent = AuditAgent::new("audit_1".to_string(), &spec, reasoner);

        let decision = agent
            .decide(&WorkItem::MarketReview(market(0.02, 20_000.0, 2)))
            .await
            .unwrap();
        let Decision::Audit(audit) = decision else {
            panic!("expected audit decision");
        };
        assert_eq!(audit.verdict, AuditVerdict::Approve);
        assert_eq!(audit.audit_score, 91);
        // The reply carried no id; decide stamps it from the work item.
        assert_eq!(audit.market_id.as_deref(), Some("mkt_7"));
    }

    #[tokio::test]
    async fn test_act_without_market_id_is_invalid() {
        let agent = agent();
        let decision = Decision::Audit(AuditDecision {
            verdict: AuditVerdict::Approve,
            market_id: None,
            audit_score: 90,
            risk_level: "low".to_string(),
            issues: vec![],
            confidence: 0.9,
            reasoning: String::new(),
        });
        let result = agent.act(&decision).await;
        assert!(matches!(result, Err(ActionError::InvalidDecision(_))));
    }
}
