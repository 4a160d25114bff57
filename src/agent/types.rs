//! Work items, decisions and outcomes exchanged across the agent contract
//!
//! `Decision` and `Outcome` are tagged unions with one variant per stage
//! family; the stage executor matches on them during propagation instead
//! of digging through untyped maps.

use crate::events::DiscoveredEvent;
use crate::market::Market;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit of input handed to one agent for one decide/act cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "item", rename_all = "snake_case")]
pub enum WorkItem {
    /// Discovery runs unconditionally once per agent per cycle
    Kickoff { at: DateTime<Utc> },
    /// A discovered event awaiting a listing decision
    Event(DiscoveredEvent),
    /// A created market awaiting audit
    MarketReview(Market),
    /// A registered market with simulated quote context for market making
    Quote {
        market: Market,
        mid_price: f64,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
    },
    /// A registered market with price history and signals for trading
    TradeContext {
        market: Market,
        mid_price: f64,
        price_history: Vec<f64>,
        signals: serde_json::Value,
    },
    /// An externally supplied governance docket entry
    Governance(GovernanceItem),
}

/// One order-book level
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

/// A matter put before the governance stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceItem {
    pub id: Uuid,
    pub kind: GovernanceItemKind,
    pub summary: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceItemKind {
    Proposal,
    Dispute,
    Resolution,
}

/// A structured decision produced by `decide`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Decision {
    Discovery(DiscoveryDecision),
    Listing(ListingDecision),
    Audit(AuditDecision),
    MarketMaking(MarketMakingDecision),
    Trading(TradingDecision),
    Governance(GovernanceDecision),
}

/// Discovery stage decision: a hot event worth listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryDecision {
    pub event_title: String,
    pub category: String,
    pub confidence: f64,
    pub market_potential: String,
    #[serde(default)]
    pub recommended_topics: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingVerdict {
    Create,
    Reject,
}

/// Listing stage decision: whether and how to create a market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDecision {
    #[serde(rename = "decision")]
    pub verdict: ListingVerdict,
    pub market_title: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub outcomes: Vec<String>,
    pub initial_probability: f64,
    pub initial_liquidity: f64,
    pub trading_fee: f64,
    #[serde(default)]
    pub resolution_source: String,
    #[serde(default)]
    pub resolution_time: Option<DateTime<Utc>>,
    pub confidence: f64,
    #[serde(default)]
    pub expected_volume: String,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditVerdict {
    Approve,
    Reject,
    NeedsRevision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditIssue {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub description: String,
    #[serde(default)]
    pub suggestion: String,
}

/// Audit stage decision
///
/// `market_id` is stamped by the auditing agent before the decision is
/// returned, so approve verdicts always reference a concrete market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDecision {
    #[serde(rename = "decision")]
    pub verdict: AuditVerdict,
    #[serde(default)]
    pub market_id: Option<String>,
    pub audit_score: u32,
    pub risk_level: String,
    #[serde(default)]
    pub issues: Vec<AuditIssue>,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteAction {
    ProvideLiquidity,
    AdjustPosition,
    Withdraw,
}

/// Market-making stage decision: a two-sided quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMakingDecision {
    /// Stamped by the quoting agent from the work item's market
    #[serde(default)]
    pub market_id: Option<String>,
    pub action: QuoteAction,
    pub bid_price: f64,
    pub bid_size: f64,
    pub ask_price: f64,
    pub ask_size: f64,
    #[serde(default)]
    pub target_inventory: f64,
    #[serde(default)]
    pub expected_profit: f64,
    #[serde(default)]
    pub risk_level: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Yes,
    No,
}

/// Trading stage decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingDecision {
    /// Stamped by the trading agent from the work item's market
    #[serde(default)]
    pub market_id: Option<String>,
    pub action: TradeAction,
    pub direction: Side,
    pub size: f64,
    pub price: f64,
    #[serde(default)]
    pub stop_loss: f64,
    #[serde(default)]
    pub take_profit: f64,
    pub confidence: f64,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub expected_return: f64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    For,
    Against,
    Abstain,
}

/// Governance stage decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceDecision {
    /// Stamped by the voting agent from the docket item
    #[serde(default)]
    pub item_id: Option<Uuid>,
    #[serde(rename = "decision")]
    pub vote: Vote,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// A structured result returned by `act`, inspected by the stage's
/// propagation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    EventDiscovered {
        event: DiscoveredEvent,
    },
    MarketCreated {
        market: Market,
        liquidity_provided: f64,
    },
    MarketRejected {
        reason: String,
    },
    MarketAudited {
        market_id: String,
        verdict: AuditVerdict,
        audit_score: u32,
        risk_level: String,
        issues_found: usize,
    },
    LiquidityQuoted {
        market_id: String,
        bid_price: f64,
        bid_size: f64,
        ask_price: f64,
        ask_size: f64,
        spread: f64,
    },
    LiquidityWithdrawn {
        market_id: String,
        reason: String,
    },
    TradePlaced {
        market_id: String,
        action: TradeAction,
        direction: Side,
        size: f64,
        price: f64,
    },
    TradeHeld {
        market_id: String,
        reason: String,
    },
    VoteCast {
        item_id: Uuid,
        vote: Vote,
        confidence: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_decision_wire_format() {
        // The prompt schema uses "decision": "create" | "reject".
        let json = r#"{
            "decision": "create",
            "market_title": "BTC above 70k in March",
            "category": "crypto",
            "description": "Bitcoin price prediction",
            "outcomes": ["yes", "no"],
            "initial_probability": 0.5,
            "initial_liquidity": 20000,
            "trading_fee": 0.02,
            "resolution_source": "exchange data",
            "confidence": 0.85,
            "expected_volume": "high",
            "reasoning": "clear resolution criteria"
        }"#;

        let decision: ListingDecision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.verdict, ListingVerdict::Create);
        assert_eq!(decision.outcomes.len(), 2);
        assert!(decision.resolution_time.is_none());
    }

    #[test]
    fn test_audit_decision_tolerates_missing_optionals() {
        let json = r#"{
            "decision": "needs_revision",
            "audit_score": 62,
            "risk_level": "medium",
            "confidence": 0.8
        }"#;

        let decision: AuditDecision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.verdict, AuditVerdict::NeedsRevision);
        assert!(decision.market_id.is_none());
        assert!(decision.issues.is_empty());
    }

    #[test]
    fn test_governance_vote_keyword_variant() {
        let json = r#"{"decision": "for", "confidence": 0.9}"#;
        let decision: GovernanceDecision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.vote, Vote::For);
        assert!(decision.item_id.is_none());
    }

    #[test]
    fn test_outcome_tagging() {
        let outcome = Outcome::MarketRejected {
            reason: "ambiguous resolution".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"market_rejected\""));
    }
}
