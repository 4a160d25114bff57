//! Agent contract and shared agent infrastructure
//!
//! Every stage agent, regardless of strategy, implements the same
//! decide/act/record state machine defined here. The registry holds the
//! built instances; the reasoning helpers cover prompt dispatch and
//! decision-JSON extraction.

pub mod contract;
pub mod reasoning;
pub mod registry;
pub mod types;

pub use contract::{
    ActionLogEntry, AgentCore, AgentSnapshot, AgentStatus, ExecutionRecord, PerformanceCounters,
    StageAgent, ACTION_LOG_LIMIT,
};
pub use reasoning::{parse_decision_json, Reasoner};
pub use registry::AgentRegistry;
pub use types::*;

use crate::error::PlatformError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One phase of the fixed six-phase pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Discovery,
    Listing,
    Audit,
    MarketMaker,
    Trading,
    Governance,
}

impl StageKind {
    /// All stages in fixed pipeline order
    pub const ALL: [StageKind; 6] = [
        StageKind::Discovery,
        StageKind::Listing,
        StageKind::Audit,
        StageKind::MarketMaker,
        StageKind::Trading,
        StageKind::Governance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Discovery => "discovery",
            StageKind::Listing => "listing",
            StageKind::Audit => "audit",
            StageKind::MarketMaker => "market_maker",
            StageKind::Trading => "trading",
            StageKind::Governance => "governance",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery" => Ok(StageKind::Discovery),
            "listing" => Ok(StageKind::Listing),
            "audit" => Ok(StageKind::Audit),
            "market_maker" => Ok(StageKind::MarketMaker),
            "trading" => Ok(StageKind::Trading),
            "governance" => Ok(StageKind::Governance),
            other => Err(PlatformError::UnknownStageType(other.to_string())),
        }
    }
}
