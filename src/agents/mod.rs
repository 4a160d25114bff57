//! Stage-specific strategy agents
//!
//! One concrete agent per pipeline stage, all behind the uniform
//! [`StageAgent`](crate::agent::StageAgent) contract. Each agent carries a
//! remote-reasoning path (prompt → provider → parsed decision) and a
//! synthetic path used whenever the provider is absent, unreachable, or
//! returns something unparsable.

pub mod audit;
pub mod discovery;
pub mod governance;
pub mod listing;
pub mod market_maker;
pub mod trading;

pub use audit::AuditAgent;
pub use discovery::DiscoveryAgent;
pub use governance::GovernanceAgent;
pub use listing::ListingAgent;
pub use market_maker::MarketMakerAgent;
pub use trading::TradingAgent;

use crate::agent::{Reasoner, StageAgent, StageKind};
use crate::config::AgentSpec;
use std::sync::Arc;

/// Build the concrete agent for a stage
///
/// Total over `StageKind`; the string-to-stage validation happens at the
/// registry boundary, so this table cannot fail at call time.
pub fn build_agent(
    stage: StageKind,
    id: String,
    spec: &AgentSpec,
    reasoner: Arc<Reasoner>,
) -> Arc<dyn StageAgent> {
    match stage {
        StageKind::Discovery => Arc::new(DiscoveryAgent::new(id, spec, reasoner)),
        StageKind::Listing => Arc::new(ListingAgent::new(id, spec, reasoner)),
        StageKind::Audit => Arc::new(AuditAgent::new(id, spec, reasoner)),
        StageKind::MarketMaker => Arc::new(MarketMakerAgent::new(id, spec, reasoner)),
        StageKind::Trading => Arc::new(TradingAgent::new(id, spec, reasoner)),
        StageKind::Governance => Arc::new(GovernanceAgent::new(id, spec, reasoner)),
    }
}
