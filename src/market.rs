//! Market records and the shared market registry
//!
//! The registry is process-wide shared state owned by the orchestrator.
//! All writes happen inside a stage's sequential propagation step, so a
//! plain `RwLock<HashMap>` is sufficient; callers must not depend on
//! `list_all` ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Lifecycle status of a market
///
/// The pipeline only ever produces `Active`; resolution and disputes are
/// settled outside this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Active,
    Resolved,
    Disputed,
}

/// A prediction market created by the listing stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub outcomes: Vec<String>,
    pub initial_probability: f64,
    pub liquidity: f64,
    pub fee: f64,
    pub resolution_source: String,
    pub resolution_time: DateTime<Utc>,
    pub status: MarketStatus,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

static MARKET_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Allocate the next market identifier
///
/// Identifiers are assigned once and never reused for the process
/// lifetime, even when a listing decision is later rejected by audit.
pub fn next_market_id() -> String {
    let n = MARKET_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("mkt_{n}")
}

/// Shared mapping from market id to market record
///
/// Mutated by the listing stage's propagation step, read by audit,
/// market-making and trading stages.
#[derive(Debug, Default)]
pub struct MarketRegistry {
    markets: RwLock<HashMap<String, Market>>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a market by id (last write wins)
    pub fn put(&self, market: Market) {
        let mut markets = self.markets.write().expect("market registry poisoned");
        markets.insert(market.id.clone(), market);
    }

    pub fn get(&self, id: &str) -> Option<Market> {
        let markets = self.markets.read().expect("market registry poisoned");
        markets.get(id).cloned()
    }

    /// Snapshot of all markets; iteration order is not guaranteed
    pub fn list_all(&self) -> Vec<Market> {
        let markets = self.markets.read().expect("market registry poisoned");
        markets.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.markets.read().expect("market registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_market(id: &str, title: &str) -> Market {
        Market {
            id: id.to_string(),
            title: title.to_string(),
            category: "crypto".to_string(),
            description: "test market".to_string(),
            outcomes: vec!["yes".to_string(), "no".to_string()],
            initial_probability: 0.5,
            liquidity: 20_000.0,
            fee: 0.02,
            resolution_source: "official data".to_string(),
            resolution_time: Utc::now(),
            status: MarketStatus::Active,
            creator: "tester".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_put_and_get() {
        let registry = MarketRegistry::new();
        registry.put(sample_market("mkt_a", "BTC above 70k"));

        let market = registry.get("mkt_a").unwrap();
        assert_eq!(market.title, "BTC above 70k");
        assert_eq!(market.status, MarketStatus::Active);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let registry = MarketRegistry::new();
        assert!(registry.get("mkt_missing").is_none());
    }

    #[test]
    fn test_put_overwrites_by_id() {
        let registry = MarketRegistry::new();
        registry.put(sample_market("mkt_a", "first title"));
        registry.put(sample_market("mkt_a", "second title"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("mkt_a").unwrap().title, "second title");

        let all = registry.list_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "second title");
    }

    #[test]
    fn test_market_ids_are_unique() {
        let a = next_market_id();
        let b = next_market_id();
        assert_ne!(a, b);
        assert!(a.starts_with("mkt_"));
    }

    #[test]
    fn test_market_serialization_round_trip() {
        let market = sample_market("mkt_1", "ETH ETF approved by May");
        let json = serde_json::to_string(&market).unwrap();
        let back: Market = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, market.id);
        assert_eq!(back.outcomes, market.outcomes);
    }
}
