//! Typed event envelopes and the append-only event queue
//!
//! The queue hands qualifying outputs of one stage to the next stage's
//! input selection. Records are immutable after append and queue order is
//! append order. Reads are non-consuming: repeated selection returns the
//! same matured set until the queue grows. This mirrors the re-broadcast
//! behavior the pipeline was built around; `clear` is the operator's
//! relief valve against unbounded reprocessing.

use crate::market::Market;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Event types observed on the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Discovery output: a hot event worth turning into a market
    NewEvent,
    /// Listing output: a created market awaiting audit
    NewMarket,
    /// Audit output: an approved market
    MarketApproved,
}

/// A hot event identified by a discovery agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredEvent {
    pub id: String,
    pub title: String,
    pub category: String,
    pub confidence: f64,
    pub market_potential: String,
    pub description: String,
    pub sources: Vec<String>,
    pub discoverer: String,
    pub discovered_at: DateTime<Utc>,
}

static EVENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Allocate the next discovered-event identifier
pub fn next_event_id() -> String {
    let n = EVENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("evt_{n}")
}

/// Payload carried by an event record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "body_type", rename_all = "snake_case")]
pub enum EventBody {
    Discovered(DiscoveredEvent),
    Market(Market),
}

/// Immutable envelope appended by a stage's propagation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub kind: EventKind,
    pub body: EventBody,
    pub created_at: DateTime<Utc>,
}

/// Append-only, typed message log shared across stages
#[derive(Debug, Default)]
pub struct EventQueue {
    records: RwLock<Vec<EventRecord>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event; O(1), called only from the sequential propagation
    /// phase of a stage
    pub fn append(&self, kind: EventKind, body: EventBody) {
        let mut records = self.records.write().expect("event queue poisoned");
        records.push(EventRecord {
            kind,
            body,
            created_at: Utc::now(),
        });
    }

    /// Non-consuming read of all payloads matching `kind`, in append order
    pub fn select_by_kind(&self, kind: EventKind) -> Vec<EventBody> {
        let records = self.records.read().expect("event queue poisoned");
        records
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.body.clone())
            .collect()
    }

    /// Discovered events awaiting the listing stage
    pub fn pending_events(&self) -> Vec<DiscoveredEvent> {
        self.select_by_kind(EventKind::NewEvent)
            .into_iter()
            .filter_map(|body| match body {
                EventBody::Discovered(event) => Some(event),
                EventBody::Market(_) => None,
            })
            .collect()
    }

    /// Created markets awaiting the audit stage
    pub fn pending_markets(&self) -> Vec<Market> {
        self.select_by_kind(EventKind::NewMarket)
            .into_iter()
            .filter_map(|body| match body {
                EventBody::Market(market) => Some(market),
                EventBody::Discovered(_) => None,
            })
            .collect()
    }

    /// Full snapshot in append order
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records.read().expect("event queue poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("event queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.write().expect("event queue poisoned").clear();
    }
}
