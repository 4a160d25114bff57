//! Thread-safe platform metrics
//!
//! Atomic counters tracking pipeline activity: cycles, stage runs, agent
//! executions, reasoning-service calls and registry growth. One global
//! collector serves both the in-process callers and the HTTP export.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Thread-safe metrics collector using atomics
pub struct MetricsCollector {
    // Pipeline metrics
    cycles_completed: AtomicU64,
    stages_run: AtomicU64,

    // Agent execution metrics
    executions_succeeded: AtomicU64,
    executions_failed: AtomicU64,

    // Reasoning-service metrics
    llm_calls: AtomicU64,
    llm_fallbacks: AtomicU64,

    // Registry growth metrics
    markets_created: AtomicU64,
    events_appended: AtomicU64,

    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            stages_run: AtomicU64::new(0),
            executions_succeeded: AtomicU64::new(0),
            executions_failed: AtomicU64::new(0),
            llm_calls: AtomicU64::new(0),
            llm_fallbacks: AtomicU64::new(0),
            markets_created: AtomicU64::new(0),
            events_appended: AtomicU64::new(0),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    // Pipeline metrics
    pub fn cycle_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stage_run(&self) {
        self.stages_run.fetch_add(1, Ordering::Relaxed);
    }

    // Agent execution metrics
    pub fn execution_succeeded(&self) {
        self.executions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn execution_failed(&self) {
        self.executions_failed.fetch_add(1, Ordering::Relaxed);
    }

    // Reasoning-service metrics
    pub fn llm_call(&self) {
        self.llm_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn llm_fallback(&self) {
        self.llm_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    // Registry growth metrics
    pub fn market_created(&self) {
        self.markets_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_appended(&self) {
        self.events_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset all counters (useful for testing)
    pub fn reset(&self) {
        self.cycles_completed.store(0, Ordering::Relaxed);
        self.stages_run.store(0, Ordering::Relaxed);
        self.executions_succeeded.store(0, Ordering::Relaxed);
        self.executions_failed.store(0, Ordering::Relaxed);
        self.llm_calls.store(0, Ordering::Relaxed);
        self.llm_fallbacks.store(0, Ordering::Relaxed);
        self.markets_created.store(0, Ordering::Relaxed);
        self.events_appended.store(0, Ordering::Relaxed);
        self.uptime_start.store(current_timestamp(), Ordering::Relaxed);
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        MetricsSnapshot {
            pipeline: PipelineMetrics {
                cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
                stages_run: self.stages_run.load(Ordering::Relaxed),
            },
            executions: ExecutionMetrics {
                succeeded: self.executions_succeeded.load(Ordering::Relaxed),
                failed: self.executions_failed.load(Ordering::Relaxed),
            },
            reasoning: ReasoningMetrics {
                llm_calls: self.llm_calls.load(Ordering::Relaxed),
                llm_fallbacks: self.llm_fallbacks.load(Ordering::Relaxed),
            },
            registries: RegistryMetrics {
                markets_created: self.markets_created.load(Ordering::Relaxed),
                events_appended: self.events_appended.load(Ordering::Relaxed),
            },
            uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub pipeline: PipelineMetrics,
    pub executions: ExecutionMetrics,
    pub reasoning: ReasoningMetrics,
    pub registries: RegistryMetrics,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct PipelineMetrics {
    pub cycles_completed: u64,
    pub stages_run: u64,
}

#[derive(Debug, Serialize)]
pub struct ExecutionMetrics {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Serialize)]
pub struct ReasoningMetrics {
    pub llm_calls: u64,
    pub llm_fallbacks: u64,
}

#[derive(Debug, Serialize)]
pub struct RegistryMetrics {
    pub markets_created: u64,
    pub events_appended: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
