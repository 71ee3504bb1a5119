//! Rolling performance counters.
//!
//! Counters are observational only; nothing in the pipeline reads them
//! back to make decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Point-in-time view of coordinator throughput.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub total_tasks: u64,
    pub successful_tasks: u64,

    /// `successful_tasks / total_tasks`, 0 when nothing ran yet
    pub success_rate: f64,

    /// Duration of the most recently completed pipeline
    pub last_duration_ms: Option<u64>,

    pub active_agents: usize,
    pub registered_agents: usize,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    successful: u64,
    last_duration_ms: Option<u64>,
}

/// Accumulator behind `PerformanceSnapshot`.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    counters: RwLock<Counters>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed pipeline.
    pub async fn record(&self, success: bool, duration_ms: u64) {
        let mut counters = self.counters.write().await;
        counters.total = counters.total.saturating_add(1);
        if success {
            counters.successful = counters.successful.saturating_add(1);
        }
        counters.last_duration_ms = Some(duration_ms);
    }

    /// Take a snapshot, annotated with current agent counts.
    pub async fn snapshot(&self, active_agents: usize, registered_agents: usize) -> PerformanceSnapshot {
        let counters = self.counters.read().await;
        let success_rate = if counters.total == 0 {
            0.0
        } else {
            counters.successful as f64 / counters.total as f64
        };
        PerformanceSnapshot {
            total_tasks: counters.total,
            successful_tasks: counters.successful,
            success_rate,
            last_duration_ms: counters.last_duration_ms,
            active_agents,
            registered_agents,
            taken_at: Utc::now(),
        }
    }
}
