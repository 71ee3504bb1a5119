//! Failure recovery - tracks failed agents and degraded-mode policy.

use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::agent::{Agent, AgentId};

/// Quality multiplier applied to results produced in degraded mode.
pub const DEGRADATION_FACTOR: f64 = 0.7;

/// Bookkeeper for agents that have been marked failed.
///
/// The registry holds the authoritative `Failed` status; this manager
/// keeps the failed set cheap to consult when filtering candidates, and
/// picks generic fallbacks.
#[derive(Debug, Default)]
pub struct FailureRecoveryManager {
    failed: RwLock<HashSet<AgentId>>,
}

impl FailureRecoveryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_failed(&self, id: AgentId) {
        self.failed.write().await.insert(id);
    }

    pub async fn is_failed(&self, id: AgentId) -> bool {
        self.failed.read().await.contains(&id)
    }

    pub async fn failed_count(&self) -> usize {
        self.failed.read().await.len()
    }

    /// Drop failed agents from a candidate set.
    pub async fn filter_available(&self, agents: Vec<Agent>) -> Vec<Agent> {
        let failed = self.failed.read().await;
        agents
            .into_iter()
            .filter(|a| !failed.contains(&a.id))
            .collect()
    }

    /// Any non-failed available agent, used as a generic substitute.
    pub async fn fallback_agent(&self, agents: &[Agent]) -> Option<Agent> {
        let failed = self.failed.read().await;
        agents
            .iter()
            .find(|a| a.status.is_available() && !failed.contains(&a.id))
            .cloned()
    }
}
