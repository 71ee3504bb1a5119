//! Agent registry - the single owner of mutable agent status.
//!
//! Status is mutated by several logical actors (the load balancer marks
//! agents busy, the executor releases them, failure recovery marks them
//! failed). All of those mutations go through this registry, behind one
//! lock, so concurrent task execution cannot lose updates.

use tokio::sync::RwLock;

use super::types::{Agent, AgentId, AgentRole, AgentStatus};

/// Errors from registry operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("agent {0} is already registered")]
    DuplicateAgent(AgentId),

    #[error("agent {0} is not registered")]
    UnknownAgent(AgentId),

    #[error("agent {id} is {status}, not available for assignment")]
    NotAvailable { id: AgentId, status: AgentStatus },
}

/// Registry of worker agents.
///
/// Agents are stored in registration order; that order is the stable
/// tie-break used by the load balancer.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<Vec<Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent.
    ///
    /// Duplicate ids are rejected; re-registering an agent is not an
    /// update operation.
    pub async fn register(&self, agent: Agent) -> Result<(), RegistryError> {
        let mut agents = self.agents.write().await;
        if agents.iter().any(|a| a.id == agent.id) {
            return Err(RegistryError::DuplicateAgent(agent.id));
        }
        tracing::info!(agent_id = %agent.id, role = %agent.role, name = %agent.name, "agent registered");
        agents.push(agent);
        Ok(())
    }

    /// All agents of a role that are currently available, in registration order.
    pub async fn find_by_role(&self, role: AgentRole) -> Vec<Agent> {
        self.agents
            .read()
            .await
            .iter()
            .filter(|a| a.role == role && a.status.is_available())
            .cloned()
            .collect()
    }

    /// Check whether any available agent covers a role.
    pub async fn has_available(&self, role: AgentRole) -> bool {
        self.agents
            .read()
            .await
            .iter()
            .any(|a| a.role == role && a.status.is_available())
    }

    /// All currently available agents, in registration order.
    pub async fn available_agents(&self) -> Vec<Agent> {
        self.agents
            .read()
            .await
            .iter()
            .filter(|a| a.status.is_available())
            .cloned()
            .collect()
    }

    /// Mark an agent busy for the duration of an assignment.
    ///
    /// Compare-and-set: fails unless the agent is `Available` at the time
    /// the lock is held, so two concurrent assignments can never both
    /// claim the same agent slot transition.
    pub async fn mark_busy(&self, id: AgentId) -> Result<(), RegistryError> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RegistryError::UnknownAgent(id))?;
        if !agent.status.is_available() {
            return Err(RegistryError::NotAvailable {
                id,
                status: agent.status,
            });
        }
        agent.status = AgentStatus::Busy;
        Ok(())
    }

    /// Release an agent after its assignment finished.
    ///
    /// Busy agents return to `Available`; a `Failed` agent stays failed
    /// even if its in-flight assignment completes afterwards.
    pub async fn release(&self, id: AgentId) {
        let mut agents = self.agents.write().await;
        if let Some(agent) = agents.iter_mut().find(|a| a.id == id) {
            if agent.status == AgentStatus::Busy {
                agent.status = AgentStatus::Available;
            }
        }
    }

    /// Mark an agent failed, excluding it from future assignment.
    pub async fn mark_failed(&self, id: AgentId) -> Result<(), RegistryError> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RegistryError::UnknownAgent(id))?;
        agent.status = AgentStatus::Failed;
        tracing::warn!(agent_id = %id, "agent marked failed");
        Ok(())
    }

    /// Look up one agent by id.
    pub async fn get(&self, id: AgentId) -> Option<Agent> {
        self.agents.read().await.iter().find(|a| a.id == id).cloned()
    }

    /// Current status of an agent, if registered.
    pub async fn status_of(&self, id: AgentId) -> Option<AgentStatus> {
        self.agents
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.status)
    }

    /// Snapshot of all registered agents, in registration order.
    pub async fn snapshot(&self) -> Vec<Agent> {
        self.agents.read().await.clone()
    }

    /// Number of registered agents (any status).
    pub async fn registered_count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Number of currently available agents.
    pub async fn available_count(&self) -> usize {
        self.agents
            .read()
            .await
            .iter()
            .filter(|a| a.status.is_available())
            .count()
    }
}
