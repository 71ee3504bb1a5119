//! Decomposition units and their pairing with agents.
//!
//! Subtasks are produced by the frontier supervisor's decomposition and
//! consumed by the load balancer; the coordinator never interprets task
//! content itself.

use serde::{Deserialize, Serialize};

use super::TaskId;
use crate::agent::{Agent, AgentRole};

/// An indivisible unit of work derived from decomposing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    /// Identifier of this subtask
    pub id: TaskId,

    /// The task this subtask was decomposed from
    pub parent_id: TaskId,

    /// What this subtask should accomplish
    pub description: String,

    /// Role required to execute it
    pub role: AgentRole,

    /// Position in the decomposition order
    pub sequence: usize,
}

impl SubTask {
    /// Create a new subtask under a parent task.
    pub fn new(parent_id: TaskId, description: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: TaskId::new(),
            parent_id,
            description: description.into(),
            role,
            sequence: 0,
        }
    }

    /// Set the position in the decomposition order.
    pub fn with_sequence(mut self, sequence: usize) -> Self {
        self.sequence = sequence;
        self
    }
}

/// Pairing of a subtask with the agent chosen to run it.
///
/// # Invariants
/// - The agent was observed `Available` when the assignment was planned;
///   the executor re-checks with a compare-and-set before dispatch
/// - `agent.role == subtask.role`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub subtask: SubTask,

    /// Snapshot of the chosen agent at assignment time
    pub agent: Agent,
}

impl TaskAssignment {
    pub fn new(subtask: SubTask, agent: Agent) -> Self {
        debug_assert_eq!(subtask.role, agent.role);
        Self { subtask, agent }
    }
}
