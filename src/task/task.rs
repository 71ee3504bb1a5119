//! Core Task type and its submission-time attributes.
//!
//! # Invariants
//! - A task is immutable once submitted; execution state lives in results,
//!   not on the task
//! - `id` is unique within a coordinator's lifetime

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentRole;

/// Unique identifier for a task or subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling priority of a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// How much supervisory review a task's results receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupervisionLevel {
    /// No extra review
    None,
    /// Default: no additional supervisor call
    #[default]
    Minimal,
    /// Each produced result is reviewed by the frontier supervisor
    Full,
}

/// Coarse complexity estimate supplied at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Trivial,
    #[default]
    Moderate,
    Complex,
}

/// Errors from task construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("task description cannot be empty")]
    EmptyDescription,
}

/// A composite unit of work submitted to the coordinator.
///
/// Built with `Task::new` plus `with_*` decorators; there are no mutating
/// accessors after submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    description: String,
    priority: TaskPriority,
    required_capabilities: Vec<String>,
    supervision: SupervisionLevel,
    complexity: Complexity,
}

impl Task {
    /// Create a new task.
    ///
    /// # Errors
    /// Returns `TaskError::EmptyDescription` for an empty description.
    pub fn new(description: impl Into<String>) -> Result<Self, TaskError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(TaskError::EmptyDescription);
        }
        Ok(Self {
            id: TaskId::new(),
            description,
            priority: TaskPriority::default(),
            required_capabilities: Vec::new(),
            supervision: SupervisionLevel::default(),
            complexity: Complexity::default(),
        })
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_supervision(mut self, level: SupervisionLevel) -> Self {
        self.supervision = level;
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Require a capability tag from assigned agents.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn required_capabilities(&self) -> &[String] {
        &self.required_capabilities
    }

    pub fn supervision(&self) -> SupervisionLevel {
        self.supervision
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }
}

/// A question posed to multiple agents for a quorum-based decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusTask {
    /// The question every participant answers
    pub question: String,

    /// Roles whose agents participate; empty means all roles
    pub roles: Vec<AgentRole>,

    /// Minimum agreeing fraction in [0, 1]; `None` uses the configured
    /// default threshold
    pub threshold: Option<f64>,
}

impl ConsensusTask {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            roles: Vec::new(),
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_roles(mut self, roles: Vec<AgentRole>) -> Self {
        self.roles = roles;
        self
    }

    /// Roles that participate, defaulting to every role.
    pub fn participating_roles(&self) -> Vec<AgentRole> {
        if self.roles.is_empty() {
            AgentRole::ALL.to_vec()
        } else {
            self.roles.clone()
        }
    }
}

/// One agent's stated position in a disagreement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictPosition {
    pub agent: String,
    pub claim: String,
}

/// A disagreement escalated to the frontier supervisor for arbitration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictTask {
    /// What the disagreement is about
    pub description: String,

    /// The competing positions
    pub positions: Vec<ConflictPosition>,
}

impl ConflictTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            positions: Vec::new(),
        }
    }

    pub fn with_position(mut self, agent: impl Into<String>, claim: impl Into<String>) -> Self {
        self.positions.push(ConflictPosition {
            agent: agent.into(),
            claim: claim.into(),
        });
        self
    }
}
