//! Core types for the worker-agent pool.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Create a new unique agent ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::str::FromStr for AgentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Specialization of a worker agent.
///
/// Every subtask produced by decomposition targets exactly one role, and the
/// load balancer only routes a subtask to an agent of that role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Gathers background information
    Research,
    /// Interprets and evaluates gathered material
    Analysis,
    /// Produces code or other concrete artifacts
    Code,
    /// Checks produced artifacts against the request
    Validation,
}

impl AgentRole {
    /// All roles, in the order result slots are reported.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Research,
        AgentRole::Analysis,
        AgentRole::Code,
        AgentRole::Validation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Analysis => "analysis",
            Self::Code => "code",
            Self::Validation => "validation",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Availability of an agent.
///
/// # State Machine
/// ```text
/// Available -> Busy      (assignment dispatched)
/// Busy      -> Available (assignment finished, success or not)
/// Available -> Failed    (failure marked)
/// Busy      -> Failed    (failure marked mid-flight)
/// ```
/// `Failed` is terminal until the agent is re-registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Ready to accept an assignment
    Available,
    /// Currently executing an assignment
    Busy,
    /// Marked failed; excluded from assignment
    Failed,
}

impl AgentStatus {
    /// Check whether the agent can accept a new assignment.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Busy => write!(f, "busy"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A specialized worker agent.
///
/// # Invariants
/// - `id` is unique within a registry (enforced at registration)
/// - `status` is only mutated through the registry, never directly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier
    pub id: AgentId,

    /// Human-readable name
    pub name: String,

    /// Specialization
    pub role: AgentRole,

    /// Backing model identifier (opaque to the coordinator)
    pub model: String,

    /// Capability tags advertised by this agent
    pub capabilities: Vec<String>,

    /// Current availability
    pub status: AgentStatus,
}

impl Agent {
    /// Create a new available agent.
    pub fn new(name: impl Into<String>, role: AgentRole, model: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            role,
            model: model.into(),
            capabilities: Vec::new(),
            status: AgentStatus::Available,
        }
    }

    /// Add a capability tag.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Add multiple capability tags.
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    /// Check whether this agent advertises a capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Raw answer from invoking an agent on one subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Output produced by the agent
    pub output: String,

    /// Self-reported confidence in [0, 1]
    pub confidence: f64,

    /// Model that actually served the invocation (if known)
    pub model_used: Option<String>,
}

impl AgentResponse {
    /// Create a response, clamping confidence into [0, 1].
    pub fn new(output: impl Into<String>, confidence: f64) -> Self {
        Self {
            output: output.into(),
            confidence: confidence.clamp(0.0, 1.0),
            model_used: None,
        }
    }

    /// Record the model that served the invocation.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }
}
