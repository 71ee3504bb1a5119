//! Frontier supervisor seam.
//!
//! The supervisor is an external, higher-capability reviewer and
//! arbitrator. The coordinator consumes it for three things only:
//! decomposing tasks, reviewing produced results, and resolving conflicts
//! between agents. Its transport and internals live behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::task::{ConflictTask, SubTask, Task};

/// Errors surfaced from the supervisor backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SupervisorError {
    #[error("supervisor transport error: {0}")]
    Transport(String),

    #[error("supervisor returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("supervisor is unavailable")]
    Unavailable,
}

/// Supervisor verdict on a produced result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorReview {
    /// Free-form feedback
    pub feedback: String,

    /// Whether the supervisor accepts the result
    pub approved: bool,

    /// Supervisor-assessed quality in [0, 1]
    pub quality_score: f64,
}

/// Supervisor verdict on an escalated conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorResolution {
    /// The adopted resolution
    pub resolution: String,

    /// Supervisor confidence in [0, 1]
    pub confidence: f64,
}

/// External reviewer/arbitrator consulted by the coordinator.
///
/// # Invariants
/// - `decompose()` returns subtasks in execution order; the coordinator
///   re-sequences them but never reorders
/// - No method panics; backend failures come back as `Err`
#[async_trait]
pub trait FrontierSupervisor: Send + Sync {
    /// Split a task into an ordered set of subtasks.
    ///
    /// An empty decomposition is reported by the coordinator as a
    /// decomposition failure, not silently executed as a no-op.
    async fn decompose(&self, task: &Task) -> Result<Vec<SubTask>, SupervisorError>;

    /// Review an execution output for a task.
    async fn review(&self, output: &str, task: &Task) -> Result<SupervisorReview, SupervisorError>;

    /// Arbitrate a disagreement between agents.
    async fn resolve_conflict(
        &self,
        conflict: &ConflictTask,
    ) -> Result<SupervisorResolution, SupervisorError>;
}
