//! Worker agents: identity, status, registry, and the invocation seam.
//!
//! The coordinator never talks to a model backend directly. Every subtask
//! execution goes through [`AgentInvoker`], so transports (and test
//! doubles) are injected at construction.

mod registry;
mod types;

pub use registry::{AgentRegistry, RegistryError};
pub use types::{Agent, AgentId, AgentResponse, AgentRole, AgentStatus};

use async_trait::async_trait;

use crate::task::SubTask;

/// Errors from invoking an agent backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvokeError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("invocation timed out")]
    Timeout,

    #[error("agent rejected the subtask: {0}")]
    Rejected(String),
}

/// Capability that runs one subtask on one agent.
///
/// # Invariants
/// - `invoke()` never panics; all failures are returned as `Err`
/// - An `Err` from one invocation must not affect sibling invocations
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Run `subtask` on `agent` and return its raw answer.
    async fn invoke(&self, agent: &Agent, subtask: &SubTask) -> Result<AgentResponse, InvokeError>;
}
