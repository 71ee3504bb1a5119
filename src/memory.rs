//! Memory store seam for task context and execution history.
//!
//! Persistence of coordination records is delegated to an external store.
//! Store failures are reported to callers of this trait but the
//! coordinator treats them as non-fatal: a task never fails because its
//! history could not be written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::agent::AgentId;
use crate::task::{AggregatedResult, Task, TaskId};

/// Errors from the memory backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MemoryError {
    #[error("memory store error: {0}")]
    Storage(String),
}

/// One execution event: an agent ran work for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub recorded_at: DateTime<Utc>,
}

/// Context shared across agents through the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedContext {
    /// Lookup key
    pub key: String,

    /// Arbitrary context payload
    pub content: serde_json::Value,

    /// Agent that produced the context, if any
    pub source_agent: Option<AgentId>,

    pub shared_at: DateTime<Utc>,
}

impl SharedContext {
    pub fn new(key: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            content,
            source_agent: None,
            shared_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, agent_id: AgentId) -> Self {
        self.source_agent = Some(agent_id);
        self
    }
}

/// External persistence for coordination records.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist the context of a submitted task.
    async fn store_task_context(&self, task: &Task) -> Result<(), MemoryError>;

    /// Record that an agent executed work for a task.
    async fn store_execution(&self, task_id: TaskId, agent_id: AgentId) -> Result<(), MemoryError>;

    /// Persist the aggregated result of a task.
    async fn store_aggregated_result(&self, result: &AggregatedResult) -> Result<(), MemoryError>;

    /// Share context across agents.
    async fn share_context(&self, context: SharedContext) -> Result<(), MemoryError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    task_contexts: Vec<Task>,
    executions: Vec<ExecutionRecord>,
    results: Vec<AggregatedResult>,
    contexts: Vec<SharedContext>,
}

/// In-memory reference store.
///
/// Backs tests and standalone use; a production deployment injects its
/// own `MemoryStore` implementation instead.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task contexts stored so far.
    pub async fn task_contexts(&self) -> Vec<Task> {
        self.inner.lock().await.task_contexts.clone()
    }

    /// Execution records stored so far.
    pub async fn executions(&self) -> Vec<ExecutionRecord> {
        self.inner.lock().await.executions.clone()
    }

    /// Aggregated results stored so far.
    pub async fn results(&self) -> Vec<AggregatedResult> {
        self.inner.lock().await.results.clone()
    }

    /// Shared contexts stored so far.
    pub async fn shared_contexts(&self) -> Vec<SharedContext> {
        self.inner.lock().await.contexts.clone()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn store_task_context(&self, task: &Task) -> Result<(), MemoryError> {
        self.inner.lock().await.task_contexts.push(task.clone());
        Ok(())
    }

    async fn store_execution(&self, task_id: TaskId, agent_id: AgentId) -> Result<(), MemoryError> {
        self.inner.lock().await.executions.push(ExecutionRecord {
            task_id,
            agent_id,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    async fn store_aggregated_result(&self, result: &AggregatedResult) -> Result<(), MemoryError> {
        self.inner.lock().await.results.push(result.clone());
        Ok(())
    }

    async fn share_context(&self, context: SharedContext) -> Result<(), MemoryError> {
        self.inner.lock().await.contexts.push(context);
        Ok(())
    }
}
