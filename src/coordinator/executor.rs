//! Executor - runs planned assignments concurrently.
//!
//! Fan-out/fan-in: every assignment becomes one future, all of them are
//! joined before the call returns, and nothing is detached. A failure in
//! one assignment never aborts its siblings; it becomes a failed result
//! that aggregation folds in.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::agent::{AgentId, AgentInvoker, AgentRegistry};
use crate::config::ReviewMode;
use crate::memory::MemoryStore;
use crate::supervisor::FrontierSupervisor;
use crate::task::{SupervisionLevel, Task, TaskAssignment, TaskResult};

/// Outstanding-assignment counts per agent, shared with the balancer.
pub type LoadMap = Arc<RwLock<HashMap<AgentId, usize>>>;

/// Runs assignments against the injected invoker.
pub struct Executor {
    invoker: Arc<dyn AgentInvoker>,
    supervisor: Arc<dyn FrontierSupervisor>,
    review_mode: ReviewMode,
}

impl Executor {
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        supervisor: Arc<dyn FrontierSupervisor>,
        review_mode: ReviewMode,
    ) -> Self {
        Self {
            invoker,
            supervisor,
            review_mode,
        }
    }

    /// Execute all assignments for one task concurrently.
    ///
    /// # Postconditions
    /// - Returns exactly one result per assignment
    /// - Every agent claimed busy here is released before returning
    pub async fn execute_all(
        &self,
        task: &Task,
        assignments: &[TaskAssignment],
        registry: &AgentRegistry,
        loads: &LoadMap,
        memory: &Arc<dyn MemoryStore>,
        cancel: Option<&CancellationToken>,
    ) -> Vec<TaskResult> {
        if cancel.map(|t| t.is_cancelled()).unwrap_or(false) {
            return assignments
                .iter()
                .map(|a| TaskResult::failure(&a.subtask, a.agent.id, "execution cancelled"))
                .collect();
        }

        join_all(
            assignments
                .iter()
                .map(|assignment| self.execute_one(task, assignment, registry, loads, memory)),
        )
        .await
    }

    /// Execute a single assignment.
    ///
    /// The busy claim is a compare-and-set against the registry: if the
    /// agent stopped being available between planning and dispatch, the
    /// assignment fails instead of double-booking the agent.
    async fn execute_one(
        &self,
        task: &Task,
        assignment: &TaskAssignment,
        registry: &AgentRegistry,
        loads: &LoadMap,
        memory: &Arc<dyn MemoryStore>,
    ) -> TaskResult {
        let agent = &assignment.agent;
        let subtask = &assignment.subtask;

        if let Err(e) = registry.mark_busy(agent.id).await {
            return TaskResult::failure(subtask, agent.id, e.to_string());
        }
        *loads.write().await.entry(agent.id).or_insert(0) += 1;

        tracing::debug!(
            agent_id = %agent.id,
            subtask_id = %subtask.id,
            role = %subtask.role,
            "dispatching assignment"
        );

        let outcome = self.invoker.invoke(agent, subtask).await;

        {
            let mut loads = loads.write().await;
            if let Some(count) = loads.get_mut(&agent.id) {
                *count = count.saturating_sub(1);
            }
        }
        registry.release(agent.id).await;

        if let Err(e) = memory.store_execution(task.id(), agent.id).await {
            tracing::warn!(agent_id = %agent.id, error = %e, "failed to record execution");
        }

        let mut result = match outcome {
            Ok(response) => TaskResult::success(subtask, agent.id, response),
            Err(e) => {
                tracing::warn!(
                    agent_id = %agent.id,
                    subtask_id = %subtask.id,
                    error = %e,
                    "assignment failed"
                );
                TaskResult::failure(subtask, agent.id, e.to_string())
            }
        };

        if task.supervision() == SupervisionLevel::Full {
            match self.supervisor.review(&result.output, task).await {
                Ok(review) => result = result.with_review(review, self.review_mode),
                Err(e) => {
                    tracing::warn!(subtask_id = %subtask.id, error = %e, "supervisor review failed")
                }
            }
        }

        result
    }
}
