//! Task coordinator - owns the lifecycle of a task request end to end.
//!
//! # Pipeline
//! ```text
//! 1. Decompose task into subtasks (frontier supervisor)
//! 2. Exclude failed agents, assign subtasks (load balancer)
//! 3. Execute assignments concurrently (executor)
//! 4. Aggregate results by role
//! 5. Optionally review (supervisor) or pool answers (consensus engine)
//! ```
//!
//! The coordinator is constructed with its collaborators injected, so
//! tests run against scripted supervisors, invokers, and stores.

mod balancer;
mod consensus;
mod executor;
mod metrics;
mod recovery;

pub use balancer::{AssignmentPlan, LoadBalancer};
pub use consensus::{AgentAnswer, ConsensusEngine};
pub use executor::{Executor, LoadMap};
pub use metrics::{PerformanceSnapshot, PerformanceTracker};
pub use recovery::{FailureRecoveryManager, DEGRADATION_FACTOR};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentId, AgentInvoker, AgentRegistry, AgentRole, RegistryError};
use crate::config::Config;
use crate::memory::{MemoryStore, SharedContext};
use crate::supervisor::{FrontierSupervisor, SupervisorError};
use crate::task::{
    AggregatedResult, ConflictResolution, ConflictTask, ConsensusResult, ConsensusTask, SubTask,
    Task, TaskId, TaskResult,
};
use crate::workflow::{GraphResult, Workflow, WorkflowError, WorkflowGraph, WorkflowResult};

/// Capacity of the coordinator event channel.
const EVENT_CAPACITY: usize = 64;

/// Errors from coordination operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoordinatorError {
    #[error("no available agents for the requested roles")]
    NoAvailableAgents,

    #[error("task decomposition produced no subtasks")]
    TaskDecompositionFailed,

    #[error("consensus not reached (agreement {level:.2})")]
    ConsensusNotReached { level: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Coordinator-wide execution status.
///
/// # State Machine
/// ```text
/// Idle -> Executing   (any execute call)
/// Executing -> Idle   (completion)
/// Executing -> Error  (unrecoverable pipeline failure)
/// Error -> Executing  (next execute call; errors are per-invocation)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordinatorStatus {
    Idle,
    Executing,
    Error(String),
}

/// Notification published to status observers.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    StatusChanged(CoordinatorStatus),
    TaskStarted { task_id: TaskId },
    TaskCompleted { task_id: TaskId, success: bool },
    AgentFailed { agent_id: AgentId },
    DegradedMode { task_id: TaskId },
}

/// Status plus in-flight count, so concurrent executions only return the
/// coordinator to `Idle` when the last one finishes.
#[derive(Debug)]
struct StatusCell {
    inner: RwLock<(CoordinatorStatus, usize)>,
}

impl StatusCell {
    fn new() -> Self {
        Self {
            inner: RwLock::new((CoordinatorStatus::Idle, 0)),
        }
    }

    async fn begin(&self) -> CoordinatorStatus {
        let mut inner = self.inner.write().await;
        inner.1 += 1;
        inner.0 = CoordinatorStatus::Executing;
        inner.0.clone()
    }

    async fn finish(&self, error: Option<String>) -> CoordinatorStatus {
        let mut inner = self.inner.write().await;
        inner.1 = inner.1.saturating_sub(1);
        inner.0 = match error {
            Some(reason) => CoordinatorStatus::Error(reason),
            None if inner.1 == 0 => CoordinatorStatus::Idle,
            None => CoordinatorStatus::Executing,
        };
        inner.0.clone()
    }

    async fn current(&self) -> CoordinatorStatus {
        self.inner.read().await.0.clone()
    }
}

/// Orchestrates decomposition, assignment, execution, and aggregation.
pub struct TaskCoordinator {
    config: Config,
    registry: Arc<AgentRegistry>,
    balancer: LoadBalancer,
    executor: Executor,
    consensus: ConsensusEngine,
    recovery: FailureRecoveryManager,
    invoker: Arc<dyn AgentInvoker>,
    supervisor: Arc<dyn FrontierSupervisor>,
    memory: Arc<dyn MemoryStore>,
    loads: LoadMap,
    status: StatusCell,
    metrics: PerformanceTracker,
    events: broadcast::Sender<CoordinatorEvent>,
    cancel: Option<CancellationToken>,
}

impl TaskCoordinator {
    /// Create a coordinator with its collaborators injected.
    pub fn new(
        config: Config,
        supervisor: Arc<dyn FrontierSupervisor>,
        invoker: Arc<dyn AgentInvoker>,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let executor = Executor::new(
            Arc::clone(&invoker),
            Arc::clone(&supervisor),
            config.review_mode,
        );
        Self {
            config,
            registry: Arc::new(AgentRegistry::new()),
            balancer: LoadBalancer::new(),
            executor,
            consensus: ConsensusEngine::new(),
            recovery: FailureRecoveryManager::new(),
            invoker,
            supervisor,
            memory,
            loads: Arc::new(RwLock::new(HashMap::new())),
            status: StatusCell::new(),
            metrics: PerformanceTracker::new(),
            events,
            cancel: None,
        }
    }

    /// Attach a cooperative cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The agent registry.
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Subscribe to coordinator events.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Current coordinator status.
    pub async fn status(&self) -> CoordinatorStatus {
        self.status.current().await
    }

    /// Rolling performance counters.
    pub async fn performance_snapshot(&self) -> PerformanceSnapshot {
        let active = self.registry.available_count().await;
        let registered = self.registry.registered_count().await;
        self.metrics.snapshot(active, registered).await
    }

    fn emit(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event);
    }

    async fn begin_execution(&self) {
        let status = self.status.begin().await;
        self.emit(CoordinatorEvent::StatusChanged(status));
    }

    async fn finish_execution(&self, error: Option<String>) {
        let status = self.status.finish(error).await;
        self.emit(CoordinatorEvent::StatusChanged(status));
    }

    /// Register a worker agent.
    ///
    /// # Errors
    /// Duplicate agent ids are rejected.
    pub async fn register_agent(&self, agent: Agent) -> Result<(), CoordinatorError> {
        Ok(self.registry.register(agent).await?)
    }

    /// Check whether an available agent covers a role.
    pub async fn has_agent_for(&self, role: AgentRole) -> bool {
        self.registry.has_available(role).await
    }

    /// Outstanding assignments per registered agent.
    pub async fn agent_load_distribution(&self) -> HashMap<AgentId, usize> {
        let mut distribution: HashMap<AgentId, usize> = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .map(|a| (a.id, 0))
            .collect();
        for (id, count) in self.loads.read().await.iter() {
            if let Some(slot) = distribution.get_mut(id) {
                *slot = *count;
            }
        }
        distribution
    }

    /// Run the full pipeline for one task.
    ///
    /// Always returns a structured result; pipeline-aborting errors are
    /// attached to the result and mirrored in the coordinator status.
    pub async fn execute_complex_task(&self, task: &Task) -> AggregatedResult {
        self.begin_execution().await;
        let result = self.run_pipeline(task).await;
        self.finish_execution(result.error.clone()).await;
        result
    }

    async fn run_pipeline(&self, task: &Task) -> AggregatedResult {
        let started = Instant::now();
        self.emit(CoordinatorEvent::TaskStarted { task_id: task.id() });
        tracing::info!(task_id = %task.id(), priority = ?task.priority(), "executing task");

        if let Err(e) = self.memory.store_task_context(task).await {
            tracing::warn!(task_id = %task.id(), error = %e, "failed to store task context");
        }

        let subtasks = match self.supervisor.decompose(task).await {
            Ok(subtasks) if subtasks.is_empty() => {
                return self
                    .fail_pipeline(task, started, CoordinatorError::TaskDecompositionFailed.to_string())
                    .await;
            }
            Ok(mut subtasks) => {
                // Re-sequence in the supervisor's order so aggregation has a
                // stable key regardless of completion order.
                for (index, subtask) in subtasks.iter_mut().enumerate() {
                    subtask.sequence = index;
                }
                subtasks
            }
            Err(e) => {
                return self
                    .fail_pipeline(
                        task,
                        started,
                        format!("{}: {e}", CoordinatorError::TaskDecompositionFailed),
                    )
                    .await;
            }
        };

        tracing::debug!(task_id = %task.id(), subtasks = subtasks.len(), "task decomposed");

        let agents = self
            .recovery
            .filter_available(self.registry.available_agents().await)
            .await;
        if agents.is_empty() {
            return self
                .fail_pipeline(task, started, CoordinatorError::NoAvailableAgents.to_string())
                .await;
        }

        let plan = {
            let loads = self.loads.read().await;
            self.balancer.assign(&subtasks, &agents, &loads)
        };
        if plan.assignments.is_empty() {
            return self
                .fail_pipeline(task, started, CoordinatorError::NoAvailableAgents.to_string())
                .await;
        }

        let results = self
            .executor
            .execute_all(
                task,
                &plan.assignments,
                &self.registry,
                &self.loads,
                &self.memory,
                self.cancel.as_ref(),
            )
            .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        let aggregated = AggregatedResult::from_results(task.id(), results, plan.unassigned.len())
            .with_duration(duration_ms);

        if let Err(e) = self.memory.store_aggregated_result(&aggregated).await {
            tracing::warn!(task_id = %task.id(), error = %e, "failed to store aggregated result");
        }
        self.metrics.record(aggregated.success, duration_ms).await;
        self.emit(CoordinatorEvent::TaskCompleted {
            task_id: task.id(),
            success: aggregated.success,
        });
        aggregated
    }

    async fn fail_pipeline(
        &self,
        task: &Task,
        started: Instant,
        reason: String,
    ) -> AggregatedResult {
        tracing::warn!(task_id = %task.id(), reason = %reason, "pipeline aborted");
        let duration_ms = started.elapsed().as_millis() as u64;
        let result = AggregatedResult::failure(task.id(), reason).with_duration(duration_ms);
        if let Err(e) = self.memory.store_aggregated_result(&result).await {
            tracing::warn!(task_id = %task.id(), error = %e, "failed to store aggregated result");
        }
        self.metrics.record(false, duration_ms).await;
        self.emit(CoordinatorEvent::TaskCompleted {
            task_id: task.id(),
            success: false,
        });
        result
    }

    /// Full pipeline plus a coordinator-level supervisor review.
    ///
    /// The review's effect on the verdict follows the configured
    /// `ReviewMode`.
    pub async fn execute_with_supervision(&self, task: &Task) -> AggregatedResult {
        let mut result = self.execute_complex_task(task).await;
        let combined = result.role_outputs.combined();
        match self.supervisor.review(&combined, task).await {
            Ok(review) => result.apply_review(review, self.config.review_mode),
            Err(e) => {
                tracing::warn!(task_id = %task.id(), error = %e, "supervisor review failed")
            }
        }
        result
    }

    /// Run the full pipeline for each task concurrently.
    ///
    /// Results arrive in completion order; the set of returned task ids
    /// equals the set submitted, exactly once each.
    pub async fn execute_concurrent_tasks(&self, tasks: &[Task]) -> Vec<AggregatedResult> {
        futures::stream::iter(tasks.iter().map(|task| self.execute_complex_task(task)))
            .buffer_unordered(self.config.max_concurrent_tasks.max(1))
            .collect()
            .await
    }

    /// Distribute whole tasks across agents by load and await all of them.
    ///
    /// Each task is handled by a single agent; queues for different
    /// agents drain concurrently.
    pub async fn execute_with_load_balancing(&self, tasks: &[Task]) -> Vec<AggregatedResult> {
        self.begin_execution().await;

        let agents = self
            .recovery
            .filter_available(self.registry.available_agents().await)
            .await;
        if agents.is_empty() {
            let reason = CoordinatorError::NoAvailableAgents.to_string();
            let results = tasks
                .iter()
                .map(|task| AggregatedResult::failure(task.id(), reason.clone()))
                .collect();
            self.finish_execution(Some(reason)).await;
            return results;
        }

        let queues = self.balancer.distribute_tasks(tasks, &agents);
        let drains = queues
            .into_iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(agent, queue)| self.drain_queue(agent, queue));

        let results: Vec<AggregatedResult> = join_all(drains).await.into_iter().flatten().collect();
        self.finish_execution(None).await;
        results
    }

    async fn drain_queue(&self, agent: Agent, queue: Vec<Task>) -> Vec<AggregatedResult> {
        let mut outcomes = Vec::with_capacity(queue.len());
        for task in queue {
            let started = Instant::now();
            self.emit(CoordinatorEvent::TaskStarted { task_id: task.id() });

            let subtask = SubTask::new(task.id(), task.description(), agent.role);
            let assignment = crate::task::TaskAssignment::new(subtask, agent.clone());
            let results = self
                .executor
                .execute_all(
                    &task,
                    &[assignment],
                    &self.registry,
                    &self.loads,
                    &self.memory,
                    self.cancel.as_ref(),
                )
                .await;

            let duration_ms = started.elapsed().as_millis() as u64;
            let aggregated =
                AggregatedResult::from_results(task.id(), results, 0).with_duration(duration_ms);
            if let Err(e) = self.memory.store_aggregated_result(&aggregated).await {
                tracing::warn!(task_id = %task.id(), error = %e, "failed to store aggregated result");
            }
            self.metrics.record(aggregated.success, duration_ms).await;
            self.emit(CoordinatorEvent::TaskCompleted {
                task_id: task.id(),
                success: aggregated.success,
            });
            outcomes.push(aggregated);
        }
        outcomes
    }

    /// Pose the same question to every matching agent and pool the answers.
    ///
    /// # Errors
    /// - `InvalidConfiguration` for a threshold outside [0, 1]
    /// - `NoAvailableAgents` when no agent matches the requested roles
    /// - `ConsensusNotReached` when no participant produced an answer
    pub async fn achieve_consensus(
        &self,
        task: &ConsensusTask,
    ) -> Result<ConsensusResult, CoordinatorError> {
        let threshold = task.threshold.unwrap_or(self.config.consensus_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CoordinatorError::InvalidConfiguration(format!(
                "consensus threshold {threshold} is outside [0, 1]"
            )));
        }

        let mut participants = Vec::new();
        for role in task.participating_roles() {
            participants.extend(
                self.recovery
                    .filter_available(self.registry.find_by_role(role).await)
                    .await,
            );
        }
        if participants.is_empty() {
            return Err(CoordinatorError::NoAvailableAgents);
        }

        self.begin_execution().await;
        tracing::info!(
            participants = participants.len(),
            threshold,
            "starting consensus round"
        );

        let round_id = TaskId::new();
        let mut in_flight: FuturesUnordered<_> = participants
            .iter()
            .enumerate()
            .map(|(index, agent)| {
                let subtask = SubTask::new(round_id, task.question.as_str(), agent.role)
                    .with_sequence(index);
                async move { (agent, self.invoker.invoke(agent, &subtask).await) }
            })
            .collect();

        // Collect in completion order; the consensus engine uses that
        // order to break plurality ties.
        let mut answers = Vec::new();
        while let Some((agent, outcome)) = in_flight.next().await {
            match outcome {
                Ok(response) => {
                    answers.push(AgentAnswer::new(agent.id, response.output, response.confidence))
                }
                Err(e) => {
                    tracing::warn!(agent_id = %agent.id, error = %e, "consensus participant failed")
                }
            }
        }
        drop(in_flight);

        let decision = self.consensus.analyze(&answers, threshold);
        self.finish_execution(decision.as_ref().err().map(|e| e.to_string()))
            .await;
        decision
    }

    /// Arbitrate a conflict; always routed to the frontier supervisor.
    pub async fn resolve_conflict(
        &self,
        conflict: &ConflictTask,
    ) -> Result<ConflictResolution, CoordinatorError> {
        let resolution = self.supervisor.resolve_conflict(conflict).await?;
        Ok(ConflictResolution {
            resolution: resolution.resolution,
            confidence: resolution.confidence,
            resolved_by_supervisor: true,
        })
    }

    /// Mark an agent failed, excluding it from future assignment.
    pub async fn simulate_agent_failure(&self, agent_id: AgentId) {
        if let Err(e) = self.registry.mark_failed(agent_id).await {
            tracing::warn!(agent_id = %agent_id, error = %e, "cannot mark agent failed");
            return;
        }
        self.recovery.mark_failed(agent_id).await;
        self.emit(CoordinatorEvent::AgentFailed { agent_id });
    }

    /// Run the pipeline only if any non-failed agent remains.
    ///
    /// With every agent failed this returns a `NoAvailableAgents` failure
    /// without attempting decomposition or execution.
    pub async fn execute_with_failure_recovery(&self, task: &Task) -> AggregatedResult {
        let available = self
            .recovery
            .filter_available(self.registry.available_agents().await)
            .await;
        if available.is_empty() {
            tracing::warn!(task_id = %task.id(), "all agents failed; pipeline not attempted");
            self.metrics.record(false, 0).await;
            return AggregatedResult::failure(
                task.id(),
                CoordinatorError::NoAvailableAgents.to_string(),
            );
        }
        self.execute_complex_task(task).await
    }

    /// Run the pipeline, flagging reduced confidence when fewer than half
    /// of the registered agents are available.
    pub async fn execute_with_graceful_degradation(&self, task: &Task) -> AggregatedResult {
        let registered = self.registry.registered_count().await;
        let available = self
            .recovery
            .filter_available(self.registry.available_agents().await)
            .await
            .len();
        let degraded = available * 2 < registered;

        let mut result = self.execute_complex_task(task).await;
        if degraded {
            tracing::info!(
                task_id = %task.id(),
                available,
                registered,
                "result produced in degraded mode"
            );
            result.apply_degradation(DEGRADATION_FACTOR);
            self.emit(CoordinatorEvent::DegradedMode { task_id: task.id() });
        }
        result
    }

    /// Validate and execute a linear workflow, one step after another.
    ///
    /// A step that fails (or has no agent for its role) stops the run;
    /// later steps do not execute and have no entry in `step_results`.
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
    ) -> Result<WorkflowResult, CoordinatorError> {
        workflow.validate()?;
        self.begin_execution().await;

        let mut step_results = HashMap::new();
        let mut success = true;

        for (sequence, step) in workflow.steps.iter().enumerate() {
            match self.run_unit(&step.description, step.role, sequence).await {
                Some(result) => {
                    let step_ok = result.success;
                    step_results.insert(step.name.clone(), result);
                    if !step_ok {
                        success = false;
                        break;
                    }
                }
                None => {
                    tracing::warn!(step = %step.name, role = %step.role, "no agent for workflow step");
                    success = false;
                    break;
                }
            }
        }

        self.log_engine_run("workflow", &workflow.name, success).await;
        self.finish_execution(None).await;
        Ok(WorkflowResult {
            name: workflow.name.clone(),
            success,
            step_results,
        })
    }

    /// Validate and execute a workflow graph in topological waves.
    ///
    /// Nodes within a wave run concurrently; a wave containing a failure
    /// stops the run before dependent waves execute.
    pub async fn execute_graph(
        &self,
        graph: &WorkflowGraph,
    ) -> Result<GraphResult, CoordinatorError> {
        graph.validate()?;
        let waves = graph.execution_waves()?;
        self.begin_execution().await;

        let mut node_results = HashMap::new();
        let mut success = true;
        let mut waves_executed = 0;

        for wave in &waves {
            waves_executed += 1;
            let units = wave.iter().map(|&index| {
                let node = &graph.nodes[index];
                self.run_unit(&node.description, node.role, index)
            });
            let outcomes = join_all(units).await;

            for (&index, outcome) in wave.iter().zip(outcomes) {
                let node = &graph.nodes[index];
                match outcome {
                    Some(result) => {
                        if !result.success {
                            success = false;
                        }
                        node_results.insert(node.id.clone(), result);
                    }
                    None => {
                        tracing::warn!(node = %node.id, role = %node.role, "no agent for graph node");
                        success = false;
                    }
                }
            }
            if !success {
                break;
            }
        }

        self.log_engine_run("graph", &graph.name, success).await;
        self.finish_execution(None).await;
        Ok(GraphResult {
            name: graph.name.clone(),
            success,
            node_results,
            waves_executed,
        })
    }

    /// Assign and execute one standalone unit of work.
    ///
    /// Returns `None` when no available agent covers the role.
    async fn run_unit(
        &self,
        description: &str,
        role: AgentRole,
        sequence: usize,
    ) -> Option<TaskResult> {
        let Ok(unit_task) = Task::new(description) else {
            tracing::warn!(role = %role, "unit has an empty description");
            return None;
        };
        let subtask = SubTask::new(unit_task.id(), description, role).with_sequence(sequence);

        let agents = self
            .recovery
            .filter_available(self.registry.find_by_role(role).await)
            .await;
        let plan = {
            let loads = self.loads.read().await;
            self.balancer
                .assign(std::slice::from_ref(&subtask), &agents, &loads)
        };
        let assignment = plan.assignments.into_iter().next()?;

        self.executor
            .execute_all(
                &unit_task,
                &[assignment],
                &self.registry,
                &self.loads,
                &self.memory,
                self.cancel.as_ref(),
            )
            .await
            .into_iter()
            .next()
    }

    async fn log_engine_run(&self, kind: &str, name: &str, success: bool) {
        let context = SharedContext::new(
            format!("{kind}:{name}"),
            serde_json::json!({ "engine": kind, "name": name, "success": success }),
        );
        if let Err(e) = self.memory.share_context(context).await {
            tracing::warn!(engine = kind, name, error = %e, "failed to log engine run");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::agent::{AgentResponse, InvokeError};
    use crate::config::ReviewMode;
    use crate::memory::InMemoryStore;
    use crate::supervisor::{SupervisorResolution, SupervisorReview};
    use crate::workflow::{GraphNode, WorkflowStep};

    /// Decomposes every task into one subtask per configured role.
    struct RoleSupervisor {
        roles: Vec<AgentRole>,
        fail_next_decompose: AtomicBool,
        approve: bool,
    }

    impl RoleSupervisor {
        fn for_roles(roles: Vec<AgentRole>) -> Self {
            Self {
                roles,
                fail_next_decompose: AtomicBool::new(false),
                approve: true,
            }
        }
    }

    #[async_trait]
    impl FrontierSupervisor for RoleSupervisor {
        async fn decompose(&self, task: &Task) -> Result<Vec<SubTask>, SupervisorError> {
            if self.fail_next_decompose.swap(false, Ordering::SeqCst) {
                return Err(SupervisorError::Unavailable);
            }
            Ok(self
                .roles
                .iter()
                .enumerate()
                .map(|(i, role)| {
                    SubTask::new(task.id(), format!("{} ({role})", task.description()), *role)
                        .with_sequence(i)
                })
                .collect())
        }

        async fn review(
            &self,
            _output: &str,
            _task: &Task,
        ) -> Result<SupervisorReview, SupervisorError> {
            Ok(SupervisorReview {
                feedback: "reviewed".into(),
                approved: self.approve,
                quality_score: if self.approve { 0.95 } else { 0.2 },
            })
        }

        async fn resolve_conflict(
            &self,
            _conflict: &ConflictTask,
        ) -> Result<SupervisorResolution, SupervisorError> {
            Ok(SupervisorResolution {
                resolution: "adopt the analysis position".into(),
                confidence: 0.88,
            })
        }
    }

    /// Answers with the agent's scripted line, or an echo of its name.
    #[derive(Default)]
    struct ScriptedInvoker {
        answers: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedInvoker {
        fn with_answers(answers: &[(&str, &str)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(name, answer)| (name.to_string(), answer.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AgentInvoker for ScriptedInvoker {
        async fn invoke(
            &self,
            agent: &Agent,
            subtask: &SubTask,
        ) -> Result<AgentResponse, InvokeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let output = self
                .answers
                .get(&agent.name)
                .cloned()
                .unwrap_or_else(|| format!("{} handled: {}", agent.name, subtask.description));
            Ok(AgentResponse::new(output, 0.8).with_model(agent.model.clone()))
        }
    }

    struct Fixture {
        coordinator: TaskCoordinator,
        invoker: Arc<ScriptedInvoker>,
        supervisor: Arc<RoleSupervisor>,
        store: Arc<InMemoryStore>,
    }

    fn fixture_with(
        config: Config,
        supervisor: RoleSupervisor,
        invoker: ScriptedInvoker,
    ) -> Fixture {
        let invoker = Arc::new(invoker);
        let supervisor = Arc::new(supervisor);
        let store = Arc::new(InMemoryStore::new());
        let coordinator = TaskCoordinator::new(
            config,
            Arc::clone(&supervisor) as Arc<dyn FrontierSupervisor>,
            Arc::clone(&invoker) as Arc<dyn AgentInvoker>,
            Arc::clone(&store) as Arc<dyn MemoryStore>,
        );
        Fixture {
            coordinator,
            invoker,
            supervisor,
            store,
        }
    }

    fn fixture(roles: Vec<AgentRole>) -> Fixture {
        fixture_with(
            Config::default(),
            RoleSupervisor::for_roles(roles),
            ScriptedInvoker::default(),
        )
    }

    async fn register(fixture: &Fixture, name: &str, role: AgentRole) -> AgentId {
        let agent = Agent::new(name, role, "frontier-s");
        let id = agent.id;
        fixture.coordinator.register_agent(agent).await.unwrap();
        id
    }

    #[tokio::test]
    async fn duplicate_agent_ids_are_rejected() {
        let f = fixture(vec![AgentRole::Research]);
        let agent = Agent::new("researcher", AgentRole::Research, "frontier-s");
        f.coordinator.register_agent(agent.clone()).await.unwrap();

        let err = f.coordinator.register_agent(agent).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Registry(RegistryError::DuplicateAgent(_))
        ));
    }

    #[tokio::test]
    async fn pipeline_returns_one_result_per_assigned_subtask() {
        let f = fixture(vec![AgentRole::Research, AgentRole::Code]);
        register(&f, "researcher", AgentRole::Research).await;
        register(&f, "coder", AgentRole::Code).await;

        let task = Task::new("ship the feature").unwrap();
        let result = f.coordinator.execute_complex_task(&task).await;

        assert!(result.success);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.unassigned_subtasks, 0);
        assert!(result.role_outputs.research.is_some());
        assert!(result.role_outputs.code.is_some());
        assert!((result.quality_score - 0.8).abs() < 1e-9);
        assert_eq!(f.coordinator.status().await, CoordinatorStatus::Idle);

        // Context and result both reached the store.
        assert_eq!(f.store.task_contexts().await.len(), 1);
        assert_eq!(f.store.results().await.len(), 1);
    }

    #[tokio::test]
    async fn unassignable_subtasks_surface_as_partial_failure() {
        let f = fixture(vec![AgentRole::Research, AgentRole::Validation]);
        register(&f, "researcher", AgentRole::Research).await;
        // No validation agent registered.

        let task = Task::new("audit the release").unwrap();
        let result = f.coordinator.execute_complex_task(&task).await;

        assert!(!result.success);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.unassigned_subtasks, 1);
    }

    #[tokio::test]
    async fn decomposition_failure_sets_error_status_and_recovers() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;
        f.supervisor.fail_next_decompose.store(true, Ordering::SeqCst);

        let task = Task::new("doomed").unwrap();
        let result = f.coordinator.execute_complex_task(&task).await;
        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .contains("decomposition"));
        assert!(matches!(
            f.coordinator.status().await,
            CoordinatorStatus::Error(_)
        ));

        // Error status is per-invocation: the next call runs normally.
        let result = f.coordinator.execute_complex_task(&task).await;
        assert!(result.success);
        assert_eq!(f.coordinator.status().await, CoordinatorStatus::Idle);
    }

    #[tokio::test]
    async fn concurrent_tasks_return_each_task_id_exactly_once() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;

        let tasks: Vec<Task> = (0..3)
            .map(|i| Task::new(format!("task {i}")).unwrap())
            .collect();
        let submitted: HashSet<TaskId> = tasks.iter().map(|t| t.id()).collect();

        let results = f.coordinator.execute_concurrent_tasks(&tasks).await;
        assert_eq!(results.len(), 3);

        let returned: HashSet<TaskId> = results.iter().map(|r| r.task_id).collect();
        assert_eq!(returned, submitted);
        assert_eq!(f.coordinator.status().await, CoordinatorStatus::Idle);
    }

    #[tokio::test]
    async fn load_balanced_execution_completes_every_task() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;
        register(&f, "analyst", AgentRole::Analysis).await;

        let tasks: Vec<Task> = (0..5)
            .map(|i| Task::new(format!("bulk {i}")).unwrap())
            .collect();
        let submitted: HashSet<TaskId> = tasks.iter().map(|t| t.id()).collect();

        let results = f.coordinator.execute_with_load_balancing(&tasks).await;
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.success));

        let returned: HashSet<TaskId> = results.iter().map(|r| r.task_id).collect();
        assert_eq!(returned, submitted);

        // All outstanding counts drained back to zero.
        let distribution = f.coordinator.agent_load_distribution().await;
        assert_eq!(distribution.len(), 2);
        assert!(distribution.values().all(|&count| count == 0));
    }

    #[tokio::test]
    async fn supervised_execution_decorates_the_result() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;

        let task = Task::new("summarize findings").unwrap();
        let result = f.coordinator.execute_with_supervision(&task).await;

        assert!(result.success);
        assert_eq!(result.supervisor_feedback.as_deref(), Some("reviewed"));
        assert_eq!(result.supervisor_approved, Some(true));
        assert_eq!(result.supervisor_quality, Some(0.95));
        // Advisory mode: pipeline quality untouched.
        assert!((result.quality_score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn enforcing_review_rejects_the_aggregate() {
        let mut supervisor = RoleSupervisor::for_roles(vec![AgentRole::Research]);
        supervisor.approve = false;
        let config = Config {
            review_mode: ReviewMode::Enforcing,
            ..Config::default()
        };
        let f = fixture_with(config, supervisor, ScriptedInvoker::default());
        register(&f, "researcher", AgentRole::Research).await;

        let task = Task::new("summarize findings").unwrap();
        let result = f.coordinator.execute_with_supervision(&task).await;

        assert!(!result.success);
        assert_eq!(result.quality_score, 0.2);
    }

    #[tokio::test]
    async fn consensus_two_of_three_reaches_066() {
        let invoker = ScriptedInvoker::with_answers(&[
            ("a1", "postgres"),
            ("a2", "postgres"),
            ("a3", "sqlite"),
        ]);
        let f = fixture_with(
            Config::default(),
            RoleSupervisor::for_roles(vec![AgentRole::Analysis]),
            invoker,
        );
        register(&f, "a1", AgentRole::Analysis).await;
        register(&f, "a2", AgentRole::Analysis).await;
        register(&f, "a3", AgentRole::Analysis).await;

        let consensus = f
            .coordinator
            .achieve_consensus(
                &ConsensusTask::new("which database")
                    .with_threshold(0.66)
                    .with_roles(vec![AgentRole::Analysis]),
            )
            .await
            .unwrap();

        assert!(consensus.reached);
        assert!((consensus.agreement - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(consensus.answer.as_deref(), Some("postgres"));
        assert_eq!(consensus.participants, 3);
    }

    #[tokio::test]
    async fn consensus_threshold_is_validated() {
        let f = fixture(vec![AgentRole::Analysis]);
        register(&f, "analyst", AgentRole::Analysis).await;

        let err = f
            .coordinator
            .achieve_consensus(&ConsensusTask::new("q").with_threshold(1.2))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn consensus_without_explicit_threshold_uses_the_configured_default() {
        // Default threshold 0.66; a 1-of-2 split stays below it.
        let invoker = ScriptedInvoker::with_answers(&[("a1", "yes"), ("a2", "no")]);
        let f = fixture_with(
            Config::default(),
            RoleSupervisor::for_roles(vec![AgentRole::Analysis]),
            invoker,
        );
        register(&f, "a1", AgentRole::Analysis).await;
        register(&f, "a2", AgentRole::Analysis).await;

        let consensus = f
            .coordinator
            .achieve_consensus(
                &ConsensusTask::new("proceed?").with_roles(vec![AgentRole::Analysis]),
            )
            .await
            .unwrap();

        assert!(!consensus.reached);
        assert!((consensus.agreement - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failed_agent_disappears_from_role_coverage() {
        let f = fixture(vec![AgentRole::Research]);
        let researcher = register(&f, "researcher", AgentRole::Research).await;
        register(&f, "analyst", AgentRole::Analysis).await;

        assert!(f.coordinator.has_agent_for(AgentRole::Research).await);
        f.coordinator.simulate_agent_failure(researcher).await;

        assert!(!f.coordinator.has_agent_for(AgentRole::Research).await);
        assert!(f.coordinator.has_agent_for(AgentRole::Analysis).await);
    }

    #[tokio::test]
    async fn failure_recovery_with_all_agents_failed_skips_the_pipeline() {
        let f = fixture(vec![AgentRole::Research]);
        let a = register(&f, "r1", AgentRole::Research).await;
        let b = register(&f, "r2", AgentRole::Research).await;
        f.coordinator.simulate_agent_failure(a).await;
        f.coordinator.simulate_agent_failure(b).await;

        let task = Task::new("anything").unwrap();
        let result = f.coordinator.execute_with_failure_recovery(&task).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("no available agents"));
        assert_eq!(f.invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn degraded_mode_scales_quality_by_the_fixed_factor() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "r1", AgentRole::Research).await;
        let b = register(&f, "r2", AgentRole::Research).await;
        let c = register(&f, "a1", AgentRole::Analysis).await;
        let d = register(&f, "c1", AgentRole::Code).await;
        f.coordinator.simulate_agent_failure(b).await;
        f.coordinator.simulate_agent_failure(c).await;
        f.coordinator.simulate_agent_failure(d).await;

        // 1 of 4 available: below half.
        let task = Task::new("best effort").unwrap();
        let result = f
            .coordinator
            .execute_with_graceful_degradation(&task)
            .await;

        assert!(result.degraded_mode);
        assert!((result.quality_score - 0.8 * DEGRADATION_FACTOR).abs() < 1e-9);
    }

    #[tokio::test]
    async fn half_or_more_available_is_not_degraded() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "r1", AgentRole::Research).await;
        register(&f, "r2", AgentRole::Research).await;

        let task = Task::new("normal run").unwrap();
        let result = f
            .coordinator
            .execute_with_graceful_degradation(&task)
            .await;

        assert!(!result.degraded_mode);
        assert!((result.quality_score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn conflicts_always_go_to_the_supervisor() {
        let f = fixture(vec![AgentRole::Research]);
        let conflict = ConflictTask::new("tabs or spaces")
            .with_position("coder", "tabs")
            .with_position("analyst", "spaces");

        let resolution = f.coordinator.resolve_conflict(&conflict).await.unwrap();
        assert!(resolution.resolved_by_supervisor);
        assert_eq!(resolution.resolution, "adopt the analysis position");
        assert!((resolution.confidence - 0.88).abs() < 1e-9);
    }

    #[tokio::test]
    async fn workflow_steps_execute_in_order_and_are_logged() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;
        register(&f, "coder", AgentRole::Code).await;

        let workflow = Workflow::new("release")
            .with_step(WorkflowStep::new("gather", "collect release notes", AgentRole::Research))
            .with_step(WorkflowStep::new("package", "build the artifact", AgentRole::Code));

        let result = f.coordinator.execute_workflow(&workflow).await.unwrap();
        assert!(result.success);
        assert_eq!(result.step_results.len(), 2);
        assert!(result.step_results.contains_key("gather"));

        let contexts = f.store.shared_contexts().await;
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].key, "workflow:release");
    }

    #[tokio::test]
    async fn workflow_with_uncovered_role_stops_early() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;

        let workflow = Workflow::new("stuck")
            .with_step(WorkflowStep::new("gather", "collect notes", AgentRole::Research))
            .with_step(WorkflowStep::new("verify", "check notes", AgentRole::Validation))
            .with_step(WorkflowStep::new("extra", "never runs", AgentRole::Research));

        let result = f.coordinator.execute_workflow(&workflow).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.step_results.len(), 1);
        assert!(!result.step_results.contains_key("extra"));
    }

    #[tokio::test]
    async fn graph_executes_in_topological_waves() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;
        register(&f, "analyst", AgentRole::Analysis).await;
        register(&f, "validator", AgentRole::Validation).await;

        let graph = WorkflowGraph::new("review")
            .with_node(GraphNode::new("collect", "gather inputs", AgentRole::Research))
            .with_node(GraphNode::new("assess", "analyze inputs", AgentRole::Analysis))
            .with_node(GraphNode::new("sign-off", "validate outcome", AgentRole::Validation))
            .with_edge("collect", "assess")
            .with_edge("assess", "sign-off");

        let result = f.coordinator.execute_graph(&graph).await.unwrap();
        assert!(result.success);
        assert_eq!(result.waves_executed, 3);
        assert_eq!(result.node_results.len(), 3);
    }

    #[tokio::test]
    async fn cyclic_graph_is_rejected_before_execution() {
        let f = fixture(vec![AgentRole::Research]);
        let graph = WorkflowGraph::new("loop")
            .with_node(GraphNode::new("a", "one", AgentRole::Research))
            .with_node(GraphNode::new("b", "two", AgentRole::Analysis))
            .with_edge("a", "b")
            .with_edge("b", "a");

        let err = f.coordinator.execute_graph(&graph).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Workflow(WorkflowError::CyclicGraph)
        ));
        assert_eq!(f.invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn events_report_the_task_lifecycle() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;
        let mut events = f.coordinator.subscribe();

        let task = Task::new("observable run").unwrap();
        f.coordinator.execute_complex_task(&task).await;

        let mut saw_started = false;
        let mut saw_completed = false;
        while let Ok(event) = events.try_recv() {
            match event {
                CoordinatorEvent::TaskStarted { task_id } if task_id == task.id() => {
                    saw_started = true
                }
                CoordinatorEvent::TaskCompleted { task_id, success }
                    if task_id == task.id() =>
                {
                    saw_completed = true;
                    assert!(success);
                }
                _ => {}
            }
        }
        assert!(saw_started);
        assert!(saw_completed);
    }

    /// Store that fails every write.
    struct FailingStore;

    #[async_trait]
    impl MemoryStore for FailingStore {
        async fn store_task_context(&self, _task: &Task) -> Result<(), crate::memory::MemoryError> {
            Err(crate::memory::MemoryError::Storage("disk full".into()))
        }

        async fn store_execution(
            &self,
            _task_id: TaskId,
            _agent_id: AgentId,
        ) -> Result<(), crate::memory::MemoryError> {
            Err(crate::memory::MemoryError::Storage("disk full".into()))
        }

        async fn store_aggregated_result(
            &self,
            _result: &AggregatedResult,
        ) -> Result<(), crate::memory::MemoryError> {
            Err(crate::memory::MemoryError::Storage("disk full".into()))
        }

        async fn share_context(
            &self,
            _context: SharedContext,
        ) -> Result<(), crate::memory::MemoryError> {
            Err(crate::memory::MemoryError::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn store_failures_do_not_change_execution_outcomes() {
        let coordinator = TaskCoordinator::new(
            Config::default(),
            Arc::new(RoleSupervisor::for_roles(vec![AgentRole::Research])),
            Arc::new(ScriptedInvoker::default()),
            Arc::new(FailingStore),
        );
        coordinator
            .register_agent(Agent::new("researcher", AgentRole::Research, "frontier-s"))
            .await
            .unwrap();

        let task = Task::new("resilient run").unwrap();
        let result = coordinator.execute_complex_task(&task).await;

        assert!(result.success);
        assert_eq!(coordinator.status().await, CoordinatorStatus::Idle);
    }

    #[tokio::test]
    async fn performance_snapshot_counts_completed_pipelines() {
        let f = fixture(vec![AgentRole::Research]);
        register(&f, "researcher", AgentRole::Research).await;

        let task = Task::new("first").unwrap();
        f.coordinator.execute_complex_task(&task).await;
        let task = Task::new("second").unwrap();
        f.coordinator.execute_complex_task(&task).await;

        let snapshot = f.coordinator.performance_snapshot().await;
        assert_eq!(snapshot.total_tasks, 2);
        assert_eq!(snapshot.successful_tasks, 2);
        assert_eq!(snapshot.success_rate, 1.0);
        assert_eq!(snapshot.registered_agents, 1);
    }
}
