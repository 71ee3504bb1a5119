//! Per-agent and aggregated execution outcomes.
//!
//! Aggregation is keyed by role and decomposition order, never by arrival
//! position, so concurrent completions in any order produce the same
//! aggregate.

use serde::{Deserialize, Serialize};

use super::{SubTask, TaskId};
use crate::agent::{AgentId, AgentResponse, AgentRole};
use crate::config::ReviewMode;
use crate::supervisor::SupervisorReview;

/// Outcome of one assignment on one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Subtask this result answers
    pub subtask_id: TaskId,

    /// Position of the subtask in the decomposition order
    pub sequence: usize,

    /// Agent that produced the result
    pub agent_id: AgentId,

    /// Role the agent served
    pub role: AgentRole,

    /// Whether the assignment succeeded
    pub success: bool,

    /// Free-form result payload
    pub output: String,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Error message, if the assignment failed
    pub error: Option<String>,

    /// Supervisor review of this result, when full supervision ran
    pub review: Option<SupervisorReview>,
}

impl TaskResult {
    /// Build a successful result from an agent response.
    pub fn success(subtask: &SubTask, agent_id: AgentId, response: AgentResponse) -> Self {
        Self {
            subtask_id: subtask.id,
            sequence: subtask.sequence,
            agent_id,
            role: subtask.role,
            success: true,
            output: response.output,
            confidence: response.confidence.clamp(0.0, 1.0),
            error: None,
            review: None,
        }
    }

    /// Build a failed result.
    pub fn failure(subtask: &SubTask, agent_id: AgentId, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            subtask_id: subtask.id,
            sequence: subtask.sequence,
            agent_id,
            role: subtask.role,
            success: false,
            output: String::new(),
            confidence: 0.0,
            error: Some(error),
            review: None,
        }
    }

    /// Attach a supervisor review.
    ///
    /// Under `ReviewMode::Enforcing` the review verdict replaces the
    /// pipeline verdict; under `Advisory` it is recorded only.
    pub fn with_review(mut self, review: SupervisorReview, mode: ReviewMode) -> Self {
        if mode == ReviewMode::Enforcing {
            self.success = self.success && review.approved;
            self.confidence = review.quality_score.clamp(0.0, 1.0);
        }
        self.review = Some(review);
        self
    }
}

/// Result payloads grouped by agent role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleOutputs {
    pub research: Option<String>,
    pub analysis: Option<String>,
    pub code: Option<String>,
    pub validation: Option<String>,
}

impl RoleOutputs {
    /// Append an output to a role slot.
    pub fn push(&mut self, role: AgentRole, output: &str) {
        let slot = match role {
            AgentRole::Research => &mut self.research,
            AgentRole::Analysis => &mut self.analysis,
            AgentRole::Code => &mut self.code,
            AgentRole::Validation => &mut self.validation,
        };
        match slot {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(output);
            }
            None => *slot = Some(output.to_string()),
        }
    }

    pub fn get(&self, role: AgentRole) -> Option<&str> {
        match role {
            AgentRole::Research => self.research.as_deref(),
            AgentRole::Analysis => self.analysis.as_deref(),
            AgentRole::Code => self.code.as_deref(),
            AgentRole::Validation => self.validation.as_deref(),
        }
    }

    /// Concatenate all role outputs in role order.
    pub fn combined(&self) -> String {
        AgentRole::ALL
            .iter()
            .filter_map(|role| self.get(*role).map(|out| format!("[{}] {}", role, out)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Combination of all per-agent results for one task.
///
/// # Invariants
/// - `success` implies every constituent result succeeded and no subtask
///   was dropped at assignment
/// - `quality_score` is the mean of constituent confidences (0 when empty)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub task_id: TaskId,
    pub success: bool,

    /// Constituent results, ordered by decomposition sequence
    pub results: Vec<TaskResult>,

    /// Result payloads grouped by role
    pub role_outputs: RoleOutputs,

    /// Mean of constituent confidences in [0, 1]
    pub quality_score: f64,

    /// Subtasks that could not be assigned to any agent
    pub unassigned_subtasks: usize,

    /// Whether the result was produced in degraded mode
    pub degraded_mode: bool,

    /// Supervisor feedback from a coordinator-level review
    pub supervisor_feedback: Option<String>,

    /// Supervisor approval from a coordinator-level review
    pub supervisor_approved: Option<bool>,

    /// Supervisor quality score from a coordinator-level review
    pub supervisor_quality: Option<f64>,

    /// Error that aborted the pipeline, if any
    pub error: Option<String>,

    /// Wall-clock duration of the pipeline in milliseconds
    pub duration_ms: u64,
}

impl AggregatedResult {
    /// Aggregate per-agent results for a task.
    ///
    /// Results are re-ordered by decomposition sequence first, so the
    /// aggregate is invariant to completion order.
    pub fn from_results(task_id: TaskId, mut results: Vec<TaskResult>, unassigned: usize) -> Self {
        results.sort_by_key(|r| r.sequence);

        let mut role_outputs = RoleOutputs::default();
        for result in results.iter().filter(|r| r.success) {
            role_outputs.push(result.role, &result.output);
        }

        let success = !results.is_empty() && results.iter().all(|r| r.success) && unassigned == 0;
        let quality_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
        };

        Self {
            task_id,
            success,
            results,
            role_outputs,
            quality_score,
            unassigned_subtasks: unassigned,
            degraded_mode: false,
            supervisor_feedback: None,
            supervisor_approved: None,
            supervisor_quality: None,
            error: None,
            duration_ms: 0,
        }
    }

    /// Build a failed result that never reached execution.
    pub fn failure(task_id: TaskId, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            task_id,
            success: false,
            results: Vec::new(),
            role_outputs: RoleOutputs::default(),
            quality_score: 0.0,
            unassigned_subtasks: 0,
            degraded_mode: false,
            supervisor_feedback: None,
            supervisor_approved: None,
            supervisor_quality: None,
            error: Some(error),
            duration_ms: 0,
        }
    }

    /// Record the pipeline wall-clock duration.
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Fold a coordinator-level supervisor review into the result.
    pub fn apply_review(&mut self, review: SupervisorReview, mode: ReviewMode) {
        if mode == ReviewMode::Enforcing {
            self.success = self.success && review.approved;
            self.quality_score = review.quality_score.clamp(0.0, 1.0);
        }
        self.supervisor_feedback = Some(review.feedback);
        self.supervisor_approved = Some(review.approved);
        self.supervisor_quality = Some(review.quality_score);
    }

    /// Scale quality down for degraded-mode operation.
    pub fn apply_degradation(&mut self, factor: f64) {
        self.quality_score *= factor;
        self.degraded_mode = true;
    }
}

/// Outcome of a consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Whether agreement reached the configured threshold
    pub reached: bool,

    /// Fraction of participants agreeing with the plurality answer
    pub agreement: f64,

    /// The plurality answer (earliest responder breaks ties)
    pub answer: Option<String>,

    /// Number of agents that produced an answer
    pub participants: usize,
}

/// Outcome of supervisor-mediated arbitration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub resolution: String,
    pub confidence: f64,
    pub resolved_by_supervisor: bool,
}
