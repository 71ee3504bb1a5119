//! Load balancer - maps subtasks onto available agents.
//!
//! Policy: a subtask only ever goes to an agent of its required role;
//! among matching agents the one with the fewest outstanding assignments
//! wins, with registration order as the stable tie-break. Subtasks with
//! no matching agent are not errors here - they are surfaced in the plan
//! so the caller can fold them into the aggregate as a partial failure.

use std::collections::HashMap;

use crate::agent::{Agent, AgentId};
use crate::task::{SubTask, Task, TaskAssignment};

/// Outcome of one assignment round.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPlan {
    /// Subtasks paired with agents
    pub assignments: Vec<TaskAssignment>,

    /// Subtasks no available agent could take
    pub unassigned: Vec<SubTask>,
}

/// Stateless assignment policy.
///
/// Current load is passed in per round; the balancer itself owns no
/// mutable state, which keeps it trivially safe under concurrent rounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadBalancer;

impl LoadBalancer {
    pub fn new() -> Self {
        Self
    }

    /// Assign each subtask to the least-loaded agent of its role.
    ///
    /// `agents` must be in registration order; `current_load` seeds the
    /// per-agent outstanding-assignment counts for this round.
    ///
    /// # Postconditions
    /// - No assignment pairs a subtask with an agent of a different role
    /// - `assignments.len() + unassigned.len() == subtasks.len()`
    pub fn assign(
        &self,
        subtasks: &[SubTask],
        agents: &[Agent],
        current_load: &HashMap<AgentId, usize>,
    ) -> AssignmentPlan {
        let mut load: HashMap<AgentId, usize> = agents
            .iter()
            .map(|a| (a.id, current_load.get(&a.id).copied().unwrap_or(0)))
            .collect();

        let mut plan = AssignmentPlan::default();

        for subtask in subtasks {
            let chosen = agents
                .iter()
                .filter(|a| a.role == subtask.role)
                .min_by_key(|a| load.get(&a.id).copied().unwrap_or(0));

            match chosen {
                Some(agent) => {
                    *load.entry(agent.id).or_insert(0) += 1;
                    plan.assignments
                        .push(TaskAssignment::new(subtask.clone(), agent.clone()));
                }
                None => {
                    tracing::warn!(
                        subtask_id = %subtask.id,
                        role = %subtask.role,
                        "no available agent for subtask role, dropping from assignment"
                    );
                    plan.unassigned.push(subtask.clone());
                }
            }
        }

        plan
    }

    /// Distribute whole tasks across agents by queue length.
    ///
    /// # Postcondition
    /// The longest and shortest queue differ by at most one.
    pub fn distribute_tasks(&self, tasks: &[Task], agents: &[Agent]) -> Vec<(Agent, Vec<Task>)> {
        let mut queues: Vec<(Agent, Vec<Task>)> =
            agents.iter().map(|a| (a.clone(), Vec::new())).collect();

        if queues.is_empty() {
            return queues;
        }

        for task in tasks {
            // min_by_key is stable: earlier registration wins ties.
            let queue = queues
                .iter_mut()
                .min_by_key(|(_, q)| q.len())
                .map(|(_, q)| q);
            if let Some(queue) = queue {
                queue.push(task.clone());
            }
        }

        queues
    }
}
