//! Pluggable workflow definitions: linear step lists and dependency graphs.
//!
//! Both shapes are validated structurally before the coordinator executes
//! them. Graphs are checked for unknown references and cycles (Kahn's
//! algorithm); execution then proceeds in topological waves, nodes within
//! a wave running concurrently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::AgentRole;
use crate::task::TaskResult;

/// Errors from workflow validation or execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow has no steps")]
    EmptyWorkflow,

    #[error("duplicate step name '{0}'")]
    DuplicateStep(String),

    #[error("edge references unknown node '{0}'")]
    UnknownNode(String),

    #[error("graph contains a cycle")]
    CyclicGraph,
}

/// One step of a linear workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique step name
    pub name: String,

    /// What the step should accomplish
    pub description: String,

    /// Role required to execute the step
    pub role: AgentRole,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, description: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            role,
        }
    }
}

/// An ordered list of steps executed one after another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Structural validation: non-empty, unique step names.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(WorkflowError::DuplicateStep(step.name.clone()));
            }
        }
        Ok(())
    }
}

/// A node in a workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique node id
    pub id: String,

    /// What the node should accomplish
    pub description: String,

    /// Role required to execute the node
    pub role: AgentRole,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, description: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            role,
        }
    }
}

/// A directed dependency edge: `from` must complete before `to`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

/// A dependency-graph workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: GraphNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(GraphEdge {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Structural validation: non-empty, unique ids, known references,
    /// acyclic.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.nodes.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }
        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(WorkflowError::DuplicateStep(node.id.clone()));
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(WorkflowError::UnknownNode(endpoint.clone()));
                }
            }
        }
        self.execution_waves().map(|_| ())
    }

    /// Group nodes into topological waves.
    ///
    /// Wave `k` contains every node whose dependencies all live in waves
    /// `< k`; nodes within a wave are independent and may run
    /// concurrently.
    ///
    /// # Errors
    /// Returns `WorkflowError::CyclicGraph` if the graph has a cycle.
    pub fn execution_waves(&self) -> Result<Vec<Vec<usize>>, WorkflowError> {
        let n = self.nodes.len();
        let index_of: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in &self.edges {
            let from = *index_of
                .get(edge.from.as_str())
                .ok_or_else(|| WorkflowError::UnknownNode(edge.from.clone()))?;
            let to = *index_of
                .get(edge.to.as_str())
                .ok_or_else(|| WorkflowError::UnknownNode(edge.to.clone()))?;
            adj[from].push(to);
            in_degree[to] += 1;
        }

        // Kahn's algorithm, peeling one full frontier per wave.
        let mut frontier: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut waves = Vec::new();
        let mut visited = 0usize;

        while !frontier.is_empty() {
            visited += frontier.len();
            let mut next = Vec::new();
            for &node in &frontier {
                for &succ in &adj[node] {
                    in_degree[succ] -= 1;
                    if in_degree[succ] == 0 {
                        next.push(succ);
                    }
                }
            }
            waves.push(std::mem::replace(&mut frontier, next));
        }

        if visited != n {
            Err(WorkflowError::CyclicGraph)
        } else {
            Ok(waves)
        }
    }
}

/// Result of executing a linear workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub name: String,
    pub success: bool,

    /// Per-step results, keyed by step name
    pub step_results: HashMap<String, TaskResult>,
}

/// Result of executing a workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphResult {
    pub name: String,
    pub success: bool,

    /// Per-node results, keyed by node id
    pub node_results: HashMap<String, TaskResult>,

    /// Number of topological waves executed
    pub waves_executed: usize,
}
