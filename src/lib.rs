//! # taskmesh
//!
//! Multi-agent task coordination engine.
//!
//! Given a composite unit of work, the coordinator decomposes it into
//! subtasks, assigns them to a pool of specialized worker agents, executes
//! the assignments concurrently, aggregates partial results by role, pools
//! disagreeing answers through a consensus protocol, and degrades
//! gracefully when agents fail.
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────────────┐
//!                │   TaskCoordinator    │
//!                └──────────┬───────────┘
//!           ┌───────────┬───┴───────┬────────────┐
//!           ▼           ▼           ▼            ▼
//!    ┌────────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐
//!    │LoadBalancer│ │Executor │ │Consensus│ │ Failure  │
//!    │            │ │         │ │ Engine  │ │ Recovery │
//!    └─────┬──────┘ └────┬────┘ └─────────┘ └──────────┘
//!          │             │
//!          ▼             ▼
//!    ┌────────────┐ ┌──────────────┐   external seams:
//!    │AgentRegistry│ │ AgentInvoker │   FrontierSupervisor,
//!    └────────────┘ └──────────────┘   MemoryStore
//! ```
//!
//! ## Task Flow
//! 1. Caller submits a task to the coordinator
//! 2. Frontier supervisor decomposes it into subtasks
//! 3. Load balancer assigns subtasks to available agents by role and load
//! 4. Executor fans out, joins all assignments, releases agents
//! 5. Results are aggregated by role; supervision/consensus run on top
//!
//! ## Modules
//! - `agent`: worker identities, status registry, invocation seam
//! - `task`: tasks, subtasks, assignments, and result types
//! - `coordinator`: the pipeline plus balancer/executor/consensus/recovery
//! - `supervisor`: frontier supervisor seam
//! - `memory`: memory store seam with an in-memory reference impl
//! - `workflow`: pluggable linear and graph workflow definitions

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod memory;
pub mod supervisor;
pub mod task;
pub mod workflow;

pub use agent::{Agent, AgentId, AgentInvoker, AgentRegistry, AgentResponse, AgentRole, AgentStatus};
pub use config::{Config, ConfigError, ReviewMode};
pub use coordinator::{
    CoordinatorError, CoordinatorEvent, CoordinatorStatus, PerformanceSnapshot, TaskCoordinator,
};
pub use memory::{InMemoryStore, MemoryStore, SharedContext};
pub use supervisor::{FrontierSupervisor, SupervisorReview};
pub use task::{
    AggregatedResult, ConflictResolution, ConflictTask, ConsensusResult, ConsensusTask, SubTask,
    SupervisionLevel, Task, TaskId, TaskResult,
};
pub use workflow::{Workflow, WorkflowGraph};
