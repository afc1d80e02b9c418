// src/dag/mod.rs

//! Task graph representation and orchestration.
//!
//! - [`task`] holds the schedulable unit of work and its timestamps.
//! - [`state_machine`] is the fixed table of legal status transitions.
//! - [`graph`] keeps dependency edges and answers path queries.
//! - [`scheduler`] owns tasks + graph and decides what is ready to run.
//! - [`blocked_scan`] defines the result type of a blocked-status pass.
//! - [`critical_path`] computes the maximum-effort dependency chain.

pub mod blocked_scan;
pub mod critical_path;
pub mod graph;
pub mod scheduler;
pub mod state_machine;
pub mod task;

pub use blocked_scan::{BlockedScan, MissingDependency};
pub use graph::DependencyGraph;
pub use scheduler::Scheduler;
pub use state_machine::StateMachine;
pub use task::{Metadata, Task, TaskId, TaskPayload, TaskTimestamps};
