// src/dag/blocked_scan.rs

//! Result type for a blocked-status pass over the task table.

use serde::Serialize;

use crate::dag::TaskId;
use crate::errors::{AgentDevError, Result};

/// A dependency id that names no known task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingDependency {
    pub task: TaskId,
    pub dependency: TaskId,
}

/// Structured result of [`Scheduler::recompute_blocked`](crate::dag::Scheduler::recompute_blocked).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedScan {
    /// Tasks moved from `Pending` to `Blocked`.
    pub newly_blocked: Vec<TaskId>,
    /// Tasks moved from `Blocked` back to `Pending`.
    pub newly_unblocked: Vec<TaskId>,
    /// Permanently blocking references to unknown tasks.
    pub missing: Vec<MissingDependency>,
}

impl BlockedScan {
    pub fn changed(&self) -> bool {
        !self.newly_blocked.is_empty() || !self.newly_unblocked.is_empty()
    }

    /// Surface the first missing dependency as a configuration error.
    pub fn into_result(self) -> Result<Self> {
        match self.missing.first() {
            Some(missing) => Err(AgentDevError::UnknownDependency {
                task: missing.task.clone(),
                dependency: missing.dependency.clone(),
            }),
            None => Ok(self),
        }
    }
}
