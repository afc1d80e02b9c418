// src/dag/state_machine.rs

//! Legal task status transitions.

use crate::types::TaskStatus;

/// Fixed adjacency table of status transitions.
///
/// `Blocked` never appears here: the scheduler moves tasks in and out of it
/// during its blocked scan, and a task always passes through `Pending` before
/// it re-enters this table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateMachine;

impl StateMachine {
    pub const fn new() -> Self {
        StateMachine
    }

    /// Statuses reachable from `from` in a single step.
    pub const fn targets(from: TaskStatus) -> &'static [TaskStatus] {
        match from {
            TaskStatus::Pending => &[TaskStatus::InProgress],
            TaskStatus::InProgress => &[TaskStatus::Completed, TaskStatus::Failed],
            TaskStatus::Failed => &[TaskStatus::Pending, TaskStatus::InProgress],
            TaskStatus::Completed => &[],
            TaskStatus::Blocked => &[],
        }
    }

    pub fn can_transition(&self, from: TaskStatus, to: TaskStatus) -> bool {
        Self::targets(from).contains(&to)
    }

    pub fn is_terminal(&self, status: TaskStatus) -> bool {
        status == TaskStatus::Completed
    }
}
