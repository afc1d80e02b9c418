// src/engine/report.rs

//! Summary of a pipeline run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::dag::{Scheduler, TaskId};
use crate::types::TaskStatus;

/// File name of the report inside the state directory.
pub const REPORT_FILE: &str = "run_report.json";

/// What happened to one task during the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskRun {
    pub attempts: u32,
    pub files_written: usize,
    pub files_failed: usize,
    pub rolled_back: bool,
    /// Last generation or batch error, if any.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub iterations: usize,
    pub total_tasks: usize,
    pub status_counts: BTreeMap<TaskStatus, usize>,
    /// Completed tasks over all tasks; 0 when there are none.
    pub success_rate: f64,
    pub critical_path: Vec<TaskId>,
    pub critical_path_effort: f64,
    /// Tasks left `Blocked` at the end of the run.
    pub blocked: Vec<TaskId>,
    pub tasks: BTreeMap<TaskId, TaskRun>,
}

impl RunReport {
    pub(crate) fn build(
        scheduler: &Scheduler,
        started_at: DateTime<Utc>,
        dry_run: bool,
        iterations: usize,
        tasks: BTreeMap<TaskId, TaskRun>,
    ) -> Self {
        let status_counts = scheduler.status_counts();
        let total_tasks = scheduler.len();
        let completed = status_counts
            .get(&TaskStatus::Completed)
            .copied()
            .unwrap_or(0);
        let success_rate = if total_tasks == 0 {
            0.0
        } else {
            completed as f64 / total_tasks as f64
        };

        let path = scheduler.critical_path();
        let critical_path_effort = path.iter().map(|t| t.estimated_effort()).sum();

        Self {
            started_at,
            finished_at: Utc::now(),
            dry_run,
            iterations,
            total_tasks,
            status_counts,
            success_rate,
            critical_path: path.iter().map(|t| t.id().to_string()).collect(),
            critical_path_effort,
            blocked: scheduler
                .tasks()
                .filter(|t| t.status() == TaskStatus::Blocked)
                .map(|t| t.id().to_string())
                .collect(),
            tasks,
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Every task completed.
    pub fn is_complete(&self) -> bool {
        self.count(TaskStatus::Completed) == self.total_tasks
    }

    pub fn log(&self) {
        info!(
            total = self.total_tasks,
            completed = self.count(TaskStatus::Completed),
            failed = self.count(TaskStatus::Failed),
            blocked = self.count(TaskStatus::Blocked),
            pending = self.count(TaskStatus::Pending),
            iterations = self.iterations,
            success_rate = format!("{:.1}%", self.success_rate * 100.0),
            "run finished"
        );
        if !self.critical_path.is_empty() {
            info!(
                path = %self.critical_path.join(" -> "),
                effort = self.critical_path_effort,
                "critical path"
            );
        }
    }
}
