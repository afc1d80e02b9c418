// src/dag/task.rs

//! The schedulable unit of work.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::model::TaskConfig;
use crate::errors::{AgentDevError, Result};
use crate::files::backup::validate_work_unit;
use crate::types::{TaskKind, TaskStatus};

/// Canonical task identifier type used throughout the crate.
pub type TaskId = String;

/// Opaque producer metadata. Carried along, never inspected.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// The part of a task's producer payload whose schema is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(default)]
    pub kind: TaskKind,
    /// Files the producer expects this task to touch.
    #[serde(default)]
    pub target_files: Vec<String>,
}

/// Lifecycle timestamps.
///
/// `started_at` and `completed_at` are written once, by the first transition
/// that enters the corresponding status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTimestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskTimestamps {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

/// A unit of schedulable work.
///
/// The dependency set is fixed at construction. Status is only changed by the
/// [`Scheduler`](crate::dag::Scheduler).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    id: TaskId,
    description: String,
    dependencies: BTreeSet<TaskId>,
    status: TaskStatus,
    priority: i32,
    estimated_effort: f64,
    payload: TaskPayload,
    metadata: Metadata,
    timestamps: TaskTimestamps,
}

impl Task {
    pub fn new<I, D>(id: impl Into<TaskId>, description: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<TaskId>,
    {
        Self {
            id: id.into(),
            description: description.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            status: TaskStatus::Pending,
            priority: 1,
            estimated_effort: 1.0,
            payload: TaskPayload::default(),
            metadata: Metadata::new(),
            timestamps: TaskTimestamps::new(Utc::now()),
        }
    }

    /// Build a task from a `[task.<id>]` config section.
    pub fn from_config(id: impl Into<TaskId>, cfg: &TaskConfig) -> Self {
        Task::new(id, cfg.description.clone(), cfg.after.iter().cloned())
            .with_priority(cfg.priority)
            .with_estimated_effort(cfg.estimated_effort)
            .with_payload(TaskPayload {
                kind: cfg.kind,
                target_files: cfg.target_files.clone(),
            })
            .with_metadata(cfg.metadata.clone())
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_estimated_effort(mut self, effort: f64) -> Self {
        self.estimated_effort = effort;
        self
    }

    pub fn with_payload(mut self, payload: TaskPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dependencies(&self) -> &BTreeSet<TaskId> {
        &self.dependencies
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn estimated_effort(&self) -> f64 {
        self.estimated_effort
    }

    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn timestamps(&self) -> &TaskTimestamps {
        &self.timestamps
    }

    /// Reject tasks that can never be scheduled correctly.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AgentDevError::InvalidTask {
                task: self.id.clone(),
                reason: "task id must not be empty".to_string(),
            });
        }
        check_id_charset(&self.id)?;
        if self.dependencies.contains(&self.id) {
            return Err(AgentDevError::SelfDependency(self.id.clone()));
        }
        if !self.estimated_effort.is_finite() || self.estimated_effort < 0.0 {
            return Err(AgentDevError::InvalidTask {
                task: self.id.clone(),
                reason: format!(
                    "estimated_effort must be a finite, non-negative number (got {})",
                    self.estimated_effort
                ),
            });
        }
        Ok(())
    }

    /// Apply an already-validated status change and stamp the matching
    /// timestamps.
    pub(crate) fn enter_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.timestamps.updated_at = now;
        match status {
            TaskStatus::InProgress => {
                self.timestamps.started_at.get_or_insert(now);
            }
            TaskStatus::Completed => {
                self.timestamps.completed_at.get_or_insert(now);
            }
            TaskStatus::Pending | TaskStatus::Failed | TaskStatus::Blocked => {}
        }
    }
}

/// Task ids double as work-unit ids, so they share the work-unit charset.
pub(crate) fn check_id_charset(id: &str) -> Result<()> {
    validate_work_unit(id).map_err(|_| AgentDevError::InvalidTask {
        task: id.to_string(),
        reason: "task id may only contain ASCII letters, digits, '-' and '_'".to_string(),
    })
}
