// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::dag::TaskId;

#[derive(Error, Debug)]
pub enum AgentDevError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("task '{task}' has unknown dependency '{dependency}'")]
    UnknownDependency { task: TaskId, dependency: TaskId },

    #[error("task '{0}' cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("invalid task '{task}': {reason}")]
    InvalidTask { task: TaskId, reason: String },

    #[error("cycle detected in task DAG involving tasks: {}", .0.join(", "))]
    DagCycle(Vec<TaskId>),

    #[error("path '{0}' escapes the managed root")]
    PathEscapesRoot(String),

    #[error("path '{0}' is reserved or not allowed")]
    ReservedPath(String),

    #[error("invalid work unit id '{0}' (expected [A-Za-z0-9_-]+)")]
    InvalidWorkUnit(String),

    #[error("history file {path} is corrupt: {reason}")]
    HistoryCorrupt { path: String, reason: String },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentDevError {
    /// Configuration errors are fatal to the affected task or operation and
    /// are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AgentDevError::ConfigError(_)
                | AgentDevError::DuplicateTask(_)
                | AgentDevError::UnknownDependency { .. }
                | AgentDevError::SelfDependency(_)
                | AgentDevError::InvalidTask { .. }
                | AgentDevError::DagCycle(_)
                | AgentDevError::PathEscapesRoot(_)
                | AgentDevError::ReservedPath(_)
                | AgentDevError::InvalidWorkUnit(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentDevError>;
