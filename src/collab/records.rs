// src/collab/records.rs

//! Records exchanged with the task producer and the code generator, and the
//! result-shaped parsing of their raw output.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dag::{Metadata, Task, TaskId, TaskPayload};
use crate::types::TaskKind;

/// One task as emitted by the task producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_estimated_effort")]
    pub estimated_effort: f64,
    #[serde(default, alias = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub target_files: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_priority() -> i32 {
    1
}

fn default_estimated_effort() -> f64 {
    1.0
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Task::new(record.id, record.description, record.dependencies)
            .with_priority(record.priority)
            .with_estimated_effort(record.estimated_effort)
            .with_payload(TaskPayload {
                kind: record.kind,
                target_files: record.target_files,
            })
            .with_metadata(record.metadata)
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().to_string(),
            description: task.description().to_string(),
            dependencies: task.dependencies().iter().cloned().collect(),
            priority: task.priority(),
            estimated_effort: task.estimated_effort(),
            kind: task.payload().kind,
            target_files: task.payload().target_files.clone(),
            metadata: task.metadata().clone(),
        }
    }
}

/// One file to write, as emitted by the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the managed root.
    pub path: String,
    pub content: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Collaborator output that could not be turned into records.
///
/// Keeps the raw payload so callers can log or persist it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not parse collaborator output: {error}")]
pub struct ParseFailure {
    pub raw: String,
    pub error: String,
}

pub fn parse_task_records(raw: &str) -> Result<Vec<TaskRecord>, ParseFailure> {
    parse_records(raw)
}

pub fn parse_file_records(raw: &str) -> Result<Vec<FileRecord>, ParseFailure> {
    parse_records(raw)
}

/// Accepts a bare JSON array or one wrapped in a fenced code block.
fn parse_records<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, ParseFailure> {
    let body = unfence(raw);
    serde_json::from_str(body).map_err(|e| ParseFailure {
        raw: raw.to_string(),
        error: e.to_string(),
    })
}

/// Contents of the first fenced code block, or the trimmed input.
fn unfence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];
    // Skip the language tag line (```json).
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(after_open.len());
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}
