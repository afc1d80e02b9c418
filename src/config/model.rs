// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dag::Metadata;
use crate::types::TaskKind;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// output_dir = "outputs"
/// dry_run = false
///
/// [files]
/// history_cap = 100
/// protect = [".git/**"]
///
/// [generator]
/// cmd = "codegen --json"
///
/// [task.TASK-2]
/// description = "Implement core module"
/// after = ["TASK-1"]
/// estimated_effort = 4.0
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unvalidated form; convert it with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// File mutation settings from `[files]`.
    #[serde(default)]
    pub files: FilesSection,

    /// Code-generation collaborator from `[generator]`.
    #[serde(default)]
    pub generator: GeneratorSection,

    /// All tasks from `[task.<id>]`, keyed by task id.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration. Only constructible through
/// `TryFrom<RawConfigFile>` (or `new_unchecked` for callers that validated
/// by other means).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub files: FilesSection,
    pub generator: GeneratorSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub fn new_unchecked(
        config: ConfigSection,
        files: FilesSection,
        generator: GeneratorSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            config,
            files,
            generator,
            task,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Managed root that generated files are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Compute diffs only; never touch the disk.
    #[serde(default)]
    pub dry_run: bool,

    /// Upper bound on driver loop iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// How many ready tasks the driver takes per iteration.
    #[serde(default = "default_tasks_per_iteration")]
    pub tasks_per_iteration: usize,

    /// How many times a failed task is retried before giving up.
    #[serde(default)]
    pub max_retries: u32,

    /// Roll back a task's work unit when its batch does not fully succeed.
    #[serde(default = "default_true")]
    pub rollback_on_failure: bool,
}

fn default_output_dir() -> String {
    "outputs".to_string()
}

fn default_max_iterations() -> usize {
    100
}

fn default_tasks_per_iteration() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            dry_run: false,
            max_iterations: default_max_iterations(),
            tasks_per_iteration: default_tasks_per_iteration(),
            max_retries: 0,
            rollback_on_failure: true,
        }
    }
}

/// `[files]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesSection {
    /// Write records kept per path in the history file.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Generated files larger than this are rejected.
    #[serde(default = "default_max_file_size_kb")]
    pub max_file_size_kb: u64,

    /// Glob patterns (relative to the managed root) that are never written.
    #[serde(default)]
    pub protect: Vec<String>,
}

fn default_history_cap() -> usize {
    100
}

fn default_max_file_size_kb() -> u64 {
    10 * 1024
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            max_file_size_kb: default_max_file_size_kb(),
            protect: Vec::new(),
        }
    }
}

/// `[generator]` section. At most one of `cmd` / `staging_dir` is set.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GeneratorSection {
    /// Shell command receiving the task as JSON on stdin and printing file
    /// records as JSON on stdout.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Directory holding pre-generated output under `<staging_dir>/<task id>/`.
    #[serde(default)]
    pub staging_dir: Option<String>,
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Free text; never interpreted.
    #[serde(default)]
    pub description: String,

    /// Dependency ids: this task waits for all of them to complete.
    #[serde(default)]
    pub after: Vec<String>,

    /// Lower values are scheduled first.
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_estimated_effort")]
    pub estimated_effort: f64,

    #[serde(default)]
    pub kind: TaskKind,

    #[serde(default)]
    pub target_files: Vec<String>,

    /// Opaque pass-through data.
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_priority() -> i32 {
    1
}

fn default_estimated_effort() -> f64 {
    1.0
}
