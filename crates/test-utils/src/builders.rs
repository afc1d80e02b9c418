#![allow(dead_code)]

use agentdev::collab::TaskRecord;
use agentdev::config::{ConfigFile, RawConfigFile, TaskConfig};
use agentdev::dag::Metadata;
use agentdev::types::TaskKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.config.config.output_dir = dir.to_string();
        self
    }

    pub fn dry_run(mut self, val: bool) -> Self {
        self.config.config.dry_run = val;
        self
    }

    pub fn tasks_per_iteration(mut self, n: usize) -> Self {
        self.config.config.tasks_per_iteration = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.config.max_retries = n;
        self
    }

    pub fn history_cap(mut self, n: usize) -> Self {
        self.config.files.history_cap = n;
        self
    }

    pub fn protect(mut self, pattern: &str) -> Self {
        self.config.files.protect.push(pattern.to_string());
        self
    }

    /// The unvalidated form, for tests that expect validation to fail.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(description: &str) -> Self {
        Self {
            task: TaskConfig {
                description: description.to_string(),
                after: vec![],
                priority: 1,
                estimated_effort: 1.0,
                kind: TaskKind::default(),
                target_files: vec![],
                metadata: Metadata::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn effort(mut self, effort: f64) -> Self {
        self.task.estimated_effort = effort;
        self
    }

    pub fn kind(mut self, kind: TaskKind) -> Self {
        self.task.kind = kind;
        self
    }

    pub fn target_file(mut self, path: &str) -> Self {
        self.task.target_files.push(path.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for producer-side `TaskRecord`s.
pub struct TaskRecordBuilder {
    record: TaskRecord,
}

impl TaskRecordBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            record: TaskRecord {
                id: id.to_string(),
                description: format!("task {id}"),
                dependencies: vec![],
                priority: 1,
                estimated_effort: 1.0,
                kind: TaskKind::default(),
                target_files: vec![],
                metadata: Metadata::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.record.dependencies.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.record.priority = priority;
        self
    }

    pub fn effort(mut self, effort: f64) -> Self {
        self.record.estimated_effort = effort;
        self
    }

    pub fn metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.record.metadata.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> TaskRecord {
        self.record
    }
}
